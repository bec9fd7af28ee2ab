use std::sync::{Arc, Mutex};

use tokio::{sync::oneshot, task};

use super::event::IngestEvent;
use super::sink::{EventSink, StdOutSink};

/// Fan-out hub for ingestion progress events.
///
/// Producers (the pipeline and its per-source tasks) push events through a
/// cloned sender; a single background listener broadcasts each event to every
/// registered sink in order. Because all producers feed one channel, sinks
/// observe events in the order they were emitted.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    channel: (flume::Sender<IngestEvent>, flume::Receiver<IngestEvent>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Bus broadcasting to several sinks at once.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically attach a sink, e.g. a per-request [`ChannelSink`] that
    /// bridges events onto a client-facing stream.
    ///
    /// [`ChannelSink`]: super::sink::ChannelSink
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the producer side. Sending never blocks; the channel is
    /// unbounded.
    pub fn sender(&self) -> flume::Sender<IngestEvent> {
        self.channel.0.clone()
    }

    /// Spawn the background broadcast task. Idempotent: further calls while a
    /// listener is running have no effect.
    pub fn listen(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Shutdown raced any events still queued; deliver
                        // them before exiting so a stop never drops events
                        // that were already sent.
                        while let Ok(event) = receiver.try_recv() {
                            broadcast(&sinks, &event);
                        }
                        break;
                    }
                    recv = receiver.recv_async() => match recv {
                        Err(e) => {
                            eprintln!("event bus receiver error: {e}");
                            break;
                        }
                        Ok(event) => broadcast(&sinks, &event),
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener and wait for it to drain.
    pub async fn stop_listener(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

fn broadcast(sinks: &Arc<Mutex<Vec<Box<dyn EventSink>>>>, event: &IngestEvent) {
    let mut sinks_guard = sinks.lock().unwrap();
    for sink in sinks_guard.iter_mut() {
        if let Err(e) = sink.handle(event) {
            eprintln!("event bus sink error: {e}");
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
