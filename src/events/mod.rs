//! Ingestion progress events and their fan-out plumbing.
//!
//! The pipeline emits [`IngestEvent`]s through an [`EventBus`] that
//! broadcasts to pluggable [`EventSink`]s. The transport beyond a sink
//! (SSE, websocket, log file) is a collaborator concern.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{IngestEvent, SourceStatus};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
