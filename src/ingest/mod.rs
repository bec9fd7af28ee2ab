//! Concurrent ingestion orchestrator.
//!
//! One call to [`IngestPipeline::ingest`] drives a film's full knowledge
//! build: cache short-circuit, fatal-gated metadata fetch, concurrent
//! content-source fetches with settle-all semantics, best-effort summary
//! derivation, and a fire-and-forget durable-tier write. Progress is
//! reported as structured [`IngestEvent`]s on the pipeline's bus.

use std::sync::Arc;

use futures_util::future::join_all;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::chunker::Chunker;
use crate::config::EngineConfig;
use crate::events::{EventBus, IngestEvent};
use crate::sources::{ContentSource, MetadataSource, Summarizer};
use crate::store::KnowledgeStore;
use crate::types::{Chunk, FilmId, FilmMetadata, SourceId};

/// Characters of the first chunk surfaced in a source's `done` event.
const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    /// The primary metadata fetch failed. This is the only fatal ingestion
    /// outcome: without metadata no record exists to attach content to.
    #[error("metadata fetch failed for film {film_id}: {message}")]
    #[diagnostic(
        code(cinelore::ingest::metadata),
        help("Content sources were not attempted; retry once the metadata provider recovers.")
    )]
    Metadata { film_id: FilmId, message: String },
}

/// How one content source settled.
#[derive(Debug)]
pub enum SourceOutcome {
    /// The source contributed `chunks` chunks and counts toward readiness.
    Loaded { chunks: usize },
    /// The fetch succeeded but produced no usable text; the source is not
    /// marked loaded.
    Empty,
    /// The fetch (or its task) failed; siblings were unaffected.
    Failed { error: String },
}

/// Settled result of one ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub film_id: FilmId,
    /// True when an already ready record short-circuited the run.
    pub cached: bool,
    /// Readiness of the record after all sources settled.
    pub ready: bool,
    pub sources: Vec<(SourceId, SourceOutcome)>,
}

/// Orchestrates the ingestion of one film across its configured sources.
///
/// The pipeline owns nothing film-specific; a single instance serves any
/// number of concurrent `ingest` calls against the shared store.
pub struct IngestPipeline {
    store: Arc<KnowledgeStore>,
    metadata_source: Arc<dyn MetadataSource>,
    content_sources: Vec<Arc<dyn ContentSource>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    chunker: Chunker,
    event_bus: EventBus,
}

impl IngestPipeline {
    pub fn new(store: Arc<KnowledgeStore>, metadata_source: Arc<dyn MetadataSource>) -> Self {
        Self {
            store,
            metadata_source,
            content_sources: Vec::new(),
            summarizer: None,
            chunker: Chunker::default(),
            event_bus: EventBus::default(),
        }
    }

    /// Pipeline seeded from an [`EngineConfig`]'s chunking policy.
    pub fn from_config(
        store: Arc<KnowledgeStore>,
        metadata_source: Arc<dyn MetadataSource>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(store, metadata_source).with_chunker(config.chunker)
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content_sources.push(source);
        self
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Vec<Arc<dyn ContentSource>>) -> Self {
        self.content_sources.extend(sources);
        self
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// Run a full ingestion for `film_id`.
    ///
    /// A record that is already ready (in L1, or recovered from the durable
    /// tier) short-circuits with `cached: true` and touches no source.
    /// Otherwise the primary metadata fetch gates the run; every content
    /// source then settles independently, and a single failing source costs
    /// only its own contribution.
    #[instrument(skip(self), fields(film_id = %film_id))]
    pub async fn ingest(&self, film_id: FilmId) -> Result<IngestReport, IngestError> {
        self.event_bus.listen();
        let events = self.event_bus.sender();

        if self.store.is_ready(film_id) {
            emit(&events, IngestEvent::complete(film_id, true));
            return Ok(self.cached_report(film_id));
        }
        if self.store.load_from_durable(film_id).await && self.store.is_ready(film_id) {
            emit(&events, IngestEvent::complete(film_id, true));
            return Ok(self.cached_report(film_id));
        }

        let primary = self.store.primary().clone();
        emit(&events, IngestEvent::source_loading(film_id, primary.clone()));

        let metadata = match self.metadata_source.fetch_metadata(film_id).await {
            Ok(metadata) => metadata,
            Err(err) => {
                emit(&events, IngestEvent::fatal(film_id, err.to_string()));
                return Err(IngestError::Metadata {
                    film_id,
                    message: err.to_string(),
                });
            }
        };

        self.store.init_if_absent(film_id, metadata.clone());
        let overview_chunks = self
            .chunker
            .chunk(&metadata.overview, film_id, &primary, None);
        let overview_count = overview_chunks.len();
        let overview_excerpt = overview_chunks.first().map(excerpt);
        self.store.append_chunks(film_id, overview_chunks);
        self.store.mark_source_loaded(film_id, &primary);
        emit(
            &events,
            IngestEvent::source_done(film_id, primary.clone(), overview_count, overview_excerpt),
        );

        let metadata = Arc::new(metadata);
        let mut handles = Vec::with_capacity(self.content_sources.len());
        for source in &self.content_sources {
            let id = source.id();
            emit(&events, IngestEvent::source_loading(film_id, id.clone()));
            let handle = tokio::spawn(run_source(
                self.store.clone(),
                self.chunker,
                source.clone(),
                film_id,
                metadata.clone(),
                events.clone(),
            ));
            handles.push((id, handle));
        }

        let settled =
            join_all(handles.into_iter().map(|(id, h)| async move { (id, h.await) })).await;
        let mut sources = Vec::with_capacity(settled.len());
        for (id, result) in settled {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let message = format!("source task failed: {join_err}");
                    emit(
                        &events,
                        IngestEvent::source_error(film_id, id.clone(), message.clone()),
                    );
                    SourceOutcome::Failed { error: message }
                }
            };
            sources.push((id, outcome));
        }

        self.derive_summary(film_id).await;

        let store = self.store.clone();
        tokio::spawn(async move {
            store.save_to_durable(film_id).await;
        });

        emit(&events, IngestEvent::complete(film_id, false));

        Ok(IngestReport {
            film_id,
            cached: false,
            ready: self.store.is_ready(film_id),
            sources,
        })
    }

    fn cached_report(&self, film_id: FilmId) -> IngestReport {
        IngestReport {
            film_id,
            cached: true,
            ready: true,
            sources: Vec::new(),
        }
    }

    /// Derivation is enrichment: a summarizer failure is logged and the
    /// record keeps its default summary text.
    async fn derive_summary(&self, film_id: FilmId) {
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        let Some(record) = self.store.get(film_id) else {
            return;
        };
        match summarizer.derive(&record).await {
            Ok(summary) => {
                self.store.set_sentiment(film_id, &summary);
                self.store
                    .set_starter_prompts(film_id, summary.starter_prompts);
            }
            Err(err) => {
                warn!(%film_id, error = %err, "summary derivation failed, keeping defaults");
            }
        }
    }
}

/// One content source's full lifecycle: fetch, chunk, commit, report.
///
/// Spawned rather than merely joined so the work survives a caller that
/// stops polling.
async fn run_source(
    store: Arc<KnowledgeStore>,
    chunker: Chunker,
    source: Arc<dyn ContentSource>,
    film_id: FilmId,
    metadata: Arc<FilmMetadata>,
    events: flume::Sender<IngestEvent>,
) -> SourceOutcome {
    let id = source.id();
    let content = match source.fetch(film_id, &metadata).await {
        Ok(content) => content,
        Err(err) => {
            let message = err.to_string();
            emit(
                &events,
                IngestEvent::source_error(film_id, id, message.clone()),
            );
            return SourceOutcome::Failed { error: message };
        }
    };

    let text = content.fragments.join("\n\n");
    let chunks = chunker.chunk(&text, film_id, &id, None);
    if chunks.is_empty() {
        emit(
            &events,
            IngestEvent::source_error(film_id, id, "no content found"),
        );
        return SourceOutcome::Empty;
    }

    let count = chunks.len();
    let first = excerpt(&chunks[0]);
    store.append_chunks(film_id, chunks);
    if let (Some(slot), Some(rating)) = (source.rating_slot(), content.rating) {
        store.set_external_rating(film_id, slot, rating);
    }
    store.mark_source_loaded(film_id, &id);
    emit(
        &events,
        IngestEvent::source_done(film_id, id, count, Some(first)),
    );
    SourceOutcome::Loaded { chunks: count }
}

/// Char-boundary-safe prefix of a chunk's text.
fn excerpt(chunk: &Chunk) -> String {
    chunk.text.chars().take(EXCERPT_CHARS).collect()
}

/// Best-effort emit; a bus with no live receiver never fails the run.
fn emit(events: &flume::Sender<IngestEvent>, event: IngestEvent) {
    let _ = events.send(event);
}
