//! Tiered knowledge store: a fast in-process (L1) arena of per-film records
//! backed by an optional durable (L2) tier consulted on miss.
//!
//! # Concurrency model
//!
//! Records live behind per-film mutexes inside a map guarded by a read-write
//! lock that is held only long enough to clone the record handle. Mutation
//! contention is therefore scoped per film: concurrent source fetches for the
//! same film serialize on that film's lock, while operations on different
//! films proceed independently.
//!
//! # Failure semantics
//!
//! L1 operations are infallible lookups (`false`/`None` on a missing record,
//! never an error). Durable-tier I/O failures are caught, logged, and
//! reported as a miss or skip; persistence is a best-effort optimization on
//! top of a workable in-memory result, and L1 stays authoritative for the
//! lifetime of the process.

pub mod durable;
pub mod persistence;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::types::{Chunk, DerivedSummary, FilmId, FilmMetadata, RatingSlot, SentimentSummary, SourceId};

pub use durable::{DurableError, DurableStore};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDurable;

/// A record is *ready* once the primary source plus at least two content
/// sources have loaded. Partial knowledge below this bar is kept but not
/// served as a cache hit.
pub const DEFAULT_READINESS_THRESHOLD: usize = 3;

/// One film's accumulated knowledge.
///
/// Exists iff the primary-metadata fetch completed; `chunks` is append-only
/// during ingestion and `loaded_sources` only ever grows, so readiness is
/// monotonic for the lifetime of the record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub film_id: FilmId,
    pub metadata: FilmMetadata,
    pub chunks: Vec<Chunk>,
    pub sentiment: SentimentSummary,
    pub starter_prompts: Vec<String>,
    pub loaded_sources: Vec<SourceId>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    pub fn new(film_id: FilmId, metadata: FilmMetadata) -> Self {
        Self {
            film_id,
            metadata,
            chunks: Vec::new(),
            sentiment: SentimentSummary::default(),
            starter_prompts: Vec::new(),
            loaded_sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_source(&self, source: &SourceId) -> bool {
        self.loaded_sources.contains(source)
    }
}

type RecordHandle = Arc<Mutex<KnowledgeRecord>>;

/// The single shared mutable resource of the engine.
pub struct KnowledgeStore {
    records: RwLock<FxHashMap<FilmId, RecordHandle>>,
    primary: SourceId,
    readiness_threshold: usize,
    durable: Option<Arc<dyn DurableStore>>,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("primary", &self.primary)
            .field("readiness_threshold", &self.readiness_threshold)
            .field("durable", &self.durable.is_some())
            .finish()
    }
}

impl KnowledgeStore {
    /// Create an L1-only store. `primary` names the metadata source that
    /// gates readiness.
    pub fn new(primary: SourceId) -> Self {
        Self {
            records: RwLock::new(FxHashMap::default()),
            primary,
            readiness_threshold: DEFAULT_READINESS_THRESHOLD,
            durable: None,
        }
    }

    /// Attach a durable (L2) tier.
    #[must_use]
    pub fn with_durable(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// Override the readiness threshold (total loaded sources, primary
    /// included). Keep the default unless the product rule changes.
    #[must_use]
    pub fn with_readiness_threshold(mut self, threshold: usize) -> Self {
        self.readiness_threshold = threshold.max(1);
        self
    }

    pub fn primary(&self) -> &SourceId {
        &self.primary
    }

    fn handle(&self, film_id: FilmId) -> Option<RecordHandle> {
        self.records
            .read()
            .expect("records map poisoned")
            .get(&film_id)
            .cloned()
    }

    pub fn contains(&self, film_id: FilmId) -> bool {
        self.records
            .read()
            .expect("records map poisoned")
            .contains_key(&film_id)
    }

    /// Snapshot of one record; `None` on a miss, never an error.
    pub fn get(&self, film_id: FilmId) -> Option<KnowledgeRecord> {
        self.handle(film_id)
            .map(|h| h.lock().expect("record lock poisoned").clone())
    }

    /// Create the record for `film_id` unless it already exists. Idempotent
    /// under concurrent callers: a second call while ingestion is in flight
    /// never resets accumulated chunks. Returns whether this call inserted.
    pub fn init_if_absent(&self, film_id: FilmId, metadata: FilmMetadata) -> bool {
        let mut map = self.records.write().expect("records map poisoned");
        if map.contains_key(&film_id) {
            return false;
        }
        map.insert(
            film_id,
            Arc::new(Mutex::new(KnowledgeRecord::new(film_id, metadata))),
        );
        true
    }

    /// Append a source's chunk batch. No-op (returning `false`) when the
    /// record does not exist yet.
    pub fn append_chunks(&self, film_id: FilmId, chunks: Vec<Chunk>) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        if !chunks.is_empty() {
            handle
                .lock()
                .expect("record lock poisoned")
                .chunks
                .extend(chunks);
        }
        true
    }

    /// Record that `source` contributed. Idempotent: re-adding an already
    /// present source is a no-op, so `loaded_sources` only ever grows.
    pub fn mark_source_loaded(&self, film_id: FilmId, source: &SourceId) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        let mut record = handle.lock().expect("record lock poisoned");
        if !record.loaded_sources.contains(source) {
            record.loaded_sources.push(source.clone());
        }
        true
    }

    /// Overwrite the derived summary text, preserving any rating slots that
    /// content sources filled during ingestion.
    pub fn set_sentiment(&self, film_id: FilmId, summary: &DerivedSummary) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        let mut record = handle.lock().expect("record lock poisoned");
        record.sentiment.critics = summary.critics.clone();
        record.sentiment.audiences = summary.audiences.clone();
        record.sentiment.tension = summary.tension.clone();
        true
    }

    pub fn set_starter_prompts(&self, film_id: FilmId, prompts: Vec<String>) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        handle.lock().expect("record lock poisoned").starter_prompts = prompts;
        true
    }

    pub fn set_external_rating(&self, film_id: FilmId, slot: RatingSlot, value: String) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        let mut record = handle.lock().expect("record lock poisoned");
        match slot {
            RatingSlot::Audience => record.sentiment.audience_rating = Some(value),
            RatingSlot::Critic => record.sentiment.critic_score = Some(value),
        }
        true
    }

    pub fn loaded_sources(&self, film_id: FilmId) -> Vec<SourceId> {
        self.handle(film_id)
            .map(|h| h.lock().expect("record lock poisoned").loaded_sources.clone())
            .unwrap_or_default()
    }

    pub fn chunk_count(&self, film_id: FilmId) -> usize {
        self.handle(film_id)
            .map(|h| h.lock().expect("record lock poisoned").chunks.len())
            .unwrap_or(0)
    }

    /// Derived readiness: primary source loaded and the total loaded-source
    /// count has reached the threshold. Never stored, always recomputed.
    pub fn is_ready(&self, film_id: FilmId) -> bool {
        let Some(handle) = self.handle(film_id) else {
            return false;
        };
        let record = handle.lock().expect("record lock poisoned");
        record.has_source(&self.primary) && record.loaded_sources.len() >= self.readiness_threshold
    }

    /// Populate L1 from the durable tier if the record exists there.
    ///
    /// Returns whether a record is now present in L1. A record already in
    /// L1 (including one mid-ingestion) is never clobbered, and durable
    /// failures degrade to a miss.
    #[instrument(skip(self), fields(film_id = %film_id))]
    pub async fn load_from_durable(&self, film_id: FilmId) -> bool {
        if self.contains(film_id) {
            return true;
        }
        let Some(durable) = self.durable.clone() else {
            return false;
        };
        match durable.load_record(film_id).await {
            Ok(Some(record)) => {
                let mut map = self.records.write().expect("records map poisoned");
                // An ingestion may have initialized the record while the
                // durable read was in flight; L1 wins.
                map.entry(film_id)
                    .or_insert_with(|| Arc::new(Mutex::new(record)));
                debug!(%film_id, "record loaded from durable tier");
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(%film_id, error = %err, "durable load failed, treating as miss");
                false
            }
        }
    }

    /// Serialize the current L1 record to the durable tier, best-effort.
    /// Failures are logged, never propagated; returns whether the write
    /// succeeded.
    #[instrument(skip(self), fields(film_id = %film_id))]
    pub async fn save_to_durable(&self, film_id: FilmId) -> bool {
        let Some(durable) = self.durable.clone() else {
            return false;
        };
        let Some(record) = self.get(film_id) else {
            return false;
        };
        match durable.save_record(&record).await {
            Ok(()) => {
                debug!(%film_id, chunks = record.chunks.len(), "record persisted");
                true
            }
            Err(err) => {
                warn!(%film_id, error = %err, "durable save failed, in-memory record stays valid");
                false
            }
        }
    }
}
