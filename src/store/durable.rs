//! Durable (L2) tier boundary.
//!
//! The store treats durable persistence as a pluggable collaborator: any
//! backend that can load one record and atomically replace it qualifies.
//! The SQLite implementation lives in [`super::sqlite`].

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::KnowledgeRecord;
use crate::types::FilmId;

#[derive(Debug, Error, Diagnostic)]
pub enum DurableError {
    #[error("durable backend error: {message}")]
    #[diagnostic(
        code(cinelore::durable::backend),
        help("Check that the durable store is reachable and migrated.")
    )]
    Backend { message: String },

    #[error("durable serialization error: {0}")]
    #[diagnostic(code(cinelore::durable::serde))]
    Serde(#[from] serde_json::Error),
}

impl DurableError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key-value-ish persistence keyed by film id.
///
/// `save_record` must implement replace-all-chunks-for-film semantics: the
/// previously stored chunk set for the film is superseded wholesale, so a
/// re-save after re-ingestion leaves no stale chunks behind.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load_record(&self, film_id: FilmId) -> Result<Option<KnowledgeRecord>, DurableError>;

    async fn save_record(&self, record: &KnowledgeRecord) -> Result<(), DurableError>;
}
