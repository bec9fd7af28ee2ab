//! Engine-level configuration resolved from the environment.

use crate::chunker::Chunker;
use crate::retrieval::DEFAULT_TOP_N;
#[cfg(feature = "sqlite")]
use crate::store::{DurableError, SqliteDurable};

/// Default rows per batched chunk insert.
pub const DEFAULT_PERSIST_BATCH: usize = 500;

/// Tunables for an engine instance.
///
/// The durable-tier URL is resolved from `CINELORE_DATABASE_URL` (a `.env`
/// file is honored) and falls back to a local SQLite file; everything else
/// defaults to the production constants.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: Option<String>,
    pub chunker: Chunker,
    pub retrieve_top_n: usize,
    /// Rows per chunk-insert statement when persisting to SQLite.
    pub persist_batch: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: Self::resolve_database_url(None),
            chunker: Chunker::default(),
            retrieve_top_n: DEFAULT_TOP_N,
            persist_batch: DEFAULT_PERSIST_BATCH,
        }
    }
}

impl EngineConfig {
    fn resolve_database_url(provided: Option<String>) -> Option<String> {
        if provided.is_some() {
            return provided;
        }
        dotenvy::dotenv().ok();
        Some(
            std::env::var("CINELORE_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://cinelore.db".to_string()),
        )
    }

    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Self::resolve_database_url(Some(url.into()));
        self
    }

    /// Run without a durable tier; the store stays L1-only.
    #[must_use]
    pub fn without_durable(mut self) -> Self {
        self.database_url = None;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_retrieve_top_n(mut self, top_n: usize) -> Self {
        self.retrieve_top_n = top_n.max(1);
        self
    }

    #[must_use]
    pub fn with_persist_batch(mut self, batch: usize) -> Self {
        self.persist_batch = batch.max(1);
        self
    }

    /// Open the configured durable tier.
    ///
    /// `Ok(None)` when no database URL is configured; otherwise connects
    /// (creating and migrating the database as needed) with this config's
    /// persist batch size applied.
    #[cfg(feature = "sqlite")]
    pub async fn open_durable(&self) -> Result<Option<SqliteDurable>, DurableError> {
        let Some(url) = &self.database_url else {
            return Ok(None);
        };
        let durable = SqliteDurable::connect(url)
            .await?
            .with_chunk_batch(self.persist_batch);
        Ok(Some(durable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_wins_over_env() {
        let config = EngineConfig::default().with_database_url("sqlite://custom.db");
        assert_eq!(config.database_url.as_deref(), Some("sqlite://custom.db"));
    }

    #[test]
    fn top_n_never_drops_to_zero() {
        let config = EngineConfig::default().with_retrieve_top_n(0);
        assert_eq!(config.retrieve_top_n, 1);
    }
}
