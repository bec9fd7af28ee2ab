/*!
SQLite durable store

Async [`DurableStore`] implementation over an `sqlx` connection pool.

## Behavior

- Uses the serde row shapes in [`super::persistence`]; this module is
  database I/O only.
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) run on connect; disabling
  the feature assumes external migration orchestration.
- `save_record` replaces the film's prior chunk set with a
  delete-then-reinsert inside one transaction, inserting in batches so a
  large record never produces an oversized single statement.
*/

use std::sync::Arc;

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use super::durable::{DurableError, DurableStore};
use super::persistence::{self, PersistedChunk, PersistedRecord};
use super::KnowledgeRecord;
use crate::types::FilmId;

/// Chunk rows inserted per statement when rewriting a film's chunk set.
pub const DEFAULT_CHUNK_BATCH: usize = 500;

/// SQLite-backed durable (L2) tier.
pub struct SqliteDurable {
    pool: Arc<SqlitePool>,
    chunk_batch: usize,
}

impl std::fmt::Debug for SqliteDurable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDurable")
            .field("chunk_batch", &self.chunk_batch)
            .finish()
    }
}

impl SqliteDurable {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `"sqlite://cinelore.db?mode=rwc"`.
    #[must_use = "durable store must be attached to a KnowledgeStore"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, DurableError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| DurableError::backend(format!("connect error: {e}")))?;

        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(DurableError::backend(format!("migration failure: {e}")));
            }
        }

        Ok(Self {
            pool: Arc::new(pool),
            chunk_batch: DEFAULT_CHUNK_BATCH,
        })
    }

    /// Override the insert batch size (mainly for tests).
    #[must_use]
    pub fn with_chunk_batch(mut self, chunk_batch: usize) -> Self {
        self.chunk_batch = chunk_batch.max(1);
        self
    }
}

fn backend(context: &str, e: sqlx::Error) -> DurableError {
    DurableError::backend(format!("{context}: {e}"))
}

#[async_trait::async_trait]
impl DurableStore for SqliteDurable {
    #[instrument(skip(self), fields(film_id = %film_id))]
    async fn load_record(&self, film_id: FilmId) -> Result<Option<KnowledgeRecord>, DurableError> {
        let row_opt: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT film_id, metadata_json, sentiment_json, starter_prompts_json,
                   loaded_sources_json, created_at
            FROM films
            WHERE film_id = ?1
            "#,
        )
        .bind(film_id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("select film", e))?;

        let Some(row) = row_opt else {
            return Ok(None);
        };

        let record_row = PersistedRecord {
            film_id: row.get("film_id"),
            metadata_json: row.get("metadata_json"),
            sentiment_json: row.get("sentiment_json"),
            starter_prompts_json: row.get("starter_prompts_json"),
            loaded_sources_json: row.get("loaded_sources_json"),
            created_at: row.get("created_at"),
        };

        let chunk_rows = sqlx::query(
            r#"
            SELECT id, film_id, source, chunk_index, text, metadata_json
            FROM chunks
            WHERE film_id = ?1
            ORDER BY chunk_index
            "#,
        )
        .bind(film_id.as_i64())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend("select chunks", e))?
        .into_iter()
        .map(|row| PersistedChunk {
            id: row.get("id"),
            film_id: row.get("film_id"),
            source: row.get("source"),
            chunk_index: row.get("chunk_index"),
            text: row.get("text"),
            metadata_json: row.get("metadata_json"),
        })
        .collect();

        let record = persistence::into_record(record_row, chunk_rows)
            .map_err(|e| DurableError::backend(format!("record decode: {e}")))?;
        Ok(Some(record))
    }

    #[instrument(skip(self, record), fields(film_id = %record.film_id))]
    async fn save_record(&self, record: &KnowledgeRecord) -> Result<(), DurableError> {
        let row = PersistedRecord::try_from(record)
            .map_err(|e| DurableError::backend(format!("record encode: {e}")))?;
        let chunk_rows = persistence::chunk_rows(record)
            .map_err(|e| DurableError::backend(format!("chunk encode: {e}")))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend("tx begin", e))?;

        sqlx::query(
            r#"
            INSERT INTO films (
                film_id, metadata_json, sentiment_json, starter_prompts_json,
                loaded_sources_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
            ON CONFLICT(film_id) DO UPDATE SET
                metadata_json = excluded.metadata_json,
                sentiment_json = excluded.sentiment_json,
                starter_prompts_json = excluded.starter_prompts_json,
                loaded_sources_json = excluded.loaded_sources_json,
                updated_at = datetime('now')
            "#,
        )
        .bind(row.film_id)
        .bind(&row.metadata_json)
        .bind(&row.sentiment_json)
        .bind(&row.starter_prompts_json)
        .bind(&row.loaded_sources_json)
        .bind(&row.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| backend("upsert film", e))?;

        // Replace the prior chunk set wholesale: stale chunks from an
        // earlier ingestion must not survive a re-save.
        sqlx::query("DELETE FROM chunks WHERE film_id = ?1")
            .bind(row.film_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| backend("delete chunks", e))?;

        for batch in chunk_rows.chunks(self.chunk_batch) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO chunks (id, film_id, source, chunk_index, text, metadata_json) ",
            );
            builder.push_values(batch, |mut b, chunk| {
                b.push_bind(&chunk.id)
                    .push_bind(chunk.film_id)
                    .push_bind(&chunk.source)
                    .push_bind(chunk.chunk_index)
                    .push_bind(&chunk.text)
                    .push_bind(&chunk.metadata_json);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| backend("insert chunks", e))?;
        }

        tx.commit().await.map_err(|e| backend("tx commit", e))?;
        Ok(())
    }
}
