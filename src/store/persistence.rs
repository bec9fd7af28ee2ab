/*!
Persistence primitives for serializing knowledge records into row-shaped
values (used by the SQLite durable store and any future backend).

Design goals:
- Explicit serde-friendly structs decoupled from the in-memory record.
- Conversion logic localized in `TryFrom` impls so backend code stays
  lean and declarative.

This module intentionally does NOT perform I/O; it is pure data
transformation.
*/

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::KnowledgeRecord;
use crate::types::{Chunk, FilmId, SourceId};

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(cinelore::persistence::serde),
        help("Ensure the stored JSON matches the Persisted* shapes.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for PersistenceError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serde { source }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Row shape of the `films` table; structured payloads are JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedRecord {
    pub film_id: i64,
    pub metadata_json: String,
    pub sentiment_json: String,
    pub starter_prompts_json: String,
    pub loaded_sources_json: String,
    /// RFC3339 string form (keeps chrono::DateTime out of the row shape).
    pub created_at: String,
}

/// Row shape of the `chunks` table. `chunk_index` is the chunk's position
/// within the record at save time, so a load reproduces L1 order exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedChunk {
    pub id: String,
    pub film_id: i64,
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub metadata_json: Option<String>,
}

impl TryFrom<&KnowledgeRecord> for PersistedRecord {
    type Error = PersistenceError;

    fn try_from(record: &KnowledgeRecord) -> Result<Self> {
        Ok(PersistedRecord {
            film_id: record.film_id.as_i64(),
            metadata_json: serde_json::to_string(&record.metadata)?,
            sentiment_json: serde_json::to_string(&record.sentiment)?,
            starter_prompts_json: serde_json::to_string(&record.starter_prompts)?,
            loaded_sources_json: serde_json::to_string(&record.loaded_sources)?,
            created_at: record.created_at.to_rfc3339(),
        })
    }
}

/// Flatten a record's chunks into rows, in storage order.
pub fn chunk_rows(record: &KnowledgeRecord) -> Result<Vec<PersistedChunk>> {
    record
        .chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            Ok(PersistedChunk {
                id: chunk.id.clone(),
                film_id: chunk.film_id.as_i64(),
                source: chunk.source.to_string(),
                chunk_index: index as i64,
                text: chunk.text.clone(),
                metadata_json: chunk
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            })
        })
        .collect()
}

/// Rebuild the in-memory record from its rows. `chunks` must already be in
/// `chunk_index` order.
pub fn into_record(row: PersistedRecord, chunks: Vec<PersistedChunk>) -> Result<KnowledgeRecord> {
    let film_id = FilmId::new(row.film_id);
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    let chunks = chunks
        .into_iter()
        .map(|c| {
            Ok(Chunk {
                id: c.id,
                film_id: FilmId::new(c.film_id),
                source: SourceId::new(c.source),
                text: c.text,
                metadata: c
                    .metadata_json
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<Chunk>>>()?;

    Ok(KnowledgeRecord {
        film_id,
        metadata: serde_json::from_str(&row.metadata_json)?,
        chunks,
        sentiment: serde_json::from_str(&row.sentiment_json)?,
        starter_prompts: serde_json::from_str(&row.starter_prompts_json)?,
        loaded_sources: serde_json::from_str(&row.loaded_sources_json)?,
        created_at,
    })
}
