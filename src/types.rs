//! Core identifier and value-object types shared across the crate.
//!
//! Everything here is plain data: identifiers are thin newtypes so film and
//! source keys cannot be mixed up, and the payload structs are serde-friendly
//! value objects that the store, the ingestion pipeline, and the durable tier
//! all agree on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable integer key identifying one film across every tier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct FilmId(i64);

impl FilmId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for FilmId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for FilmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of one external provider: the primary metadata source or one of the
/// content sources. The set of sources is fixed per pipeline, not discovered,
/// so this stays an open string rather than an enum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SourceId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured payload from the primary metadata source.
///
/// Treated as an immutable value object once a record is initialized with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilmMetadata {
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

impl FilmMetadata {
    /// Release year, when the release date carries one (`"1999-03-31"` -> `"1999"`).
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| d.len() >= 4 && d.is_char_boundary(4))
            .map(|d| &d[..4])
    }
}

/// A bounded fragment of source text tagged with its origin and position.
///
/// `id` is derived from `(film_id, source, index-within-batch)`, which keeps
/// chunk identity stable across re-ingestion and makes durable-tier rewrites
/// idempotent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub film_id: FilmId,
    pub source: SourceId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Chunk {
    /// Deterministic chunk id for a position within one source's batch.
    pub fn id_for(film_id: FilmId, source: &SourceId, index: usize) -> String {
        format!("{film_id}-{source}-{index}")
    }
}

/// Which optional rating field of [`SentimentSummary`] a content source feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSlot {
    Audience,
    Critic,
}

/// Derived summary of the accumulated knowledge, empty until the derivation
/// step runs. The two rating slots are filled directly by content sources
/// during ingestion and survive the derivation overwrite.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSummary {
    #[serde(default)]
    pub critics: String,
    #[serde(default)]
    pub audiences: String,
    #[serde(default)]
    pub tension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic_score: Option<String>,
}

impl SentimentSummary {
    /// True while no derivation step has populated the summary text.
    pub fn is_empty(&self) -> bool {
        self.critics.is_empty() && self.audiences.is_empty() && self.tension.is_empty()
    }
}

/// Output of the generation collaborator: summary framing plus suggested
/// discussion-starter prompts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSummary {
    pub critics: String,
    pub audiences: String,
    pub tension: String,
    #[serde(default)]
    pub starter_prompts: Vec<String>,
}
