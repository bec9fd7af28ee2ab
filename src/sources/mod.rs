//! External collaborator boundaries.
//!
//! The engine never scrapes, calls an HTTP API, or prompts a model itself;
//! it drives collaborators through these traits. Each content source is
//! fetched independently and may fail independently: a [`SourceError`]
//! from one source is recorded per-source and never aborts its siblings.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::store::KnowledgeRecord;
use crate::types::{DerivedSummary, FilmId, FilmMetadata, RatingSlot, SourceId};

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    /// The provider answered with an error or unusable response.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(cinelore::source::provider))]
    Provider { provider: String, message: String },

    /// The provider did not answer in time.
    #[error("timed out waiting for {provider}")]
    #[diagnostic(
        code(cinelore::source::timeout),
        help("Slow sources are tolerated; the pipeline records this and moves on.")
    )]
    Timeout { provider: String },

    /// The provider answered but the payload could not be decoded.
    #[error("malformed payload from {provider}: {message}")]
    #[diagnostic(code(cinelore::source::malformed))]
    Malformed { provider: String, message: String },
}

impl SourceError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Raw result of one content-source fetch: text fragments to be chunked,
/// plus an optional extracted rating value (e.g. a star average or a
/// critic percentage).
#[derive(Clone, Debug, Default)]
pub struct SourceContent {
    pub fragments: Vec<String>,
    pub rating: Option<String>,
}

impl SourceContent {
    pub fn from_fragments(fragments: Vec<String>) -> Self {
        Self {
            fragments,
            rating: None,
        }
    }

    #[must_use]
    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.trim().is_empty())
    }
}

/// The primary source: structured film metadata. Its failure is the only
/// fatal ingestion error, because no record can exist without it.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Stable name of this source; also the readiness-gating primary id.
    fn id(&self) -> SourceId;

    async fn fetch_metadata(&self, film_id: FilmId) -> Result<FilmMetadata, SourceError>;
}

/// One named content provider (reviews, discussions, criticism, essays).
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Stable name of this source, used in chunk ids and progress events.
    fn id(&self) -> SourceId;

    /// Which sentiment rating slot this source's extracted rating feeds,
    /// if any.
    fn rating_slot(&self) -> Option<RatingSlot> {
        None
    }

    async fn fetch(
        &self,
        film_id: FilmId,
        metadata: &FilmMetadata,
    ) -> Result<SourceContent, SourceError>;
}

/// Generation collaborator that distills the accumulated chunks into the
/// critics/audiences/tension framing plus starter prompts. Failure leaves
/// the record's summary at its empty default; derivation is enrichment,
/// not a readiness requirement.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn derive(&self, record: &KnowledgeRecord) -> Result<DerivedSummary, SourceError>;
}
