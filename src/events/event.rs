use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{FilmId, SourceId};

/// Per-source progress status within one ingestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Loading,
    Done,
    Error,
}

/// One structured progress event for a film's ingestion.
///
/// Events for a given film are produced in order; a listener observing the
/// bus sees them in that order. `Complete` and `Fatal` are terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Progress of one source fetch.
    Source {
        film_id: FilmId,
        source: SourceId,
        status: SourceStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
        /// Short excerpt of the first chunk, for UI feedback.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        excerpt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Ingestion finished; `cached` marks a short-circuit on an already
    /// ready record.
    Complete { film_id: FilmId, cached: bool },
    /// The primary metadata fetch failed; no record was created.
    Fatal { film_id: FilmId, error: String },
}

impl IngestEvent {
    pub fn source_loading(film_id: FilmId, source: SourceId) -> Self {
        Self::Source {
            film_id,
            source,
            status: SourceStatus::Loading,
            count: None,
            excerpt: None,
            error: None,
        }
    }

    pub fn source_done(
        film_id: FilmId,
        source: SourceId,
        count: usize,
        excerpt: Option<String>,
    ) -> Self {
        Self::Source {
            film_id,
            source,
            status: SourceStatus::Done,
            count: Some(count),
            excerpt,
            error: None,
        }
    }

    pub fn source_error(film_id: FilmId, source: SourceId, error: impl Into<String>) -> Self {
        Self::Source {
            film_id,
            source,
            status: SourceStatus::Error,
            count: None,
            excerpt: None,
            error: Some(error.into()),
        }
    }

    pub fn complete(film_id: FilmId, cached: bool) -> Self {
        Self::Complete { film_id, cached }
    }

    pub fn fatal(film_id: FilmId, error: impl Into<String>) -> Self {
        Self::Fatal {
            film_id,
            error: error.into(),
        }
    }

    pub fn film_id(&self) -> FilmId {
        match self {
            Self::Source { film_id, .. }
            | Self::Complete { film_id, .. }
            | Self::Fatal { film_id, .. } => *film_id,
        }
    }

    pub fn source(&self) -> Option<&SourceId> {
        match self {
            Self::Source { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True for events that close an ingestion stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Fatal { .. })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for IngestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source {
                film_id,
                source,
                status,
                count,
                error,
                ..
            } => match (status, count, error) {
                (SourceStatus::Done, Some(count), _) => {
                    write!(f, "[film {film_id}] {source}: done ({count} chunks)")
                }
                (SourceStatus::Error, _, Some(error)) => {
                    write!(f, "[film {film_id}] {source}: error ({error})")
                }
                (status, _, _) => write!(f, "[film {film_id}] {source}: {status:?}"),
            },
            Self::Complete { film_id, cached } => {
                if *cached {
                    write!(f, "[film {film_id}] complete (cached)")
                } else {
                    write!(f, "[film {film_id}] complete")
                }
            }
            Self::Fatal { film_id, error } => write!(f, "[film {film_id}] fatal: {error}"),
        }
    }
}
