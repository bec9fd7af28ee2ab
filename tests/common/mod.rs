//! Shared stubs for integration tests: canned sources that succeed, fail,
//! or return nothing on demand.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cinelore::sources::{
    ContentSource, MetadataSource, SourceContent, SourceError, Summarizer,
};
use cinelore::store::KnowledgeRecord;
use cinelore::types::{DerivedSummary, FilmId, FilmMetadata, RatingSlot, SourceId};

/// Metadata source with a call counter, so cache short-circuits can be
/// asserted, and an optional failure mode.
pub struct StubMetadataSource {
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl StubMetadataSource {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for StubMetadataSource {
    fn id(&self) -> SourceId {
        SourceId::from("metadata")
    }

    async fn fetch_metadata(&self, film_id: FilmId) -> Result<FilmMetadata, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::provider("metadata", "upstream unavailable"));
        }
        Ok(FilmMetadata {
            title: format!("Film {film_id}"),
            release_date: Some("1999-03-31".to_string()),
            director: Some("Tester".to_string()),
            ..Default::default()
        })
    }
}

/// Content source returning fixed fragments, optionally with a rating.
pub struct StaticSource {
    pub id: SourceId,
    pub fragments: Vec<String>,
    pub rating: Option<String>,
    pub slot: Option<RatingSlot>,
}

impl StaticSource {
    pub fn new(id: &str, fragments: Vec<String>) -> Self {
        Self {
            id: SourceId::from(id),
            fragments,
            rating: None,
            slot: None,
        }
    }

    pub fn with_rating(mut self, rating: &str, slot: RatingSlot) -> Self {
        self.rating = Some(rating.to_string());
        self.slot = Some(slot);
        self
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn rating_slot(&self) -> Option<RatingSlot> {
        self.slot
    }

    async fn fetch(
        &self,
        _film_id: FilmId,
        _metadata: &FilmMetadata,
    ) -> Result<SourceContent, SourceError> {
        let mut content = SourceContent::from_fragments(self.fragments.clone());
        content.rating = self.rating.clone();
        Ok(content)
    }
}

/// Content source that always fails its fetch.
pub struct FailingSource {
    pub id: SourceId,
}

impl FailingSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: SourceId::from(id),
        }
    }
}

#[async_trait]
impl ContentSource for FailingSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn fetch(
        &self,
        _film_id: FilmId,
        _metadata: &FilmMetadata,
    ) -> Result<SourceContent, SourceError> {
        Err(SourceError::provider(self.id.as_str(), "scrape blocked"))
    }
}

/// Content source that succeeds with nothing usable.
pub struct EmptySource {
    pub id: SourceId,
}

impl EmptySource {
    pub fn new(id: &str) -> Self {
        Self {
            id: SourceId::from(id),
        }
    }
}

#[async_trait]
impl ContentSource for EmptySource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn fetch(
        &self,
        _film_id: FilmId,
        _metadata: &FilmMetadata,
    ) -> Result<SourceContent, SourceError> {
        Ok(SourceContent::default())
    }
}

/// Summarizer returning a canned framing, or failing on demand.
pub struct StubSummarizer {
    pub fail: bool,
}

impl StubSummarizer {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn derive(&self, record: &KnowledgeRecord) -> Result<DerivedSummary, SourceError> {
        if self.fail {
            return Err(SourceError::provider("summarizer", "model overloaded"));
        }
        Ok(DerivedSummary {
            critics: format!("Critics admired {}", record.metadata.title),
            audiences: "Audiences were split".to_string(),
            tension: "Style over substance".to_string(),
            starter_prompts: vec!["What does the ending mean?".to_string()],
        })
    }
}

/// A paragraph of roughly `len` characters built from whole words, so the
/// chunker has word boundaries to work with.
pub fn long_paragraph(len: usize) -> String {
    let mut text = String::with_capacity(len + 16);
    let mut word = 0usize;
    while text.len() < len {
        text.push_str("review");
        text.push_str(&word.to_string());
        text.push(' ');
        word += 1;
    }
    text.push('.');
    text
}

/// Fragments that chunk to exactly `n` chunks under the default budget:
/// each fragment is one short paragraph well under the budget.
pub fn fragments_for_chunks(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("{}\n\n", long_paragraph(1700 + i)))
        .collect()
}
