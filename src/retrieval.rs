//! Lexical relevance ranking over a record's accumulated chunks.
//!
//! Pure computation, no I/O: tokenize both sides, score by token overlap
//! with an exact-phrase bonus, and return the top chunks in descending
//! relevance. Deliberately simple bag-of-words ranking; the downstream
//! generation prompt does the heavy lifting.

use std::cmp::Ordering;
use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::store::KnowledgeStore;
use crate::types::{Chunk, FilmId};

/// Default number of chunks handed to the generation prompt.
pub const DEFAULT_TOP_N: usize = 7;

/// Flat score bonus when a chunk contains the full query-token phrase.
const PHRASE_BONUS: f64 = 0.5;

/// Common English function words plus the domain-generic "film"/"movie":
/// every chunk mentions those, so they carry no discriminative signal.
static STOPWORDS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "was", "are", "were", "been", "being", "have", "has", "had", "does", "did", "will",
        "would", "could", "should", "may", "might", "shall", "can", "that", "this", "these",
        "those", "its", "for", "with", "from", "about", "into", "through", "and", "but", "not",
        "what", "which", "who", "how", "why", "when", "where", "all", "just", "very", "film",
        "movie",
    ]
    .into_iter()
    .collect()
});

/// Unique meaningful tokens of a query, in first-occurrence order.
///
/// Order matters for the phrase bonus: the joined token string must be the
/// same on every call for identical queries.
#[derive(Clone, Debug, Default)]
struct QueryTokens {
    tokens: Vec<String>,
    phrase: String,
}

impl QueryTokens {
    fn parse(query: &str) -> Self {
        let tokens = tokenize(query);
        let phrase = tokens.join(" ");
        Self { tokens, phrase }
    }

    fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lowercase, strip non-alphanumerics, drop short tokens and stopwords.
/// Returns unique tokens preserving first-occurrence order.
fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out = Vec::new();
    for token in normalized.split_whitespace() {
        if token.len() <= 2 || STOPWORDS.contains(token) {
            continue;
        }
        if seen.insert(token) {
            out.push(token.to_string());
        }
    }
    out
}

fn score_chunk(query: &QueryTokens, chunk: &Chunk) -> f64 {
    let chunk_tokens: FxHashSet<String> = tokenize(&chunk.text).into_iter().collect();
    let overlap = query
        .tokens
        .iter()
        .filter(|t| chunk_tokens.contains(*t))
        .count();

    let mut score = overlap as f64 / query.tokens.len().max(1) as f64;

    if query.phrase.len() > 3 && chunk.text.to_lowercase().contains(&query.phrase) {
        score += PHRASE_BONUS;
    }

    score
}

/// Rank `chunks` against `query`, returning at most `top_n` in descending
/// relevance. Ties keep their original relative order (the sort is stable
/// on purpose, not incidentally).
///
/// A query with no meaningful tokens (all stopwords or punctuation) skips
/// scoring and returns the first `top_n` chunks in storage order, so a
/// vague question still gets context instead of nothing.
pub fn retrieve(query: &str, chunks: &[Chunk], top_n: usize) -> Vec<Chunk> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let query = QueryTokens::parse(query);
    if query.is_empty() {
        return chunks.iter().take(top_n).cloned().collect();
    }

    let mut scored: Vec<(f64, &Chunk)> = chunks
        .iter()
        .map(|chunk| (score_chunk(&query, chunk), chunk))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .take(top_n)
        .map(|(_, chunk)| chunk.clone())
        .collect()
}

/// Retrieval-consumer boundary: rank the chunks of one film's record.
/// A film with no record yields an empty vec, never an error.
pub fn retrieve_for_film(
    store: &KnowledgeStore,
    film_id: FilmId,
    query: &str,
    top_n: usize,
) -> Vec<Chunk> {
    store
        .get(film_id)
        .map(|record| retrieve(query, &record.chunks, top_n))
        .unwrap_or_default()
}

/// [`retrieve_for_film`] with the result count taken from an
/// [`EngineConfig`].
pub fn retrieve_for_film_with(
    config: &EngineConfig,
    store: &KnowledgeStore,
    film_id: FilmId,
    query: &str,
) -> Vec<Chunk> {
    retrieve_for_film(store, film_id, query, config.retrieve_top_n)
}
