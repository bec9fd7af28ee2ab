//! Deterministic text chunking.
//!
//! Splits arbitrary source text into bounded, paragraph-aligned fragments.
//! The algorithm is intentionally boring: paragraph-first accumulation
//! against a byte budget, with a sentence-level hard split for paragraphs
//! that alone exceed the budget. Identical input always produces identical
//! chunk boundaries and ids, which is what makes durable-tier rewrites
//! idempotent.

use crate::types::{Chunk, FilmId, SourceId};

/// Budget per chunk, roughly 450 tokens of prose.
pub const DEFAULT_CHUNK_BUDGET: usize = 1800;

/// Fragments at or under this length are treated as noise (stray lines,
/// navigation crumbs) and never become chunks on their own.
pub const DEFAULT_MIN_FRAGMENT: usize = 20;

/// Chunking policy. Copyable so concurrent source tasks can carry it by value.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    budget: usize,
    min_fragment: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            budget: DEFAULT_CHUNK_BUDGET,
            min_fragment: DEFAULT_MIN_FRAGMENT,
        }
    }
}

impl Chunker {
    pub fn new(budget: usize, min_fragment: usize) -> Self {
        Self {
            budget: budget.max(1),
            min_fragment,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn min_fragment(&self) -> usize {
        self.min_fragment
    }

    /// Split `text` into chunks attributed to `source`.
    ///
    /// Fails softly: empty or whitespace-only input yields an empty vec,
    /// never an error. No chunk exceeds the budget except when a single
    /// sentence alone does; splits never land mid-word.
    pub fn chunk(
        &self,
        text: &str,
        film_id: FilmId,
        source: &SourceId,
        metadata: Option<&serde_json::Value>,
    ) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();

        for para in paragraphs(text) {
            if para.trim().len() <= self.min_fragment {
                continue;
            }

            if current.len() + para.len() > self.budget && !current.is_empty() {
                self.flush(&mut current, &mut chunks, film_id, source, metadata);
            }

            if para.len() > self.budget {
                // Oversized paragraph: fall back to sentence boundaries.
                for sentence in sentences(&para) {
                    if current.len() + sentence.len() > self.budget && !current.is_empty() {
                        self.flush(&mut current, &mut chunks, film_id, source, metadata);
                    }
                    current.push_str(sentence);
                    current.push(' ');
                }
            } else {
                current.push_str(&para);
                current.push_str("\n\n");
            }
        }

        if current.trim().len() > self.min_fragment {
            self.flush(&mut current, &mut chunks, film_id, source, metadata);
        }

        chunks
    }

    fn flush(
        &self,
        current: &mut String,
        chunks: &mut Vec<Chunk>,
        film_id: FilmId,
        source: &SourceId,
        metadata: Option<&serde_json::Value>,
    ) {
        let text = current.trim().to_string();
        current.clear();
        if text.is_empty() {
            return;
        }
        let index = chunks.len();
        chunks.push(Chunk {
            id: Chunk::id_for(film_id, source, index),
            film_id,
            source: source.clone(),
            text,
            metadata: metadata.cloned(),
        });
    }
}

/// Paragraphs separated by one or more blank (or whitespace-only) lines.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
            }
        } else {
            if !buf.is_empty() {
                buf.push('\n');
            }
            buf.push_str(line);
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

/// Sentence-ish segments ending on a run of terminal punctuation (`. ! ?`).
///
/// A trailing fragment without terminal punctuation is kept as a final
/// segment rather than dropped, so no input text is ever lost to the split.
fn sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_terminal_run = false;

    for (idx, ch) in paragraph.char_indices() {
        let terminal = matches!(ch, '.' | '!' | '?');
        if in_terminal_run && !terminal {
            out.push(&paragraph[start..idx]);
            start = idx;
            in_terminal_run = false;
        } else if terminal {
            in_terminal_run = true;
        }
    }

    if start < paragraph.len() {
        out.push(&paragraph[start..]);
    }
    if out.is_empty() {
        out.push(paragraph);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_split_on_blank_line_runs() {
        let text = "first line\nstill first\n\n\nsecond\n\nthird";
        assert_eq!(
            paragraphs(text),
            vec!["first line\nstill first", "second", "third"]
        );
    }

    #[test]
    fn sentences_keep_trailing_fragment() {
        let segs = sentences("One sentence. Another one! And tail without punct");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], "One sentence.");
        assert_eq!(segs[2], " And tail without punct");
    }

    #[test]
    fn sentences_treat_punctuation_runs_as_one_boundary() {
        let segs = sentences("Wait... really?! Yes.");
        assert_eq!(segs, vec!["Wait...", " really?!", " Yes."]);
    }
}
