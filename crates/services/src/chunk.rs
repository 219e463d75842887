//! Splits study material into overlapping segments and picks the segments
//! most related to a query, so oversized retrieved context can be focused
//! before it reaches a generation prompt.

use std::collections::HashSet;

/// Truncate to at most `max_chars` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Split text into overlapping segments of roughly `chunk_size` characters.
///
/// Consecutive chunks share `overlap` characters so sentence fragments at a
/// boundary still appear whole in one of the two neighbors.
#[must_use]
pub fn split_overlapping(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Token-overlap similarity index over a set of chunks.
///
/// Ranking quality is deliberately modest; any stronger retrieval backend
/// can replace this without the callers noticing.
#[derive(Debug)]
pub struct ChunkIndex {
    chunks: Vec<String>,
    tokens: Vec<HashSet<String>>,
}

impl ChunkIndex {
    #[must_use]
    pub fn build(chunks: Vec<String>) -> Self {
        let tokens = chunks.iter().map(|chunk| tokenize(chunk)).collect();
        Self { chunks, tokens }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-`k` chunks by shared-token count with the query.
    ///
    /// Ties keep the original chunk order; chunks sharing no token are
    /// excluded entirely.
    #[must_use]
    pub fn query(&self, query: &str, k: usize) -> Vec<&str> {
        let query_tokens = tokenize(query);
        let mut scored: Vec<(usize, usize)> = self
            .tokens
            .iter()
            .enumerate()
            .map(|(i, tokens)| (i, tokens.intersection(&query_tokens).count()))
            .filter(|(_, score)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.chunks[i].as_str())
            .collect()
    }
}

/// Reduce `text` to approximately `target_chars` of material related to
/// `query`. Text already within the budget passes through unchanged.
#[must_use]
pub fn focus(text: &str, query: &str, target_chars: usize) -> String {
    if text.chars().count() <= target_chars {
        return text.to_string();
    }

    let chunk_size = (target_chars / 3).max(200);
    let index = ChunkIndex::build(split_overlapping(text, chunk_size, chunk_size / 5));
    let top = index.query(query, 3);
    if top.is_empty() {
        return truncate_chars(text, target_chars).to_string();
    }
    top.join("\n\n")
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
