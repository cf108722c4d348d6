//! Per-document nearest-neighbour index.
//!
//! Brute-force cosine similarity over the chunks of a single document.
//! An index is built from scratch on every upload and replaced wholesale,
//! so vectors from different documents are never compared.

#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub index: usize,
    pub text: String,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct ChunkIndex {
    chunks: Vec<IndexedChunk>,
}

impl ChunkIndex {
    pub fn build(chunks: Vec<(String, Vec<f32>)>) -> Self {
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(index, (text, vector))| IndexedChunk { index, text, vector })
            .collect();
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-k chunks by cosine similarity, most similar first.
    ///
    /// Deterministic for a fixed index and query vector: ties are broken
    /// by chunk position. Returns all chunks when fewer than `k` exist.
    pub fn query(&self, query_vec: &[f32], k: usize) -> Vec<&IndexedChunk> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|c| (cosine_similarity(query_vec, &c.vector), c))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.index.cmp(&b.1.index))
        });

        scored.into_iter().take(k).map(|(_, c)| c).collect()
    }
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
