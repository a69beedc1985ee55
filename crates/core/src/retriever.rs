use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{ScoredChunk, SearchError};

pub struct Retriever<'a> {
    encoder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    max_length: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(encoder: &'a dyn Embedder, index: &'a dyn VectorIndex, max_length: usize) -> Self {
        Self {
            encoder,
            index,
            max_length,
        }
    }

    /// `k` must lie in `1..=index.len()`; larger requests fail instead of
    /// being truncated.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if k == 0 || k > self.index.len() {
            return Err(SearchError::InvalidTopK {
                requested: k,
                available: self.index.len(),
            });
        }

        let query_vector = self.encoder.encode_one(query, self.max_length)?;
        if query_vector.len() != self.index.dimensions() {
            return Err(SearchError::DimensionMismatch {
                expected: self.index.dimensions(),
                actual: query_vector.len(),
            });
        }

        self.index.search(&query_vector, k)
    }
}
