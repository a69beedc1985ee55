use crate::{ScoredChunk, SearchError};
use std::path::Path;

pub trait VectorIndex {
    fn dimensions(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, SearchError>;

    fn save(&self, path: &Path) -> Result<(), SearchError>;
}
