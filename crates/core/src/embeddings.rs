use crate::error::SearchError;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

pub trait Embedder {
    fn model_id(&self) -> String;

    fn dimensions(&self) -> usize;

    fn embed_batch(&self, batch: &[&str], max_length: usize) -> Result<Vec<Vec<f32>>, SearchError>;

    fn encode(
        &self,
        texts: &[String],
        batch_size: usize,
        max_length: usize,
    ) -> Result<Vec<Vec<f32>>, SearchError> {
        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let inputs = batch.iter().map(String::as_str).collect::<Vec<_>>();
            let embedded = self.embed_batch(&inputs, max_length)?;
            if embedded.len() != inputs.len() {
                return Err(SearchError::Model(format!(
                    "{} returned {} embeddings for {} inputs",
                    self.model_id(),
                    embedded.len(),
                    inputs.len()
                )));
            }
            for vector in &embedded {
                check_dimensions(self.dimensions(), vector)?;
            }
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    fn encode_one(&self, text: &str, max_length: usize) -> Result<Vec<f32>, SearchError> {
        let mut embedded = self.embed_batch(&[text], max_length)?;
        let vector = embedded.pop().ok_or_else(|| {
            SearchError::Model(format!("{} returned no embedding", self.model_id()))
        })?;
        check_dimensions(self.dimensions(), &vector)?;
        Ok(vector)
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn model_id(&self) -> String {
        (**self).model_id()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn embed_batch(&self, batch: &[&str], max_length: usize) -> Result<Vec<Vec<f32>>, SearchError> {
        (**self).embed_batch(batch, max_length)
    }
}

pub fn check_dimensions(expected: usize, vector: &[f32]) -> Result<(), SearchError> {
    if vector.len() != expected {
        return Err(SearchError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str, max_length: usize) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let truncated = text
            .split_whitespace()
            .take(max_length)
            .collect::<Vec<_>>()
            .join(" ");
        let lowered = truncated.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn model_id(&self) -> String {
        format!("char-trigram-{}", self.dimensions.max(1))
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn embed_batch(&self, batch: &[&str], max_length: usize) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(batch.iter().map(|text| self.embed(text, max_length)).collect())
    }
}
