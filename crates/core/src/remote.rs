use crate::embeddings::Embedder;
use crate::error::SearchError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone)]
pub struct EmbeddingEndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingEndpointConfig) -> Result<Self, SearchError> {
        if config.model.trim().is_empty() {
            return Err(SearchError::Model("embedding model name is empty".to_string()));
        }

        let base = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;
        let endpoint = base.join("embeddings")?;
        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
            model: config.model,
            dimensions: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Embedder for HttpEmbedder {
    fn model_id(&self) -> String {
        format!("http:{}:{}", self.endpoint, self.model)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, batch: &[&str], max_length: usize) -> Result<Vec<Vec<f32>>, SearchError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let payload = EmbeddingRequest {
            model: &self.model,
            input: batch
                .iter()
                .map(|text| truncate_words(text, max_length))
                .collect(),
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(SearchError::Model(format!(
                "embedding request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: EmbeddingResponse = response.json()?;
        order_embeddings(payload, batch.len())
    }
}

fn truncate_words(text: &str, max_length: usize) -> String {
    text.split_whitespace()
        .take(max_length)
        .collect::<Vec<_>>()
        .join(" ")
}

fn order_embeddings(
    mut payload: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, SearchError> {
    payload.data.sort_by_key(|entry| entry.index);
    if payload.data.len() != expected {
        return Err(SearchError::Model(format!(
            "endpoint returned {} embeddings for {} inputs",
            payload.data.len(),
            expected
        )));
    }
    Ok(payload.data.into_iter().map(|entry| entry.embedding).collect())
}
