//! # Mock Models for Testing
//!
//! `MockCompletionModel` returns a predefined response or error and records
//! the requests it sees. `MockEmbeddingModel` embeds text as a normalized
//! hashed bag of words, so texts sharing words land close together, and can be
//! told to fail after a number of calls.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    embeddings::{Embedding, EmbeddingError, EmbeddingModel},
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// What the completion mock saw in one request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub preamble: Option<String>,
    pub temperature: Option<f64>,
}

/// A mock completion model for testing purposes.
/// It returns a predefined response or error when `completion` is called.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    /// The predefined response to return. Arc<Mutex<>> allows modification after creation if needed.
    response: Arc<Mutex<Option<OneOrMany<AssistantContent>>>>,
    error: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
            error: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the response that the mock model should return.
    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        let mut guard = self.response.lock().await;
        *guard = Some(response);
    }

    /// Helper to create a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        let response = OneOrMany::one(AssistantContent::text(text));
        self.set_response(response).await;
    }

    /// Make every call fail with a provider error
    pub async fn set_error(&self, message: &str) {
        *self.error.lock().await = Some(message.to_string());
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.requests.lock().await.push(RecordedRequest {
            preamble: completion_request.preamble.clone(),
            temperature: completion_request.temperature,
        });

        if let Some(message) = self.error.lock().await.clone() {
            return Err(CompletionError::ProviderError(message));
        }

        let response = {
            let guard = self.response.lock().await;
            guard.clone()
        };
        match response {
            Some(result) => Ok(CompletionResponse {
                choice: result,
                raw_response: "".to_string(),
            }),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}

/// Deterministic embedding model for tests
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dims: usize,
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl MockEmbeddingModel {
    /// Model producing vectors of `dims` dimensions
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        }
    }

    /// Fail every call after the first `calls` successful ones
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Number of `embed_texts` calls so far, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Embed one text without counting a call
    pub fn vector(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dims;
            vec[bucket] += 1.0;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            // Zero vectors have no cosine distance
            vec[0] = 1.0;
        } else {
            vec.iter_mut().for_each(|v| *v /= norm);
        }
        vec
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 1024;

    fn ndims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(EmbeddingError::ProviderError(
                "mock embedding quota exhausted".to_string(),
            ));
        }

        Ok(texts
            .into_iter()
            .map(|document| Embedding {
                vec: self.vector(&document),
                document,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic() {
        let model = MockEmbeddingModel::new(16);

        let first = model
            .embed_texts(vec!["Kütüphane saatleri".to_string()])
            .await
            .unwrap();
        let second = model
            .embed_texts(vec!["kütüphane SAATLERI".to_string()])
            .await
            .unwrap();

        assert_eq!(first[0].vec, second[0].vec);
        assert_eq!(first[0].vec.len(), 16);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_embedding_failure() {
        let model = MockEmbeddingModel::new(8).failing_after(1);

        assert!(model.embed_texts(vec!["a".to_string()]).await.is_ok());
        assert!(model.embed_texts(vec!["b".to_string()]).await.is_err());
    }
}
