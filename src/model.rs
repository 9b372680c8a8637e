//! # LLM Client Module
//!
//! This module provides a unified client interface for the embedding and
//! answer-generation models, with built-in rate limiting to prevent API quota
//! exhaustion.
//!
//! ## Key Components
//!
//! - `Client`: A unified client that wraps both completion and embedding models
//! - `RateLimitedCompletionModel`: A wrapper that adds rate limiting to any completion model
//! - `RateLimitedEmbeddingModel`: A wrapper that adds rate limiting to any embedding model
//! - `EmbeddingConversion`: Utilities for converting between embedding formats
//!
//! Both models are opaque collaborators: the rest of the crate only relies on
//! the `rig` traits, so tests swap in the deterministic models from
//! `mock_model`.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use ratelimited_embedding::RateLimitedEmbeddingModel;
use rig::{completion::CompletionModel, embeddings::EmbeddingModel, providers::gemini};

use crate::error::{Error, Result};

pub mod embedding;
#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Model used to answer questions
pub const COMPLETION_MODEL: &str = "gemini-2.0-flash";

/// Model used to embed chunks and questions
pub const EMBEDDING_MODEL: &str = gemini::embedding::EMBEDDING_004;

const COMPLETIONS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(2000).unwrap();
const EMBEDDINGS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(1000).unwrap();

/// Rate-limited Gemini answer model
pub type GeminiCompletionModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

/// Rate-limited Gemini embedding model
pub type GeminiEmbeddingModel = RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>;

/// Client type used in production
pub type GeminiClient = Client<GeminiCompletionModel, GeminiEmbeddingModel>;

#[derive(Debug, Clone)]
pub struct Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    completion_model: C,
    embedding_model: E,
}

pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

impl GeminiClient {
    /// Build the client from `GEMINI_API_KEY`
    pub fn new_gemini_from_env() -> Result<Self> {
        let gemini_api_key = read_api_key()?;
        let gemini_client = gemini::Client::new(&gemini_api_key);
        Ok(Self::new_gemini(gemini_client))
    }

    pub fn new_gemini(gemini_client: gemini::Client) -> Self {
        let completion_limiter = RateLimiter::direct(Quota::per_minute(COMPLETIONS_PER_MINUTE));
        let embedding_limiter = RateLimiter::direct(Quota::per_minute(EMBEDDINGS_PER_MINUTE));
        let completion_model = RateLimitedCompletionModel::new(
            gemini_client.completion_model(COMPLETION_MODEL),
            completion_limiter,
        );
        let embedding_model = RateLimitedEmbeddingModel::new(
            gemini_client.embedding_model(EMBEDDING_MODEL),
            embedding_limiter,
        );
        Self {
            completion_model,
            embedding_model,
        }
    }
}

impl<C, E> Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    /// Bundle an arbitrary pair of models
    pub fn new(completion_model: C, embedding_model: E) -> Self {
        Self {
            completion_model,
            embedding_model,
        }
    }

    pub fn completion(&self) -> &C {
        &self.completion_model
    }

    pub fn embedding(&self) -> &E {
        &self.embedding_model
    }
}

/// Read the API key from the environment and check its shape
pub fn read_api_key() -> Result<String> {
    let key = std::env::var(API_KEY_ENV)
        .map_err(|_| Error::Auth(format!("{} environment variable must be set", API_KEY_ENV)))?;
    validate_api_key(&key)?;
    Ok(key)
}

/// Reject keys that are empty, padded or contain whitespace
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Auth("API key is empty".to_string()));
    }
    if key.trim() != key {
        return Err(Error::Auth(
            "API key has leading or trailing whitespace".to_string(),
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(Error::Auth("API key contains whitespace".to_string()));
    }
    Ok(())
}
