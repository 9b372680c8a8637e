//! # Question Answering over the Index
//!
//! This module is the query-time half of the RAG pipeline: it embeds a
//! question, retrieves the nearest chunks from the published index and asks
//! the completion model to answer from them.
//!
//! ## Key Components
//!
//! - `SearchSystem`: holds the loaded index and the models, answers questions
//! - `SearchOptions`: how many chunks to retrieve
//! - `Answer`: the generated answer plus the source filenames it drew on
//!
//! The index handle is read-only here and shared by every request.

mod error;
mod prompt;

pub use error::SearchError;
pub use prompt::{ANSWER_INSTRUCTIONS, CONTEXT_SEPARATOR, build_prompt, distinct_sources};

use std::path::Path;

use rig::completion::{AssistantContent, CompletionModel};
use rig::embeddings::{EmbeddingError, EmbeddingModel};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::index::{RetrievedChunk, VectorIndex, open_published};
use crate::model::{Client, EmbeddingConversion};

/// Chunks retrieved per question by default
pub const DEFAULT_TOP_K: usize = 3;

/// Options for retrieval
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of nearest chunks handed to the model
    pub top_k: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// An answer with the files it was drawn from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Search system for RAG
pub struct SearchSystem<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    index: VectorIndex,
    client: Client<C, E>,
    options: SearchOptions,
}

impl<C, E> SearchSystem<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    /// Create a new search system over an open index
    pub fn new(index: VectorIndex, client: Client<C, E>, options: SearchOptions) -> Self {
        Self {
            index,
            client,
            options,
        }
    }

    /// Load the published index at `path` and check it matches the embedding model
    #[instrument(skip(client, options))]
    pub async fn open(
        path: &Path,
        client: Client<C, E>,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        let (index, manifest) = open_published(path).await?;
        let ndims = client.embedding().ndims();
        if manifest.dimensions != ndims {
            return Err(SearchError::IndexMismatch(format!(
                "index was built with {} ({} dimensions), embedding model has {} dimensions",
                manifest.embedding_model, manifest.dimensions, ndims
            )));
        }

        info!(
            "Loaded index with {} chunks from {}",
            manifest.total_chunks,
            path.display()
        );
        Ok(Self::new(index, client, options))
    }

    /// The `top_k` chunks nearest to `query`
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedChunk>, SearchError> {
        if self.options.top_k == 0 {
            return Err(SearchError::InvalidParameters(
                "top_k must be at least 1".to_string(),
            ));
        }

        let embedding = self
            .client
            .embedding()
            .embed_texts(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EmbeddingError::ProviderError("no embedding returned for query".to_string())
            })?;

        let results = self
            .index
            .search(&embedding.to_f32(), self.options.top_k)
            .await?;
        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }

    /// Answer a question from the retrieved chunks
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<Answer, SearchError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SearchError::EmptyQuestion);
        }

        let chunks = self.search(question).await?;
        let response = self
            .client
            .completion()
            .completion_request(build_prompt(&chunks, question))
            .preamble(ANSWER_INSTRUCTIONS.to_string())
            .temperature(0.0)
            .send()
            .await?;

        let answer = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("\n");

        Ok(Answer {
            answer,
            sources: distinct_sources(&chunks),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::index::IndexedChunk;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};
    use crate::processor::DocumentMetadata;
    use rig::embeddings::Embedding;
    use tempfile::TempDir;

    pub(crate) const DIMS: usize = 32;

    const CHUNKS: [(&str, &str); 4] = [
        (
            "kütüphane hafta içi sabah dokuzda açılır",
            "dataset/texts/kutuphane.txt",
        ),
        (
            "yemekhane öğle yemeği menüsü",
            "dataset/texts/yemekhane.txt",
        ),
        (
            "kütüphane kartı kayıt sırasında verilir",
            "dataset/documents/pdf/kayit.pdf",
        ),
        ("spor salonu üyelik ücreti", "dataset/texts/spor.txt"),
    ];

    /// Index the sample chunks with the mock embedder
    pub(crate) async fn sample_index(dir: &TempDir) -> VectorIndex {
        let embedder = MockEmbeddingModel::new(DIMS);
        let chunks: Vec<IndexedChunk> = CHUNKS
            .iter()
            .map(|(text, source)| IndexedChunk {
                text: text.to_string(),
                start: 0,
                position: 0,
                metadata: DocumentMetadata {
                    source: source.to_string(),
                    ..Default::default()
                },
                embedding: Embedding {
                    document: text.to_string(),
                    vec: embedder.vector(text),
                },
            })
            .collect();

        let index = VectorIndex::create(dir.path(), DIMS).await.unwrap();
        index.add_batch(0, &chunks).await.unwrap();
        index
    }

    pub(crate) async fn sample_system(
        dir: &TempDir,
        completion: MockCompletionModel,
    ) -> SearchSystem<MockCompletionModel, MockEmbeddingModel> {
        let client = Client::new(completion, MockEmbeddingModel::new(DIMS));
        SearchSystem::new(sample_index(dir).await, client, SearchOptions::default())
    }

    #[tokio::test]
    async fn test_search_returns_top_k_nearest() {
        let dir = TempDir::new().unwrap();
        let system = sample_system(&dir, MockCompletionModel::new()).await;

        let hits = system.search("kütüphane kaçta açılır").await.unwrap();

        assert_eq!(hits.len(), 3);
        assert!(hits[0].text.contains("kütüphane"));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_ask_answers_with_sources() {
        let dir = TempDir::new().unwrap();
        let completion = MockCompletionModel::new();
        completion.set_text_response("Kütüphane 09:00'da açılır.").await;
        let system = sample_system(&dir, completion.clone()).await;

        let answer = system.ask("  kütüphane kaçta açılır  ").await.unwrap();

        assert_eq!(answer.answer, "Kütüphane 09:00'da açılır.");
        assert_eq!(answer.sources.len(), 3);
        assert!(answer.sources.contains(&"kutuphane.txt".to_string()));

        let requests = completion.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].preamble.as_deref(), Some(ANSWER_INSTRUCTIONS));
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let dir = TempDir::new().unwrap();
        let completion = MockCompletionModel::new();
        let system = sample_system(&dir, completion.clone()).await;

        assert!(matches!(
            system.ask("   ").await,
            Err(SearchError::EmptyQuestion)
        ));
        assert!(completion.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let completion = MockCompletionModel::new();
        completion.set_error("quota exceeded").await;
        let system = sample_system(&dir, completion).await;

        assert!(matches!(
            system.ask("kütüphane").await,
            Err(SearchError::Completion(_))
        ));
    }

    #[tokio::test]
    async fn test_open_requires_published_index() {
        let dir = TempDir::new().unwrap();
        let client = Client::new(MockCompletionModel::new(), MockEmbeddingModel::new(DIMS));

        let result = SearchSystem::open(dir.path(), client, SearchOptions::default()).await;

        assert!(matches!(result, Err(SearchError::Database(_))));
    }
}
