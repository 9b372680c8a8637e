//! # unirag - University Site Crawler and Question Answering
//!
//! This crate harvests a university web site into a plain-file dataset,
//! indexes that dataset into a local vector store and answers questions over
//! it with retrieval-augmented generation.
//!
//! ## Pipeline
//!
//! - `crawler`: breadth-first crawl of the allowed domains; pages are saved as
//!   text with a provenance header, office documents are saved as-is
//! - `processor`: loads the dataset, splits it into overlapping chunks and
//!   embeds them batch by batch into a resumable, atomically published index
//! - `index`: libsql vector store plus a build manifest
//! - `search`: embeds a question, retrieves the nearest chunks and asks the
//!   completion model to answer from them
//! - `server`: the HTTP query service
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use unirag::model::GeminiClient;
//! use unirag::search::{SearchOptions, SearchSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new_gemini_from_env()?;
//!     let search = SearchSystem::open(Path::new("index_gsu"), client, SearchOptions::default()).await?;
//!
//!     let answer = search.ask("Kütüphane kaçta açılıyor?").await?;
//!     println!("{}", answer.answer);
//!     for source in answer.sources {
//!         println!("- {}", source);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

// RAG pipeline modules
pub mod crawler;
pub mod index;
pub mod processor;
pub mod search;
pub mod server;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
