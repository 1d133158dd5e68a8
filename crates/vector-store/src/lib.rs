//! # DocMentor Vector Store
//!
//! Semantic document index for question answering over uploaded documents.
//!
//! ## Features
//!
//! - **Exact nearest-neighbour search** by squared Euclidean distance
//! - **Stable slot ids** shared by each vector and its provenance record
//! - **All-or-nothing inserts** per document
//! - **Crash-detectable persistence** (generation-stamped, checksummed artifacts)
//! - **Single-writer, multi-reader** access through [`Retriever`]
//!
//! ## Architecture
//!
//! ```text
//! Segments + Embedder
//!     │
//!     └──> Retriever (embed outside the lock)
//!            │
//!            └──> IndexManager (write lock)
//!                   ├─> RecordStore   slot -> {document_id, title, text}
//!                   ├─> FlatIndex     slot -> vector
//!                   └─> vectors.bin + records.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use docmentor_vector_store::{Retriever, StubEmbedder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let retriever = Retriever::open("data/vector_store", Arc::new(StubEmbedder::default())).await?;
//!
//!     retriever
//!         .insert_document("doc-1", "Handbook", vec!["Rust has no GC.".to_string()])
//!         .await?;
//!
//!     for hit in retriever.search("Does Rust use garbage collection?", 3).await? {
//!         println!("{} ({:.3}): {}", hit.title, hit.score, hit.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod manager;
mod paths;
mod record_store;
mod retrieval;
mod snapshot;
mod types;

pub use embeddings::{Embedder, StubEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::{FlatIndex, VectorIndex};
pub use manager::IndexManager;
pub use paths::{StorePaths, DEFAULT_STORE_DIR, RECORDS_FILE_NAME, VECTORS_FILE_NAME};
pub use record_store::RecordStore;
pub use retrieval::{
    RetrievalError, RetrievalResult, RetrievedContext, Retriever, SourcePreview,
};
pub use snapshot::{RECORDS_SCHEMA_VERSION, VECTORS_FORMAT_VERSION};
pub use types::{
    distance_to_score, DocumentSummary, IndexStats, InsertReport, SearchHit, SlotId,
    VectorRecord,
};
