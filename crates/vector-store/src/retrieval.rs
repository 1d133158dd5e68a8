use crate::embeddings::Embedder;
use crate::error::VectorStoreError;
use crate::manager::IndexManager;
use crate::types::{DocumentSummary, IndexStats, InsertReport, SearchHit};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

/// What the answer-generation side needs to know about a failure.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The embedding has the wrong shape for this index (usually a model change).
    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(#[source] VectorStoreError),

    /// The embedding collaborator failed; nothing was inserted.
    #[error("Embedding failed: {0}")]
    Embedding(#[source] VectorStoreError),

    /// The snapshot could not be read or written.
    #[error("Persistence failed: {0}")]
    Persistence(#[source] VectorStoreError),

    /// The record store and vector index disagree.
    #[error("Index consistency violated: {0}")]
    Consistency(#[source] VectorStoreError),
}

impl From<VectorStoreError> for RetrievalError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::DimensionMismatch { .. }
            | VectorStoreError::InvalidVector(_)
            | VectorStoreError::Other(_) => Self::InvalidEmbedding(err),
            VectorStoreError::Embedding { .. } => Self::Embedding(err),
            VectorStoreError::Io(_)
            | VectorStoreError::Serialization(_)
            | VectorStoreError::Corrupt(_) => Self::Persistence(err),
            VectorStoreError::EmptyIndex
            | VectorStoreError::NotFound(_)
            | VectorStoreError::DuplicateSlot(_) => Self::Consistency(err),
        }
    }
}

/// Shared handle over one [`IndexManager`].
///
/// Searches run concurrently under a read lock. Inserts embed their segments
/// before taking the write lock, so a slow model never blocks readers, and
/// readers only ever observe an index before or after a whole document.
#[derive(Clone)]
pub struct Retriever {
    manager: Arc<RwLock<IndexManager>>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(manager: IndexManager, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            manager: Arc::new(RwLock::new(manager)),
            embedder,
        }
    }

    /// Opens the index stored under `dir`, starting empty if nothing was saved yet.
    pub async fn open(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> RetrievalResult<Self> {
        let mut manager = IndexManager::new(dir);
        manager.load().await?;
        Ok(Self::new(manager, embedder))
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub async fn insert_document(
        &self,
        document_id: &str,
        title: &str,
        segments: Vec<String>,
    ) -> RetrievalResult<InsertReport> {
        let texts: Vec<&str> = segments.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != segments.len() {
            return Err(RetrievalError::Embedding(VectorStoreError::embedding(
                vectors.len(),
                format!(
                    "embedder returned {} vectors for {} segments",
                    vectors.len(),
                    segments.len()
                ),
            )));
        }
        let embedded = segments.into_iter().zip(vectors).collect();

        let mut manager = self.manager.write().await;
        Ok(manager.insert_embedded(document_id, title, embedded).await?)
    }

    /// Embeds `question` and returns the `k` closest passages.
    pub async fn search(&self, question: &str, k: usize) -> RetrievalResult<Vec<SearchHit>> {
        if question.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(RetrievalError::Embedding)?;
        self.search_embedding(&embedding, k).await
    }

    pub async fn search_embedding(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> RetrievalResult<Vec<SearchHit>> {
        let manager = self.manager.read().await;
        Ok(manager.search(embedding, k)?)
    }

    pub async fn retrieve_context(
        &self,
        question: &str,
        k: usize,
    ) -> RetrievalResult<RetrievedContext> {
        Ok(RetrievedContext {
            hits: self.search(question, k).await?,
        })
    }

    /// Retries persistence, e.g. after an insert reported a save failure.
    pub async fn save(&self) -> RetrievalResult<()> {
        let mut manager = self.manager.write().await;
        Ok(manager.save().await?)
    }

    /// Re-reads the snapshot from disk, discarding unsaved inserts.
    pub async fn reload(&self) -> RetrievalResult<()> {
        let mut manager = self.manager.write().await;
        Ok(manager.load().await?)
    }

    pub async fn documents(&self) -> Vec<DocumentSummary> {
        self.manager.read().await.documents()
    }

    pub async fn stats(&self) -> IndexStats {
        self.manager.read().await.stats()
    }
}

/// Ranked passages prepared for prompting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePreview {
    pub title: String,
    pub preview: String,
}

impl RetrievedContext {
    /// Passage texts in rank order, one per line.
    #[must_use]
    pub fn context(&self) -> String {
        self.hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Score of the best passage, `0.0` when nothing matched.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.hits.first().map_or(0.0, |hit| hit.score)
    }

    #[must_use]
    pub fn sources(&self, preview_chars: usize) -> Vec<SourcePreview> {
        self.hits
            .iter()
            .map(|hit| SourcePreview {
                title: hit.title.clone(),
                preview: preview(&hit.text, preview_chars),
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::StubEmbedder;
    use tempfile::TempDir;

    fn hit(text: &str, score: f32) -> SearchHit {
        SearchHit {
            slot: 0,
            document_id: "d".to_string(),
            title: "Guide".to_string(),
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn context_joins_in_rank_order() {
        let ctx = RetrievedContext {
            hits: vec![hit("first", 0.9), hit("second", 0.4)],
        };
        assert_eq!(ctx.context(), "first\nsecond");
        assert!((ctx.confidence() - 0.9).abs() < f32::EPSILON);
        assert_eq!(RetrievedContext::default().confidence(), 0.0);
    }

    #[test]
    fn previews_truncate_on_char_boundaries() {
        let ctx = RetrievedContext {
            hits: vec![hit("héllo wörld", 1.0), hit("tiny", 0.5)],
        };
        let sources = ctx.sources(5);
        assert_eq!(sources[0].preview, "héllo...");
        assert_eq!(sources[1].preview, "tiny");
    }

    #[test]
    fn errors_are_translated() {
        let err: RetrievalError = VectorStoreError::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(matches!(err, RetrievalError::InvalidEmbedding(_)));

        let err: RetrievalError = VectorStoreError::corrupt("bad").into();
        assert!(matches!(err, RetrievalError::Persistence(_)));

        let err: RetrievalError = VectorStoreError::NotFound(4).into();
        assert!(matches!(err, RetrievalError::Consistency(_)));
    }

    #[tokio::test]
    async fn fresh_store_answers_with_nothing() {
        let tmp = TempDir::new().unwrap();
        let retriever = Retriever::open(tmp.path(), Arc::new(StubEmbedder::new(8)))
            .await
            .unwrap();
        let ctx = retriever.retrieve_context("anything?", 3).await.unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.confidence(), 0.0);
    }

    #[tokio::test]
    async fn exact_segment_text_is_the_top_hit() {
        let tmp = TempDir::new().unwrap();
        let retriever = Retriever::open(tmp.path(), Arc::new(StubEmbedder::new(32)))
            .await
            .unwrap();
        retriever
            .insert_document(
                "doc",
                "Notes",
                vec![
                    "borrow checker rules".to_string(),
                    "async runtimes".to_string(),
                ],
            )
            .await
            .unwrap();

        let hits = retriever.search("async runtimes", 2).await.unwrap();
        assert_eq!(hits[0].text, "async runtimes");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[1].score < hits[0].score);
    }

    #[tokio::test]
    async fn nan_embedding_is_an_invalid_embedding() {
        let tmp = TempDir::new().unwrap();
        let retriever = Retriever::open(tmp.path(), Arc::new(StubEmbedder::new(4)))
            .await
            .unwrap();
        retriever
            .insert_document("doc", "Notes", vec!["lifetimes".to_string()])
            .await
            .unwrap();

        let err = retriever
            .search_embedding(&[f32::NAN, 0.0, 0.0, 0.0], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidEmbedding(_)), "{err}");
    }
}
