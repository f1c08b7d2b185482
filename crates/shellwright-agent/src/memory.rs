//! Long-term memory: documents ranked by embedding similarity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellwright_ai::{AiError, Embedder};
use tokio::sync::RwLock;
use tracing::{debug, info};

const STORE_FILE: &str = "memory.json";

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("failed to generate embedding: {0}")]
    Embedding(#[from] AiError),

    #[error("memory I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHit {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub similarity: f32,
}

#[async_trait]
pub trait Memory: Send + Sync {
    /// Store `content` under `id`, replacing any previous document with
    /// that id.
    async fn memorize(
        &self,
        id: &str,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), MemoryError>;

    /// Up to `limit` documents most similar to `query`, best first. An
    /// empty store yields no hits.
    async fn recall(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>, MemoryError>;

    /// Remove `id`. Unknown ids are ignored.
    async fn forget(&self, id: &str) -> Result<(), MemoryError>;

    async fn list(&self) -> Result<Vec<MemoryDocument>, MemoryError>;
}

/// Vector memory persisted as a single JSON file.
pub struct VectorMemory {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    docs: RwLock<Vec<MemoryDocument>>,
}

impl VectorMemory {
    /// Open the store in `dir`, loading existing documents.
    pub async fn open(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(STORE_FILE);
        let docs = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = docs.len(), "memory store opened");
        Ok(Self {
            path,
            embedder,
            docs: RwLock::new(docs),
        })
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Write to a sibling temp file, then rename over the store.
    async fn persist(&self, docs: &[MemoryDocument]) -> Result<(), MemoryError> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(docs)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Memory for VectorMemory {
    async fn memorize(
        &self,
        id: &str,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), MemoryError> {
        let embedding = self.embedder.embed_content(content).await?;
        let doc = MemoryDocument {
            id: id.to_string(),
            content: content.to_string(),
            metadata,
            embedding,
        };

        let mut docs = self.docs.write().await;
        let mut next = docs.clone();
        match next.iter_mut().find(|d| d.id == id) {
            Some(existing) => *existing = doc,
            None => next.push(doc),
        }
        self.persist(&next).await?;
        *docs = next;
        info!(id, "memory saved");
        Ok(())
    }

    async fn recall(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>, MemoryError> {
        if limit == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed_content(query).await?;

        let docs = self.docs.read().await;
        let mut hits: Vec<MemoryHit> = docs
            .iter()
            .map(|d| MemoryHit {
                id: d.id.clone(),
                content: d.content.clone(),
                metadata: d.metadata.clone(),
                similarity: cosine_similarity(&query_embedding, &d.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn forget(&self, id: &str) -> Result<(), MemoryError> {
        let mut docs = self.docs.write().await;
        if !docs.iter().any(|d| d.id == id) {
            return Ok(());
        }
        let next: Vec<MemoryDocument> = docs.iter().filter(|d| d.id != id).cloned().collect();
        self.persist(&next).await?;
        *docs = next;
        info!(id, "memory forgotten");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MemoryDocument>, MemoryError> {
        Ok(self.docs.read().await.clone())
    }
}

/// Cosine similarity; 0 for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as counts of a few marker words.
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_content(&self, text: &str) -> Result<Vec<f32>, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = text.to_lowercase();
            Ok(["rust", "python", "disk"]
                .iter()
                .map(|w| text.matches(w).count() as f32)
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_content(&self, _text: &str) -> Result<Vec<f32>, AiError> {
            Err(AiError::NetworkError("offline".into()))
        }
    }

    fn embedder() -> Arc<KeywordEmbedder> {
        Arc::new(KeywordEmbedder {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn empty_store_recall_skips_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let emb = embedder();
        let memory = VectorMemory::open(dir.path(), emb.clone()).await.unwrap();
        assert!(memory.recall("anything", 5).await.unwrap().is_empty());
        assert_eq!(emb.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recall_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let memory = VectorMemory::open(dir.path(), embedder()).await.unwrap();
        memory.memorize("r", "User likes rust", HashMap::new()).await.unwrap();
        memory.memorize("p", "User writes python", HashMap::new()).await.unwrap();
        memory.memorize("d", "disk is full", HashMap::new()).await.unwrap();

        let hits = memory.recall("rust rust", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "r");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn memorize_upserts_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let memory = VectorMemory::open(dir.path(), embedder()).await.unwrap();
            let meta = HashMap::from([("type".to_string(), "note".to_string())]);
            memory.memorize("a", "first rust", meta).await.unwrap();
            memory.memorize("a", "second disk", HashMap::new()).await.unwrap();
            assert_eq!(memory.len().await, 1);
        }

        let reopened = VectorMemory::open(dir.path(), embedder()).await.unwrap();
        let docs = reopened.list().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "second disk");
        assert!(docs[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn forget_removes_and_ignores_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let memory = VectorMemory::open(dir.path(), embedder()).await.unwrap();
        memory.memorize("a", "rust", HashMap::new()).await.unwrap();

        memory.forget("missing").await.unwrap();
        assert_eq!(memory.len().await, 1);
        memory.forget("a").await.unwrap();
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn embedding_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let memory = VectorMemory::open(dir.path(), Arc::new(FailingEmbedder))
            .await
            .unwrap();
        let err = memory.memorize("a", "x", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(_)));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let memory = VectorMemory::open(dir.path(), embedder()).await.unwrap();
        memory.memorize("a", "rust", HashMap::new()).await.unwrap();

        // A directory in place of the temp file makes every write fail.
        std::fs::create_dir(dir.path().join("memory.json.tmp")).unwrap();

        let err = memory.memorize("b", "python", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::Io(_)));
        assert!(memory.forget("a").await.is_err());

        let ids: Vec<String> = memory.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a".to_string()]);
        let hits = memory.recall("python", 5).await.unwrap();
        assert!(hits.iter().all(|h| h.id != "b"));
    }
}
