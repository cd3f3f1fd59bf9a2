use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunk::chunk_text;
use crate::embedder::Embedder;
use crate::RetrievalError;

const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub text: String,
    /// Path of the note file the chunk was cut from, as it was given to the builder.
    pub source: String,
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteIndex {
    #[serde(default)]
    pub version: u32,
    pub dimensions: usize,
    pub chunks: Vec<IndexedChunk>,
}

impl NoteIndex {
    pub fn new(dimensions: usize) -> Self {
        Self { version: INDEX_FORMAT_VERSION, dimensions, chunks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn push(&mut self, chunk: IndexedChunk) -> Result<(), RetrievalError> {
        if chunk.embedding.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: chunk.embedding.len(),
            });
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Chunks and embeds every `*.txt` file in `notes_dir`, in file-name order.
    pub async fn build(
        notes_dir: &Path,
        embedder: &dyn Embedder,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, RetrievalError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(notes_dir).await.map_err(|source| {
            RetrievalError::Io { path: notes_dir.to_path_buf(), source }
        })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| RetrievalError::Io { path: notes_dir.to_path_buf(), source })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }
        files.sort();

        let mut index = Self::new(embedder.dimensions());
        for path in files {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| RetrievalError::Io { path: path.clone(), source })?;
            let chunks = chunk_text(&raw, chunk_size, chunk_overlap);
            if chunks.is_empty() {
                continue;
            }

            let embeddings = embedder.embed(&chunks).await?;
            let source = path.display().to_string();
            for (text, embedding) in chunks.into_iter().zip(embeddings) {
                index.push(IndexedChunk { text, source: source.clone(), embedding })?;
            }
            tracing::debug!(
                event_name = "retrieval.index.file_indexed",
                source = %source,
                chunks = index.len(),
                "note file indexed"
            );
        }

        Ok(index)
    }

    pub async fn load(path: &Path) -> Result<Self, RetrievalError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RetrievalError::Io { path: path.to_path_buf(), source })?;
        let index: Self = serde_json::from_str(&raw)
            .map_err(|e| RetrievalError::IndexFormat(format!("{}: {e}", path.display())))?;

        if let Some(bad) = index.chunks.iter().find(|chunk| chunk.embedding.len() != index.dimensions)
        {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimensions,
                actual: bad.embedding.len(),
            });
        }
        Ok(index)
    }

    pub async fn save(&self, path: &Path) -> Result<(), RetrievalError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RetrievalError::Io { path: parent.to_path_buf(), source })?;
        }
        let payload = serde_json::to_string(self)
            .map_err(|e| RetrievalError::IndexFormat(e.to_string()))?;
        tokio::fs::write(path, payload)
            .await
            .map_err(|source| RetrievalError::Io { path: PathBuf::from(path), source })
    }

    /// The `n` chunks most similar to `query`, best first. Ties keep index order.
    pub fn nearest(&self, query: &[f32], n: usize) -> Vec<&IndexedChunk> {
        let mut scored = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.partial_cmp(&left.0).unwrap_or(Ordering::Equal));
        scored.into_iter().take(n).map(|(_, chunk)| chunk).collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}
