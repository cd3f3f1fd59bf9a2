//! Semantic search over meeting notes.
//!
//! Notes are chunked, embedded and persisted as a JSON index by [`NoteIndex::build`]. At
//! query time [`NotesRetriever`] embeds the query, pulls the nearest chunks and narrows
//! them to one client by matching the client slug against each chunk's source path.

pub mod chunk;
pub mod embedder;
pub mod index;
pub mod retriever;

use std::path::PathBuf;

use thiserror::Error;

pub use chunk::chunk_text;
pub use embedder::{Embedder, HashingEmbedder};
pub use index::{IndexedChunk, NoteIndex};
pub use retriever::{select_snippets, NoteSearch, NotesRetriever, Selection};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("i/o error on `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("note index is malformed: {0}")]
    IndexFormat(String),
    #[error("embedding dimension mismatch: index has {expected}, embedder produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
