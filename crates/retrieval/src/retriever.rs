use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use precall_core::domain::client_slug;
use precall_core::domain::note::NoteSnippet;

use crate::embedder::Embedder;
use crate::index::{IndexedChunk, NoteIndex};
use crate::RetrievalError;

#[async_trait]
pub trait NoteSearch: Send + Sync {
    /// At most `k` snippets for `query`, best match first. When `client_name` is given,
    /// only notes whose source mentions the client's slug are kept, unless that leaves
    /// nothing, in which case the unfiltered top `k` are returned.
    async fn search(
        &self,
        query: &str,
        k: usize,
        client_name: Option<&str>,
    ) -> Result<Vec<NoteSnippet>, RetrievalError>;
}

#[async_trait]
impl<T> NoteSearch for Arc<T>
where
    T: NoteSearch + ?Sized,
{
    async fn search(
        &self,
        query: &str,
        k: usize,
        client_name: Option<&str>,
    ) -> Result<Vec<NoteSnippet>, RetrievalError> {
        (**self).search(query, k, client_name).await
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Selection {
    pub snippets: Vec<NoteSnippet>,
    pub unfiltered_fallback: bool,
}

/// Applies client filtering, exact-text de-duplication and truncation to `candidates`
/// (already in similarity order). The unfiltered fallback is not de-duplicated.
pub fn select_snippets(
    candidates: &[&IndexedChunk],
    k: usize,
    client_name: Option<&str>,
) -> Selection {
    let slug = client_name.map(client_slug);
    let mut seen = HashSet::new();
    let mut snippets = Vec::new();

    for candidate in candidates {
        if snippets.len() >= k {
            break;
        }
        if let Some(slug) = &slug {
            if !candidate.source.to_lowercase().contains(slug.as_str()) {
                continue;
            }
        }

        let snippet = NoteSnippet::new(&candidate.text, basename(&candidate.source));
        if seen.insert(snippet.text.clone()) {
            snippets.push(snippet);
        }
    }

    if snippets.is_empty() && slug.is_some() && !candidates.is_empty() {
        let snippets = candidates
            .iter()
            .take(k)
            .map(|candidate| NoteSnippet::new(&candidate.text, basename(&candidate.source)))
            .collect();
        return Selection { snippets, unfiltered_fallback: true };
    }

    Selection { snippets, unfiltered_fallback: false }
}

fn basename(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

pub struct NotesRetriever {
    index: NoteIndex,
    embedder: Arc<dyn Embedder>,
}

impl NotesRetriever {
    pub fn new(index: NoteIndex, embedder: Arc<dyn Embedder>) -> Result<Self, RetrievalError> {
        if !index.is_empty() && index.dimensions != embedder.dimensions() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimensions,
                actual: embedder.dimensions(),
            });
        }
        Ok(Self { index, embedder })
    }

    pub async fn open(index_path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, RetrievalError> {
        let index = NoteIndex::load(index_path).await?;
        tracing::debug!(
            event_name = "retrieval.index.loaded",
            path = %index_path.display(),
            chunks = index.len(),
            "note index loaded"
        );
        Self::new(index, embedder)
    }

    pub fn index(&self) -> &NoteIndex {
        &self.index
    }
}

#[async_trait]
impl NoteSearch for NotesRetriever {
    async fn search(
        &self,
        query: &str,
        k: usize,
        client_name: Option<&str>,
    ) -> Result<Vec<NoteSnippet>, RetrievalError> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;
        let candidates = self.index.nearest(&query_vector, k * 2);
        let selection = select_snippets(&candidates, k, client_name);

        if selection.unfiltered_fallback {
            tracing::info!(
                event_name = "retrieval.search.fallback_unfiltered",
                client_name = client_name.unwrap_or_default(),
                returned = selection.snippets.len(),
                "no note matched the client slug; returning unfiltered results"
            );
        }
        Ok(selection.snippets)
    }
}
