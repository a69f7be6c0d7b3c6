//! Knowledge search traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One ranked snippet from the knowledge index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Relevance score, higher is better
    pub score: f32,
    /// Document chunk text
    pub chunk: String,
    /// Source document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Chunk identifier within the index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Parent document identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Snippet {
    pub fn new(score: f32, chunk: impl Into<String>) -> Self {
        Self {
            score,
            chunk: chunk.into(),
            title: None,
            chunk_id: None,
            parent_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Knowledge search interface
///
/// Implementations:
/// - `AzureSearchClient` - Azure AI Search index query
#[async_trait]
pub trait KnowledgeSearch: Send + Sync + 'static {
    /// Search the index.
    ///
    /// `filter` is a provider-side filter expression (e.g.
    /// `modulo eq 'mounjaro'`); `top_k` bounds the result count. Results
    /// come back highest score first with empty chunks already dropped.
    async fn search(&self, query: &str, filter: Option<&str>, top_k: usize) -> Result<Vec<Snippet>>;

    /// Index name for logging
    fn index_name(&self) -> &str;
}
