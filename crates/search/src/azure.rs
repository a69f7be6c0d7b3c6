//! Azure AI Search index client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use totem_config::SearchSettings;
use totem_core::{Error, KnowledgeSearch, Result, Snippet};

/// Azure AI Search client for the knowledge index
pub struct AzureSearchClient {
    client: Client,
    cfg: SearchSettings,
}

impl AzureSearchClient {
    pub fn new(cfg: SearchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.cfg.endpoint, self.cfg.index_name, self.cfg.api_version
        )
    }

    /// Default filter applied when the caller does not supply one
    pub fn default_filter(&self) -> &str {
        &self.cfg.default_filter
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    filter: &'a str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchDocument>,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(rename = "@search.score", default)]
    score: f32,
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    chunk_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

#[async_trait]
impl KnowledgeSearch for AzureSearchClient {
    async fn search(&self, query: &str, filter: Option<&str>, top_k: usize) -> Result<Vec<Snippet>> {
        let filter = filter.unwrap_or(&self.cfg.default_filter);
        debug!(%query, %filter, top_k, "searching knowledge index");

        let request = SearchRequest {
            search: query,
            filter,
            top: top_k,
        };

        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.cfg.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Search(format!("index query failed: {status} {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Search(format!("bad search response: {e}")))?;

        let snippets: Vec<Snippet> = parsed
            .value
            .into_iter()
            .filter_map(|doc| {
                let chunk = doc.chunk?;
                if chunk.trim().is_empty() {
                    return None;
                }
                Some(Snippet {
                    score: doc.score,
                    chunk,
                    title: doc.title,
                    chunk_id: doc.chunk_id,
                    parent_id: doc.parent_id,
                })
            })
            .collect();

        debug!(results = snippets.len(), "index query complete");
        Ok(snippets)
    }

    fn index_name(&self) -> &str {
        &self.cfg.index_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let client = AzureSearchClient::new(SearchSettings::default()).unwrap();
        let url = client.search_url();
        assert!(url.contains("/indexes/iadium-knowledge/docs/search"));
        assert!(url.contains("api-version=2023-07-01-Preview"));
    }

    #[test]
    fn test_response_parsing_drops_empty_chunks() {
        let raw = r#"{
            "value": [
                { "@search.score": 4.2, "chunk": "Mounjaro es tirzepatida.", "title": "ficha" },
                { "@search.score": 3.1, "chunk": "   " },
                { "@search.score": 2.0 }
            ]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let snippets: Vec<Snippet> = parsed
            .value
            .into_iter()
            .filter_map(|doc| {
                let chunk = doc.chunk?;
                if chunk.trim().is_empty() {
                    return None;
                }
                Some(Snippet::new(doc.score, chunk))
            })
            .collect();

        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].chunk.contains("tirzepatida"));
    }
}
