//! External web search through a SearxNG-compatible JSON API.

use crate::error::ToolError;
use crate::retry::RetryPolicy;
use crate::tool::{RetrievalTool, ToolHit};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Chunk ids of web results are the result URL with this prefix.
pub const WEB_CHUNK_PREFIX: &str = "web:";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>, retry: RetryPolicy) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ToolError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn search_once(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
        let url = format!("{}/search", self.endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout
                } else {
                    ToolError::Unavailable(format!("Failed to reach {}: {}", url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("Search endpoint returned {}", status);
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                ToolError::Unavailable(message)
            } else {
                ToolError::Backend(message)
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Unavailable(format!("Failed to read search response: {}", e)))?;

        parse_results(&body, k)
    }
}

/// Turn a SearxNG JSON body into hits. Results without a URL are skipped.
fn parse_results(body: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ToolError::Backend(format!("Invalid search response: {}", e)))?;

    let returned = parsed.results.len();
    let hits: Vec<ToolHit> = parsed
        .results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .take(k)
        .enumerate()
        .map(|(rank, r)| {
            let text = match (r.title.trim(), r.content.trim()) {
                ("", content) => content.to_string(),
                (title, "") => title.to_string(),
                (title, content) => format!("{}\n{}", title, content),
            };

            ToolHit {
                chunk_id: format!("{}{}", WEB_CHUNK_PREFIX, r.url),
                text,
                source_uri: r.url,
                // Engines give no comparable score; use reciprocal position
                score: 1.0 / (rank as f64 + 1.0),
            }
        })
        .collect();

    tracing::debug!(returned, kept = hits.len(), "Parsed web results");
    Ok(hits)
}

#[async_trait::async_trait]
impl RetrievalTool for WebSearchTool {
    fn name(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Search the public web. Use when the local corpus is unlikely to cover the question."
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        self.retry
            .run("web search", || self.search_once(query, k))
            .await
    }
}
