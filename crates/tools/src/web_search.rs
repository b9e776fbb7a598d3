//! web_search: look things up on the web (addresses, opening hours,
//! event details) through a pluggable search backend.

use async_trait::async_trait;
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, ToolError>;
}

/// Tavily search API.
pub struct TavilySearch {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: TAVILY_SEARCH_URL.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SearchBackend for TavilySearch {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, ToolError> {
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Backend(format!("search request failed: {e}")))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status, body = %text, "Search API returned error");
            return Err(ToolError::Backend(format!("search API returned {status}: {text}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Backend(format!("failed to parse search response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

pub struct WebSearchTool {
    spec: ToolSpec,
    backend: Arc<dyn SearchBackend>,
    default_results: u32,
}

#[derive(Deserialize)]
struct Args {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, default_results: u32) -> Self {
        let spec = ToolSpec::new(
            "web_search",
            "Search the web. Use it for facts the calendar does not hold, such as a \
             venue's address or when a public event takes place.",
        )
        .param(ParamSpec::required("query", ParamType::String, "The search query"))
        .param(
            ParamSpec::optional(
                "max_results",
                ParamType::Integer,
                "Number of results to return",
            )
            .with_default(serde_json::json!(default_results)),
        );

        Self {
            spec,
            backend,
            default_results,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }
        let max_results = args.max_results.unwrap_or(self.default_results).clamp(1, 10);

        let results = self.backend.search(query, max_results).await?;
        debug!(query, hits = results.len(), "Web search");
        Ok(serde_json::json!({ "query": query, "results": results }))
    }
}
