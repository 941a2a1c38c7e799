//! Web search clients backed by the tool registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

use super::{ToolCredential, ToolProvider, ToolRegistry};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const GOOGLE_API_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// One search result returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Short snippet or content excerpt.
    pub snippet: String,
}

/// Narrow interface over a web search provider.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs a query and returns up to `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;

    /// Provider identity, for logging and counters.
    fn provider(&self) -> ToolProvider;
}

/// Tavily search client (`search-primary`).
pub struct TavilySearch {
    api_key: String,
    http_client: Client,
}

impl TavilySearch {
    /// Creates a Tavily client from registry credentials.
    pub fn new(credential: &ToolCredential, timeout: Duration) -> Result<Self, ToolError> {
        Ok(Self {
            api_key: credential.key.clone(),
            http_client: build_http_client(timeout)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchClient for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: "advanced",
        };

        let response = self
            .http_client
            .post(TAVILY_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(ToolError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ParseError(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: truncate(&r.content, 400),
            })
            .collect())
    }

    fn provider(&self) -> ToolProvider {
        ToolProvider::SearchPrimary
    }
}

/// Google Programmable Search client (`search-secondary`).
pub struct GoogleSearch {
    api_key: String,
    engine_id: String,
    http_client: Client,
}

impl std::fmt::Debug for GoogleSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSearch")
            .field("engine_id", &self.engine_id)
            .finish_non_exhaustive()
    }
}

impl GoogleSearch {
    /// Creates a Google client from registry credentials.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Unavailable` when the credential lacks the
    /// search engine instance id.
    pub fn new(credential: &ToolCredential, timeout: Duration) -> Result<Self, ToolError> {
        let engine_id = credential
            .aux_id
            .clone()
            .ok_or_else(|| ToolError::Unavailable(ToolProvider::SearchSecondary.to_string()))?;

        Ok(Self {
            api_key: credential.key.clone(),
            engine_id,
            http_client: build_http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchClient for GoogleSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let response = self
            .http_client
            .get(GOOGLE_API_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", &max_results.min(10).to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(ToolError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let body: GoogleResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ParseError(e.to_string()))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }

    fn provider(&self) -> ToolProvider {
        ToolProvider::SearchSecondary
    }
}

/// Builds the search clients for every available provider, primary first.
///
/// An empty result means the run degrades to reasoning without web search.
pub fn build_search_clients(
    registry: &ToolRegistry,
    timeout: Duration,
) -> Vec<Box<dyn SearchClient>> {
    let mut clients: Vec<Box<dyn SearchClient>> = Vec::new();

    if let Ok(credential) = registry.get(ToolProvider::SearchPrimary) {
        match TavilySearch::new(credential, timeout) {
            Ok(client) => clients.push(Box::new(client)),
            Err(e) => tracing::warn!(error = %e, "Failed to build Tavily client"),
        }
    }

    if let Ok(credential) = registry.get(ToolProvider::SearchSecondary) {
        match GoogleSearch::new(credential, timeout) {
            Ok(client) => clients.push(Box::new(client)),
            Err(e) => tracing::warn!(error = %e, "Failed to build Google client"),
        }
    }

    clients
}

fn build_http_client(timeout: Duration) -> Result<Client, ToolError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ToolError::RequestFailed(format!("Failed to build HTTP client: {e}")))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;

    #[test]
    fn test_build_search_clients_ordering() {
        let env = EnvSnapshot::from_pairs([
            ("TAVILY_API_KEY", "tvly-123"),
            ("GOOGLE_API_KEY", "goog-456"),
            ("SEARCH_ENGINE_ID", "cse-789"),
        ]);
        let registry = ToolRegistry::from_env(&env);
        let clients = build_search_clients(&registry, Duration::from_secs(10));

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].provider(), ToolProvider::SearchPrimary);
        assert_eq!(clients[1].provider(), ToolProvider::SearchSecondary);
    }

    #[test]
    fn test_build_search_clients_degrades_to_empty() {
        let registry = ToolRegistry::from_env(&EnvSnapshot::default());
        let clients = build_search_clients(&registry, Duration::from_secs(10));
        assert!(clients.is_empty());
    }

    #[test]
    fn test_google_requires_engine_id() {
        let credential = ToolCredential {
            provider: ToolProvider::SearchSecondary,
            key: "goog-456".to_string(),
            aux_id: None,
        };
        let err = GoogleSearch::new(&credential, Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 400), "short");
        let truncated = truncate(&"é".repeat(300), 401);
        assert!(truncated.ends_with("..."));
    }

    #[tokio::test]
    async fn test_tavily_connection_error() {
        // No server behind this key; the request itself must fail cleanly.
        let credential = ToolCredential {
            provider: ToolProvider::SearchPrimary,
            key: "tvly-test".to_string(),
            aux_id: None,
        };
        let client = TavilySearch::new(&credential, Duration::from_millis(1)).expect("client");
        let result = client.search("rust", 3).await;
        assert!(matches!(result, Err(ToolError::RequestFailed(_))));
    }
}
