//! Credential registry for external tool providers.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EnvSnapshot;
use crate::error::ToolError;

/// An external capability the agent may invoke during the acting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolProvider {
    /// Primary web search (Tavily).
    SearchPrimary,
    /// Secondary web search (Google Programmable Search).
    SearchSecondary,
    /// Browser automation driver.
    Browser,
}

impl ToolProvider {
    /// All known providers.
    pub const ALL: [ToolProvider; 3] = [
        ToolProvider::SearchPrimary,
        ToolProvider::SearchSecondary,
        ToolProvider::Browser,
    ];
}

impl fmt::Display for ToolProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolProvider::SearchPrimary => write!(f, "search-primary"),
            ToolProvider::SearchSecondary => write!(f, "search-secondary"),
            ToolProvider::Browser => write!(f, "browser"),
        }
    }
}

/// Credentials for one tool provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCredential {
    /// Provider these credentials belong to.
    pub provider: ToolProvider,
    /// Key material (API key, or endpoint for the browser driver).
    pub key: String,
    /// Auxiliary identifier, e.g. a search engine instance id.
    pub aux_id: Option<String>,
}

/// Registry of tool provider credentials, built once at startup.
///
/// Providers are independent: one missing credential never affects the
/// availability of another.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    credentials: HashMap<ToolProvider, ToolCredential>,
}

impl ToolRegistry {
    /// Builds the registry from an environment snapshot.
    ///
    /// Reads `TAVILY_API_KEY`, `GOOGLE_API_KEY` + `SEARCH_ENGINE_ID`, and
    /// `BROWSER_WS_ENDPOINT`. A provider with any required field empty is
    /// left out of the registry.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let mut credentials = HashMap::new();

        if let Some(key) = env.get("TAVILY_API_KEY") {
            credentials.insert(
                ToolProvider::SearchPrimary,
                ToolCredential {
                    provider: ToolProvider::SearchPrimary,
                    key: key.to_string(),
                    aux_id: None,
                },
            );
        }

        // Google search needs both the API key and the engine instance id.
        if let (Some(key), Some(engine_id)) =
            (env.get("GOOGLE_API_KEY"), env.get("SEARCH_ENGINE_ID"))
        {
            credentials.insert(
                ToolProvider::SearchSecondary,
                ToolCredential {
                    provider: ToolProvider::SearchSecondary,
                    key: key.to_string(),
                    aux_id: Some(engine_id.to_string()),
                },
            );
        }

        if let Some(endpoint) = env.get("BROWSER_WS_ENDPOINT") {
            credentials.insert(
                ToolProvider::Browser,
                ToolCredential {
                    provider: ToolProvider::Browser,
                    key: endpoint.to_string(),
                    aux_id: None,
                },
            );
        }

        Self { credentials }
    }

    /// Returns true if all required fields for `provider` are present.
    pub fn available(&self, provider: ToolProvider) -> bool {
        self.credentials.contains_key(&provider)
    }

    /// Returns the credentials for `provider`.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Unavailable` when the provider was not usable at
    /// startup. Callers either check [`available`](Self::available) first
    /// or treat this as a soft degradation.
    pub fn get(&self, provider: ToolProvider) -> Result<&ToolCredential, ToolError> {
        self.credentials
            .get(&provider)
            .ok_or_else(|| ToolError::Unavailable(provider.to_string()))
    }

    /// Returns true if at least one web search provider is usable.
    pub fn any_search_available(&self) -> bool {
        self.available(ToolProvider::SearchPrimary) || self.available(ToolProvider::SearchSecondary)
    }

    /// Providers present in the registry, for startup logging.
    pub fn available_providers(&self) -> Vec<ToolProvider> {
        ToolProvider::ALL
            .iter()
            .copied()
            .filter(|p| self.available(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_full_env() {
        let env = EnvSnapshot::from_pairs([
            ("TAVILY_API_KEY", "tvly-123"),
            ("GOOGLE_API_KEY", "goog-456"),
            ("SEARCH_ENGINE_ID", "cse-789"),
            ("BROWSER_WS_ENDPOINT", "ws://localhost:9222"),
        ]);
        let registry = ToolRegistry::from_env(&env);

        assert!(registry.available(ToolProvider::SearchPrimary));
        assert!(registry.available(ToolProvider::SearchSecondary));
        assert!(registry.available(ToolProvider::Browser));
        assert_eq!(registry.available_providers().len(), 3);

        let google = registry
            .get(ToolProvider::SearchSecondary)
            .expect("google available");
        assert_eq!(google.key, "goog-456");
        assert_eq!(google.aux_id.as_deref(), Some("cse-789"));
    }

    #[test]
    fn test_google_without_engine_id_is_unavailable() {
        let env = EnvSnapshot::from_pairs([
            ("GOOGLE_API_KEY", "goog-456"),
            ("TAVILY_API_KEY", "tvly-123"),
        ]);
        let registry = ToolRegistry::from_env(&env);

        assert!(!registry.available(ToolProvider::SearchSecondary));
        let err = registry.get(ToolProvider::SearchSecondary).unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(_)));
        assert!(err.to_string().contains("search-secondary"));

        // Failure of one provider never blocks another.
        assert!(registry.available(ToolProvider::SearchPrimary));
    }

    #[test]
    fn test_empty_env_has_no_providers() {
        let registry = ToolRegistry::from_env(&EnvSnapshot::default());
        for provider in ToolProvider::ALL {
            assert!(!registry.available(provider));
        }
        assert!(!registry.any_search_available());
    }

    #[test]
    fn test_any_search_available() {
        let env = EnvSnapshot::from_pairs([("TAVILY_API_KEY", "tvly-123")]);
        let registry = ToolRegistry::from_env(&env);
        assert!(registry.any_search_available());
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let env = EnvSnapshot::from_pairs([("TAVILY_API_KEY", "   ")]);
        let registry = ToolRegistry::from_env(&env);
        assert!(!registry.available(ToolProvider::SearchPrimary));
    }
}
