//! Model configuration for the four agent roles.
//!
//! Connection parameters come from process environment variables: one
//! global block (`API_KEY`, `API_BASE_URL`, `MODEL_NAME`, `MAX_TOKENS`,
//! `TEMPERATURE`, `PROXY`) and an optional role-prefixed block per role
//! (`PLAN_API_KEY`, `TOOL_MODEL_NAME`, ...). The environment is snapshotted
//! once at startup; resolution itself is a pure merge over that snapshot.

mod resolver;

pub use resolver::ConfigResolver;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four specialized LLM usages an agent run is built from.
///
/// Ordered by declaration so role-keyed maps iterate plan, act, tool,
/// vision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Produces and revises the plan for a task.
    Plan,
    /// Chooses the next concrete action given the plan and transcript.
    Act,
    /// Interprets tool output (search results, documents).
    Tool,
    /// Handles image and visual inputs.
    Vision,
}

impl Role {
    /// All roles, in the order they are constructed at startup.
    pub const ALL: [Role; 4] = [Role::Plan, Role::Act, Role::Tool, Role::Vision];

    /// Environment variable prefix for this role's override block.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Role::Plan => "PLAN",
            Role::Act => "ACT",
            Role::Tool => "TOOL",
            Role::Vision => "VISION",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Plan => write!(f, "plan"),
            Role::Act => write!(f, "act"),
            Role::Tool => write!(f, "tool"),
            Role::Vision => write!(f, "vision"),
        }
    }
}

/// Resolved LLM access parameters for one role.
///
/// Immutable once built; constructed only by [`ConfigResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoleConfig {
    /// Role this configuration belongs to.
    pub role: Role,
    /// API credential.
    pub api_key: String,
    /// Base endpoint URL for the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum number of tokens to generate, if limited.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 - 2.0), if set.
    pub temperature: Option<f64>,
    /// Proxy URL for outbound requests, if any.
    pub proxy: Option<String>,
}

/// An immutable snapshot of environment variables.
///
/// Values that are empty or whitespace-only are treated as absent, matching
/// the activation rule for role override blocks.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    pub fn from_process_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Builds a snapshot from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the trimmed value for `key`, or `None` if unset or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_and_prefix() {
        assert_eq!(Role::Plan.to_string(), "plan");
        assert_eq!(Role::Vision.to_string(), "vision");
        assert_eq!(Role::Act.env_prefix(), "ACT");
        assert_eq!(Role::Tool.env_prefix(), "TOOL");
    }

    #[test]
    fn test_role_ordering_follows_declaration() {
        let mut sorted = vec![Role::Vision, Role::Plan, Role::Tool, Role::Act];
        sorted.sort();
        assert_eq!(sorted, Role::ALL.to_vec());

        let by_role: std::collections::BTreeMap<Role, u8> =
            Role::ALL.iter().map(|r| (*r, 0)).collect();
        let keys: Vec<Role> = by_role.keys().copied().collect();
        assert_eq!(keys, Role::ALL.to_vec());
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&Role::Vision).expect("serialize role");
        assert_eq!(json, "\"vision\"");
        let role: Role = serde_json::from_str("\"plan\"").expect("deserialize role");
        assert_eq!(role, Role::Plan);
    }

    #[test]
    fn test_env_snapshot_blank_is_absent() {
        let env = EnvSnapshot::from_pairs([("A", "value"), ("B", "   "), ("C", "")]);
        assert_eq!(env.get("A"), Some("value"));
        assert_eq!(env.get("B"), None);
        assert_eq!(env.get("C"), None);
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_env_snapshot_trims_values() {
        let env = EnvSnapshot::from_pairs([("KEY", "  sk-123  ")]);
        assert_eq!(env.get("KEY"), Some("sk-123"));
    }
}
