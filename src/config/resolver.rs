//! Hierarchical resolution of per-role model configuration.
//!
//! A role's override block is adopted only if its three mandatory fields
//! (API key, base URL, model name) are all non-empty. An active block
//! overrides those three fields and defaults max tokens, temperature and
//! proxy field by field to the global values. An inactive block falls back
//! to the global configuration in full.

use std::time::Duration;

use crate::error::ConfigError;

use super::{EnvSnapshot, Role, RoleConfig};

/// Default per-call LLM timeout when `LLM_TIMEOUT` is unset (seconds).
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 180;

/// Resolves the global + per-role configuration cascade.
///
/// Built once at process start from an [`EnvSnapshot`]; every resolution is
/// a pure function of that snapshot, so the resolver is safe to share
/// read-only across concurrent agent runs.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env: EnvSnapshot,
}

impl ConfigResolver {
    /// Creates a resolver over an explicit environment snapshot.
    pub fn new(env: EnvSnapshot) -> Self {
        Self { env }
    }

    /// Creates a resolver over the current process environment.
    pub fn from_env() -> Self {
        Self::new(EnvSnapshot::from_process_env())
    }

    /// Resolves the configuration for one role.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when, after fallback, the key, base URL or
    /// model name is still empty, or when a numeric field fails to parse.
    /// Model name is held to the same standard as key and base URL: the
    /// three fields are mandatory together (the same all-three rule that
    /// activates an override block), so an empty global `MODEL_NAME` is
    /// `ConfigError::MissingModel` rather than a client built without a
    /// model.
    pub fn resolve(&self, role: Role) -> Result<RoleConfig, ConfigError> {
        let prefix = role.env_prefix();

        let override_key = self.env.get(&format!("{prefix}_API_KEY"));
        let override_base = self.env.get(&format!("{prefix}_API_BASE_URL"));
        let override_model = self.env.get(&format!("{prefix}_MODEL_NAME"));

        // Override block is active only with all three mandatory fields set.
        let (api_key, base_url, model, max_tokens, temperature, proxy) = match (
            override_key,
            override_base,
            override_model,
        ) {
            (Some(key), Some(base), Some(model)) => {
                let max_tokens = self
                    .parse_max_tokens(&format!("{prefix}_MAX_TOKENS"))?
                    .or(self.parse_max_tokens("MAX_TOKENS")?);
                let temperature = self
                    .parse_temperature(&format!("{prefix}_TEMPERATURE"))?
                    .or(self.parse_temperature("TEMPERATURE")?);
                let proxy = self
                    .env
                    .get(&format!("{prefix}_PROXY"))
                    .or(self.env.get("PROXY"));
                (
                    Some(key),
                    Some(base),
                    Some(model),
                    max_tokens,
                    temperature,
                    proxy,
                )
            }
            _ => (
                self.env.get("API_KEY"),
                self.env.get("API_BASE_URL"),
                self.env.get("MODEL_NAME"),
                self.parse_max_tokens("MAX_TOKENS")?,
                self.parse_temperature("TEMPERATURE")?,
                self.env.get("PROXY"),
            ),
        };

        let api_key = api_key
            .ok_or_else(|| ConfigError::MissingCredential(role.to_string()))?
            .to_string();
        let base_url = base_url
            .ok_or_else(|| ConfigError::MissingBaseUrl(role.to_string()))?
            .to_string();
        let model = model
            .ok_or_else(|| ConfigError::MissingModel(role.to_string()))?
            .to_string();

        Ok(RoleConfig {
            role,
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
            proxy: proxy.map(str::to_string),
        })
    }

    /// Resolves every role, failing fast on the first unusable one.
    pub fn resolve_all(&self) -> Result<Vec<RoleConfig>, ConfigError> {
        Role::ALL.iter().map(|role| self.resolve(*role)).collect()
    }

    /// Per-call LLM timeout from `LLM_TIMEOUT` (seconds), defaulting to 180.
    pub fn llm_timeout(&self) -> Result<Duration, ConfigError> {
        match self.env.get("LLM_TIMEOUT") {
            None => Ok(Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS)),
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "LLM_TIMEOUT".to_string(),
                    value: raw.to_string(),
                    reason: "must be a positive integer number of seconds".to_string(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_TIMEOUT".to_string(),
                        value: raw.to_string(),
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(Duration::from_secs(secs))
            }
        }
    }

    fn parse_max_tokens(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        let Some(raw) = self.env.get(key) else {
            return Ok(None);
        };
        let value: u32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "must be a positive integer".to_string(),
        })?;
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Some(value))
    }

    fn parse_temperature(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        let Some(raw) = self.env.get(key) else {
            return Ok(None);
        };
        let value: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "must be a float".to_string(),
        })?;
        if !(0.0..=2.0).contains(&value) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
        Ok(Some(value))
    }
}
