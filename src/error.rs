//! Error types for cosight-bench operations.
//!
//! Defines error types for the major subsystems:
//! - Model configuration resolution (global + per-role cascade)
//! - Tool provider credentials and availability
//! - LLM API interactions
//! - The agent loop (replan caps, budgets, action parsing)
//! - Result persistence

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while resolving model configuration.
///
/// All of these are fatal at startup: a run never begins with a role that
/// has no usable credential.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key configured for role '{0}' after global fallback")]
    MissingCredential(String),

    #[error("No API base URL configured for role '{0}' after global fallback")]
    MissingBaseUrl(String),

    #[error("No model name configured for role '{0}' after global fallback")]
    MissingModel(String),

    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors that can occur when accessing tool providers.
///
/// An unavailable provider degrades that capability only; it never blocks
/// other providers or aborts the run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool provider '{0}' is not available: required credentials missing")]
    Unavailable(String),

    #[error("Tool request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse tool response: {0}")]
    ParseError(String),

    #[error("Tool API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LlmError {
    /// Returns true if retrying this request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RequestFailed(_) | LlmError::RateLimited(_) => true,
            LlmError::ApiError { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

/// Errors that terminate a single agent run.
///
/// These are contained by the harness and recorded as a task status; they
/// never abort the batch.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Replan limit exceeded: {limit} replans without a final answer")]
    PlanLoopExceeded { limit: u32 },

    #[error("Step limit exceeded: {limit} actions without a final answer")]
    StepLimitExceeded { limit: u32 },

    #[error("Wall-clock budget of {0:?} exceeded")]
    BudgetExceeded(Duration),

    #[error("Malformed action from act model: {0}")]
    MalformedAction(String),
}

impl AgentError {
    /// Returns true if this failure is a timeout rather than an agent fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::BudgetExceeded(_))
    }
}

/// Errors that can occur while persisting run artifacts.
///
/// Persistence failures are surfaced to the operator, never swallowed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Destination '{0}' is not writable")]
    NotWritable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed task record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingCredential("plan".to_string());
        assert!(err.to_string().contains("plan"));

        let err = ConfigError::InvalidValue {
            key: "MAX_TOKENS".to_string(),
            value: "abc".to_string(),
            reason: "not an integer".to_string(),
        };
        assert!(err.to_string().contains("MAX_TOKENS"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_llm_error_is_transient() {
        assert!(LlmError::RequestFailed("reset".to_string()).is_transient());
        assert!(LlmError::RateLimited("slow down".to_string()).is_transient());
        assert!(LlmError::ApiError {
            code: 503,
            message: "overloaded".to_string()
        }
        .is_transient());
        assert!(!LlmError::ApiError {
            code: 401,
            message: "bad key".to_string()
        }
        .is_transient());
        assert!(!LlmError::ParseError("garbage".to_string()).is_transient());
    }

    #[test]
    fn test_agent_error_is_timeout() {
        assert!(AgentError::BudgetExceeded(Duration::from_secs(60)).is_timeout());
        assert!(!AgentError::PlanLoopExceeded { limit: 3 }.is_timeout());
    }
}
