//! cosight-bench: Multi-role LLM agent benchmark harness.
//!
//! This library drives a plan/act/tool/vision agent over GAIA-style task
//! sets, scores the answers, and persists run artifacts.

// Core modules
pub mod agent;
pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod results;
pub mod tools;

// Re-export commonly used error types
pub use error::{AgentError, ConfigError, LlmError, PersistenceError, ToolError};
