//! External tool providers: web search engines and browser automation.
//!
//! Credentials are collected once at startup into a [`ToolRegistry`] and
//! validated lazily: a provider with missing fields is simply unavailable,
//! and the agent degrades that capability instead of failing the run.

mod registry;
mod search;

pub use registry::{ToolCredential, ToolProvider, ToolRegistry};
pub use search::{build_search_clients, GoogleSearch, SearchClient, SearchHit, TavilySearch};
