//! One chat model per agent role.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigResolver, Role};
use crate::error::LlmError;

use super::chat::{ChatClient, ChatModel};

/// The four role-bound chat models an agent run needs.
///
/// Built once at startup by resolving every role through the configuration
/// cascade; immutable and shared read-only across concurrent agent runs.
#[derive(Clone)]
pub struct RoleModels {
    models: HashMap<Role, Arc<dyn ChatModel>>,
}

impl std::fmt::Debug for RoleModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for role in Role::ALL {
            if let Some(model) = self.models.get(&role) {
                map.entry(&role, &model.model());
            }
        }
        map.finish()
    }
}

impl RoleModels {
    /// Resolves and constructs a client for every role.
    ///
    /// # Errors
    ///
    /// Fails with the underlying `ConfigError` when any role ends up
    /// without a usable credential — a run never starts partially
    /// configured.
    pub fn from_resolver(resolver: &ConfigResolver) -> Result<Self, LlmError> {
        let timeout = resolver.llm_timeout()?;
        let mut models: HashMap<Role, Arc<dyn ChatModel>> = HashMap::new();

        for role in Role::ALL {
            let config = resolver.resolve(role)?;
            tracing::info!(
                role = %role,
                model = %config.model,
                base_url = %config.base_url,
                "Resolved role model"
            );
            let client = ChatClient::from_role_config(&config, timeout)?;
            models.insert(role, Arc::new(client));
        }

        Ok(Self { models })
    }

    /// Builds the set from explicit models; used by tests to inject mocks.
    pub fn from_models(models: HashMap<Role, Arc<dyn ChatModel>>) -> Self {
        Self { models }
    }

    /// Returns the model for `role`.
    ///
    /// Construction guarantees every role is present.
    pub fn get(&self, role: Role) -> Arc<dyn ChatModel> {
        Arc::clone(
            self.models
                .get(&role)
                .unwrap_or_else(|| panic!("model for role '{role}' missing after construction")),
        )
    }
}
