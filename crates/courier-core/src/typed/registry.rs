//! HandlerRegistry - 名前から Handler への対応表
//!
//! Built mutably during start-up, then shared read-only behind an `Arc`
//! by every worker. Lookups take `&self` only, so concurrent readers need no lock.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{Handler, IntoHandler};

/// # 使用例
/// ```ignore
/// let mut registry = HandlerRegistry::new();
/// registry.register("add", |a: i64, b: i64| -> Result<i64, String> { Ok(a + b) })?;
/// let registry = Arc::new(registry);
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for task '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a closure or function under `name`.
    pub fn register<Args, H: IntoHandler<Args>>(
        &mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_handler(name, handler.into_handler())
    }

    /// Register an already type-erased handler.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
