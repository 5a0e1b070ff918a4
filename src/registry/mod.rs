//! Handler registry.
//!
//! Maps `(task_type, resource_type)` pairs to step handler instances. The
//! registry is the only extension point for new resource kinds: binding a
//! handler is additive and never touches dispatch logic.

use crate::constants::TaskType;
use crate::error::{Result, StratusError};
use crate::handlers::StepHandler;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lookup key binding a handler to one operation on one resource kind.
///
/// Attach/detach bindings use composite `"{child}-{parent}"` resource tags,
/// which keeps pair-specific handlers out of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub task_type: TaskType,
    pub resource_type: String,
}

impl HandlerKey {
    pub fn new(task_type: TaskType, resource_type: impl Into<String>) -> Self {
        Self {
            task_type,
            resource_type: resource_type.into(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task_type, self.resource_type)
    }
}

/// Concurrent handler table shared by every dispatcher worker.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<HandlerKey, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler; re-binding an existing key replaces the handler.
    pub fn register(
        &self,
        task_type: TaskType,
        resource_type: impl Into<String>,
        handler: Arc<dyn StepHandler>,
    ) {
        let key = HandlerKey::new(task_type, resource_type);
        debug!(%key, "registering step handler");
        self.handlers.insert(key, handler);
    }

    /// Resolve the handler for a node's binding.
    pub fn resolve(&self, task_type: TaskType, resource_type: &str) -> Result<Arc<dyn StepHandler>> {
        let key = HandlerKey::new(task_type, resource_type);
        self.handlers
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StratusError::HandlerNotFound {
                task_type,
                resource_type: resource_type.to_string(),
            })
    }

    pub fn contains(&self, task_type: TaskType, resource_type: &str) -> bool {
        self.handlers
            .contains_key(&HandlerKey::new(task_type, resource_type))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
