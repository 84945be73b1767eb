//! Handler registry keyed by [`ToolKind`].
//!
//! Startup validation guarantees every catalog entry has a handler, so an
//! "unknown tool" at runtime can only mean the model asked for a name that
//! is not in the catalog.

use std::collections::HashMap;

use loopclaw_core::tool::Tool;
use loopclaw_security::PathValidationError;

use crate::catalog;
use crate::kind::ToolKind;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler '{0}' does not match any catalog entry")]
    UnknownHandler(String),

    #[error("handler for '{0}' registered twice")]
    DuplicateHandler(&'static str),

    #[error("catalog entries without a handler: {}", .0.join(", "))]
    MissingHandlers(Vec<&'static str>),

    #[error("catalog entry for '{kind}' is named '{found}'")]
    CatalogMismatch { kind: &'static str, found: String },

    #[error("workspace unavailable: {0}")]
    Workspace(#[from] PathValidationError),

    #[error("tool setup failed: {0}")]
    Setup(String),
}

/// A registry of tool handlers.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the kind its name maps to.
    pub fn register(&mut self, handler: Box<dyn Tool>) -> Result<(), RegistryError> {
        let kind = ToolKind::from_name(handler.name())
            .ok_or_else(|| RegistryError::UnknownHandler(handler.name().to_string()))?;
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::DuplicateHandler(kind.name()));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, handler: Box<dyn Tool>) -> Result<Self, RegistryError> {
        self.register(handler)?;
        Ok(self)
    }

    /// Get the handler for a kind.
    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Check the registry against the catalog.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for kind in ToolKind::ALL {
            let entry = catalog::spec(kind);
            if entry.name != kind.name() {
                return Err(RegistryError::CatalogMismatch {
                    kind: kind.name(),
                    found: entry.name.clone(),
                });
            }
        }

        let missing: Vec<_> = ToolKind::ALL
            .into_iter()
            .filter(|k| !self.handlers.contains_key(k))
            .map(ToolKind::name)
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingHandlers(missing));
        }
        Ok(())
    }
}
