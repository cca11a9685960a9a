//! Expansion context
//!
//! The context carries what the expansion of one kind needs: the kind being
//! produced, its declared kind dependencies and the group-by registry.

use crate::config::KindConfig;
use crate::transform::registry::{self, Registry};

/// Context shared by the expansion of every template of a kind
#[derive(Debug, Clone)]
pub struct Context<'r> {
    /// Kind of the produced tasks
    pub kind: String,

    /// Upstream kinds, in declared order
    pub kind_dependencies: Vec<String>,

    registry: &'r Registry,
}

/// View of the context handed to group-by strategies
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    /// Kind of the produced tasks
    pub kind: &'a str,

    /// Label of the template being expanded
    pub template: &'a str,

    /// Kind preference list of the template
    pub kinds: &'a [String],
}

impl Context<'static> {
    /// Create a context backed by the process-wide registry
    pub fn new(kind: impl Into<String>) -> Self {
        Context {
            kind: kind.into(),
            kind_dependencies: Vec::new(),
            registry: registry::global(),
        }
    }

    /// Create a context for a kind definition
    pub fn for_kind(config: &KindConfig) -> Self {
        Context::new(config.kind.clone()).with_kind_dependencies(config.kind_dependencies.clone())
    }
}

impl<'r> Context<'r> {
    /// Create a context backed by a specific registry
    pub fn using(kind: impl Into<String>, registry: &'r Registry) -> Self {
        Context {
            kind: kind.into(),
            kind_dependencies: Vec::new(),
            registry,
        }
    }

    /// Set the kind dependencies
    pub fn with_kind_dependencies(mut self, kind_dependencies: Vec<String>) -> Self {
        self.kind_dependencies = kind_dependencies;
        self
    }

    /// Use a specific registry instead of the process-wide one
    pub fn with_registry<'s>(self, registry: &'s Registry) -> Context<'s> {
        Context {
            kind: self.kind,
            kind_dependencies: self.kind_dependencies,
            registry,
        }
    }

    /// Get the registry strategies are resolved from
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Build the view handed to strategies for one template
    pub fn group_context<'a>(&'a self, template: &'a str, kinds: &'a [String]) -> GroupContext<'a> {
        GroupContext {
            kind: &self.kind,
            template,
            kinds,
        }
    }
}
