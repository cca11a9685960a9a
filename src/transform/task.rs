//! Task representation
//!
//! Upstream tasks come in as `Task` values and expanded tasks go out as
//! `Task` values. Nothing in this crate mutates a task it did not create.

use crate::config::Attributes;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Attribute recording the kind of the primary dependency of a task
pub const PRIMARY_KIND_DEPENDENCY: &str = "primary-kind-dependency";

/// A concrete task
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Task {
    /// Kind the task was generated from
    pub kind: String,

    /// Unique name of the task
    pub label: String,

    /// Attributes of the task
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,

    /// Dependency edges, edge name to upstream label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Task definition, opaque to the expansion
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub payload: Mapping,
}

impl Task {
    /// Create a task with no attributes, dependencies or payload
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Task {
            kind: kind.into(),
            label: label.into(),
            attributes: Attributes::new(),
            dependencies: BTreeMap::new(),
            payload: Mapping::new(),
        }
    }

    /// Set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Kind of the primary dependency, for tasks produced by an expansion
    pub fn primary_kind_dependency(&self) -> Option<&str> {
        self.attribute(PRIMARY_KIND_DEPENDENCY).and_then(Value::as_str)
    }

    /// Labels of the upstream tasks this task depends on
    pub fn dependency_labels(&self) -> Vec<&str> {
        self.dependencies.values().map(String::as_str).collect()
    }
}
