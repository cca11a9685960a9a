//! Attribute matching
//!
//! A filter matches when every entry matches; a missing attribute never does.

use crate::config::{AttributeFilter, AttributeMatch, Attributes};
use crate::transform::Task;
use serde_yaml::Value;

impl AttributeMatch {
    /// Check a single attribute value
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            AttributeMatch::Exact(expected) => expected == value,
            AttributeMatch::OneOf(choices) => choices.iter().any(|c| c == value),
        }
    }
}

/// Check a task against a filter
pub fn matches(task: &Task, filter: &AttributeFilter) -> bool {
    matches_attributes(&task.attributes, filter)
}

/// Check an attribute map against a filter
pub fn matches_attributes(attributes: &Attributes, filter: &AttributeFilter) -> bool {
    filter.iter().all(|(key, expected)| {
        attributes
            .get(key)
            .map(|value| expected.accepts(value))
            .unwrap_or(false)
    })
}

/// Keep the tasks matching a filter, in order
pub fn filter_tasks<'a, I>(tasks: I, filter: &AttributeFilter) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks.into_iter().filter(|task| matches(task, filter)).collect()
}
