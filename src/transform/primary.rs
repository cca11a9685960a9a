//! Primary dependency resolution
//!
//! The primary dependency of a group is the first task of the most preferred
//! kind present in the group. It drives label derivation and attribute
//! inheritance.

use crate::error::{ExpansionError, ExpansionResult};
use crate::transform::Task;

/// Find the primary task of a group
pub fn resolve_primary<'a>(group: &[&'a Task], kinds: &[String]) -> Option<&'a Task> {
    kinds
        .iter()
        .find_map(|kind| group.iter().copied().find(|task| &task.kind == kind))
}

/// Find the primary task of a group, failing if no preferred kind is present
pub fn require_primary<'a>(
    template: &str,
    index: usize,
    group: &[&'a Task],
    kinds: &[String],
) -> ExpansionResult<&'a Task> {
    resolve_primary(group, kinds).ok_or_else(|| ExpansionError::NoPrimaryKind {
        template: template.to_string(),
        group: index,
        kinds: kinds.to_vec(),
    })
}
