//! Configuration parsing
//!
//! Turns YAML text or already-parsed YAML values into kind definitions and
//! upstream task lists. Locating and reading files is left to the caller.

use crate::config::schema::validate_kind;
use crate::config::types::KindConfig;
use crate::error::{ConfigError, Error};
use crate::transform::Task;
use serde_yaml::Value;
use std::collections::HashSet;

/// Parse and validate a kind definition from a YAML string
pub fn parse_kind(yaml: &str) -> Result<KindConfig, Error> {
    let config: KindConfig = serde_yaml::from_str(yaml)?;
    validate_kind(&config)?;
    Ok(config)
}

/// Parse and validate a kind definition from a YAML value
pub fn kind_from_value(value: Value) -> Result<KindConfig, Error> {
    let config: KindConfig = serde_yaml::from_value(value)?;
    validate_kind(&config)?;
    Ok(config)
}

/// Parse an upstream task list from a YAML string
pub fn parse_tasks(yaml: &str) -> Result<Vec<Task>, Error> {
    let tasks: Vec<Task> = serde_yaml::from_str(yaml)?;
    check_unique_labels(&tasks)?;
    Ok(tasks)
}

/// Parse an upstream task list from a YAML value
pub fn tasks_from_value(value: Value) -> Result<Vec<Task>, Error> {
    let tasks: Vec<Task> = serde_yaml::from_value(value)?;
    check_unique_labels(&tasks)?;
    Ok(tasks)
}

/// Labels identify tasks, so an upstream list must not repeat one
fn check_unique_labels(tasks: &[Task]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.label.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Duplicate upstream task label: {}",
                task.label
            )));
        }
    }
    Ok(())
}
