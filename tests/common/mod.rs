//! Common test utilities

#![allow(dead_code)]

use fromdeps::config::{parse_kind, parse_tasks, KindConfig};
use fromdeps::Task;

/// Upstream pool used by the platform scenarios
pub const PLATFORM_POOL: &str = r#"
- kind: build
  label: build-linux
  attributes:
    platform: linux
    shippable: true
- kind: signing
  label: signing-linux
  attributes:
    platform: linux
- kind: publish
  label: publish-linux
  attributes:
    platform: linux
- kind: build
  label: build-mac
  attributes:
    platform: mac
    shippable: false
- kind: signing
  label: signing-mac
  attributes:
    platform: mac
- kind: publish
  label: publish-mac
  attributes:
    platform: mac
"#;

/// Parse an upstream pool from YAML
pub fn pool(yaml: &str) -> Vec<Task> {
    parse_tasks(yaml).unwrap()
}

/// Keep only the tasks of the given kinds, preserving order
pub fn pool_of_kinds(yaml: &str, kinds: &[&str]) -> Vec<Task> {
    pool(yaml)
        .into_iter()
        .filter(|t| kinds.contains(&t.kind.as_str()))
        .collect()
}

/// Parse a kind definition from YAML
pub fn kind(yaml: &str) -> KindConfig {
    parse_kind(yaml).unwrap()
}

/// Labels of a list of tasks
pub fn labels(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.label.as_str()).collect()
}
