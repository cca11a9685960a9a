//! Configuration validation
//!
//! This module validates kind definitions and declares the schemas that
//! group-by context values are checked against.

use crate::config::types::{FromDeps, KindConfig};
use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::fmt;

/// Validate a complete kind definition
pub fn validate_kind(config: &KindConfig) -> ConfigResult<()> {
    for (label, template) in &config.tasks {
        if let Some(from_deps) = &template.from_deps {
            if config.kind_dependencies.is_empty() {
                return Err(ConfigError::MissingKindDependencies {
                    kind: config.kind.clone(),
                });
            }
            resolve_kinds(label, from_deps, &config.kind_dependencies)?;
        }
    }

    Ok(())
}

/// Resolve the kind preference list of a template
///
/// The explicit `kinds` override wins over the declared kind dependencies.
/// Every listed kind must be a declared kind dependency.
pub fn resolve_kinds(
    template: &str,
    from_deps: &FromDeps,
    kind_dependencies: &[String],
) -> ConfigResult<Vec<String>> {
    let kinds = match &from_deps.kinds {
        Some(kinds) => kinds.clone(),
        None => kind_dependencies.to_vec(),
    };

    if kinds.is_empty() {
        return Err(ConfigError::EmptyKinds {
            template: template.to_string(),
        });
    }

    let unknown: Vec<String> = kinds
        .iter()
        .filter(|kind| !kind_dependencies.contains(*kind))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ConfigError::UnknownKinds {
            template: template.to_string(),
            kinds: unknown,
        });
    }

    Ok(kinds)
}

/// Shape a group-by context value must have
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Anything, including no value
    Any,

    /// A string
    String,

    /// An integer
    Integer,

    /// A boolean
    Bool,

    /// One of the listed strings
    OneOf(Vec<String>),

    /// A sequence whose items all match
    Sequence(Box<Schema>),

    /// A mapping with string keys whose values all match
    Mapping(Box<Schema>),

    /// A mapping with exactly these required keys
    Record(Vec<(String, Schema)>),
}

impl Schema {
    /// Check a value against this schema
    pub fn validate(&self, value: &Value) -> bool {
        match self {
            Schema::Any => true,
            Schema::String => value.is_string(),
            Schema::Integer => value.is_i64() || value.is_u64(),
            Schema::Bool => value.is_bool(),
            Schema::OneOf(choices) => value
                .as_str()
                .map(|s| choices.iter().any(|c| c == s))
                .unwrap_or(false),
            Schema::Sequence(item) => value
                .as_sequence()
                .map(|seq| seq.iter().all(|v| item.validate(v)))
                .unwrap_or(false),
            Schema::Mapping(item) => value
                .as_mapping()
                .map(|map| map.iter().all(|(k, v)| k.is_string() && item.validate(v)))
                .unwrap_or(false),
            Schema::Record(fields) => {
                let Some(map) = value.as_mapping() else {
                    return false;
                };
                map.len() == fields.len()
                    && fields.iter().all(|(name, schema)| {
                        map.get(name.as_str())
                            .map(|v| schema.validate(v))
                            .unwrap_or(false)
                    })
            }
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Any => write!(f, "any"),
            Schema::String => write!(f, "string"),
            Schema::Integer => write!(f, "integer"),
            Schema::Bool => write!(f, "bool"),
            Schema::OneOf(choices) => write!(f, "one of [{}]", choices.join(", ")),
            Schema::Sequence(item) => write!(f, "[{}]", item),
            Schema::Mapping(item) => write!(f, "{{string: {}}}", item),
            Schema::Record(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(name, schema)| format!("{}: {}", name, schema))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}
