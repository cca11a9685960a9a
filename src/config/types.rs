//! Core configuration types
//!
//! This module defines the data structures that represent a kind definition:
//! its kind dependencies, its task templates and their `from-deps` blocks.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Task attributes, keyed by attribute name
pub type Attributes = BTreeMap<String, Value>;

/// Attribute filter used by `with-attributes`
pub type AttributeFilter = BTreeMap<String, AttributeMatch>;

/// Name of the strategy used when `group-by` is absent
pub const DEFAULT_GROUP_BY: &str = "single";

/// Top-level kind definition
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KindConfig {
    /// Name of the kind whose tasks are produced
    pub kind: String,

    /// Upstream kinds, in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kind_dependencies: Vec<String>,

    /// Task templates, keyed by template label
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskTemplate>,
}

/// A task template
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TaskTemplate {
    /// Attributes every produced task starts from
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,

    /// Dependencies declared directly on the template
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Expansion over upstream tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_deps: Option<FromDeps>,

    /// Everything else, carried opaquely onto produced tasks
    #[serde(flatten)]
    pub payload: Mapping,
}

/// The `from-deps` block of a template
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FromDeps {
    /// Kind preference list; defaults to the kind dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<String>>,

    /// Only upstream tasks matching every entry are considered
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with_attributes: AttributeFilter,

    /// Grouping strategy and its context value
    #[serde(
        default,
        deserialize_with = "deserialize_group_by",
        serialize_with = "serialize_group_by"
    )]
    pub group_by: GroupBySpec,

    /// Inherit non-conflicting attributes from the primary dependency
    #[serde(default)]
    pub copy_attributes: bool,

    /// Allow at most one task per kind in a group
    #[serde(default = "default_unique_kinds")]
    pub unique_kinds: bool,

    /// How the label discriminator is derived from the primary dependency
    #[serde(
        default,
        deserialize_with = "deserialize_set_name",
        serialize_with = "serialize_set_name"
    )]
    pub set_name: SetName,

    /// Produce nothing instead of failing when no upstream task matches
    #[serde(default)]
    pub allow_empty: bool,

    /// What to do with empty groups returned by a strategy
    #[serde(default)]
    pub on_empty_group: EmptyGroupPolicy,
}

impl Default for FromDeps {
    fn default() -> Self {
        FromDeps {
            kinds: None,
            with_attributes: AttributeFilter::new(),
            group_by: GroupBySpec::default(),
            copy_attributes: false,
            unique_kinds: default_unique_kinds(),
            set_name: SetName::default(),
            allow_empty: false,
            on_empty_group: EmptyGroupPolicy::default(),
        }
    }
}

fn default_unique_kinds() -> bool {
    true
}

/// Expected value of a single `with-attributes` entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeMatch {
    /// Any of the listed values
    OneOf(Vec<Value>),

    /// Exactly this value
    Exact(Value),
}

/// A strategy name with an optional context value
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBySpec {
    /// Registered strategy name
    pub name: String,

    /// Value validated against the strategy's schema
    pub context: Option<Value>,
}

impl GroupBySpec {
    /// Strategy without a context value
    pub fn named(name: impl Into<String>) -> Self {
        GroupBySpec {
            name: name.into(),
            context: None,
        }
    }

    /// Strategy with a context value
    pub fn with_context(name: impl Into<String>, context: impl Into<Value>) -> Self {
        GroupBySpec {
            name: name.into(),
            context: Some(context.into()),
        }
    }
}

impl Default for GroupBySpec {
    fn default() -> Self {
        GroupBySpec::named(DEFAULT_GROUP_BY)
    }
}

/// Label discriminator policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetName {
    /// Primary label with a leading `<primary-kind>-` removed
    #[default]
    StripKind,

    /// Primary label as is
    RetainKind,

    /// No discriminator, the template label alone
    Disabled,
}

/// Policy for empty groups returned by a strategy
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyGroupPolicy {
    /// Silently drop the group
    #[default]
    Drop,

    /// Fail the template's expansion
    Error,
}

/// Custom deserializer for `group-by`, either a name or a single-key mapping
fn deserialize_group_by<'de, D>(deserializer: D) -> Result<GroupBySpec, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(name) => Ok(GroupBySpec::named(name)),
        Value::Mapping(map) => {
            if map.len() != 1 {
                return Err(D::Error::custom(format!(
                    "group-by mapping must have exactly one key, found {}",
                    map.len()
                )));
            }
            let Some((key, context)) = map.into_iter().next() else {
                return Err(D::Error::custom("group-by mapping is empty"));
            };
            match key {
                Value::String(name) => Ok(GroupBySpec {
                    name,
                    context: Some(context),
                }),
                _ => Err(D::Error::custom("group-by strategy name must be a string")),
            }
        }
        Value::Null => Ok(GroupBySpec::default()),
        _ => Err(D::Error::custom("group-by must be a string or a mapping")),
    }
}

fn serialize_group_by<S>(spec: &GroupBySpec, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match &spec.context {
        None => serializer.serialize_str(&spec.name),
        Some(context) => {
            let mut map = Mapping::new();
            map.insert(Value::String(spec.name.clone()), context.clone());
            map.serialize(serializer)
        }
    }
}

/// Custom deserializer for `set-name`, a policy name or `false`
fn deserialize_set_name<'de, D>(deserializer: D) -> Result<SetName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Bool(false) => Ok(SetName::Disabled),
        Value::Null => Ok(SetName::default()),
        Value::String(name) => match name.as_str() {
            "strip-kind" => Ok(SetName::StripKind),
            "retain-kind" => Ok(SetName::RetainKind),
            other => Err(D::Error::custom(format!(
                "unknown set-name '{}', expected strip-kind, retain-kind or false",
                other
            ))),
        },
        _ => Err(D::Error::custom("set-name must be a string or false")),
    }
}

fn serialize_set_name<S>(set_name: &SetName, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match set_name {
        SetName::StripKind => serializer.serialize_str("strip-kind"),
        SetName::RetainKind => serializer.serialize_str("retain-kind"),
        SetName::Disabled => serializer.serialize_bool(false),
    }
}
