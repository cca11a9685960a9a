//! Grouping of candidate tasks
//!
//! This module dispatches a group-by spec to its registered strategy and
//! provides the built-in strategies.

use crate::config::{EmptyGroupPolicy, GroupBySpec, Schema};
use crate::error::{ExpansionError, ExpansionResult};
use crate::transform::context::GroupContext;
use crate::transform::registry::Registry;
use crate::transform::Task;
use serde_yaml::Value;
use tracing::debug;

/// An ordered set of upstream tasks expanded into one task
pub type Group<'a> = Vec<&'a Task>;

/// One group per candidate
pub const SINGLE: &str = "single";

/// One group per distinct value of an attribute
pub const ATTRIBUTE: &str = "attribute";

/// A single group holding every candidate
pub const ALL: &str = "all";

/// Install the built-in strategies into a registry
pub(crate) fn register_builtins(registry: &mut Registry) {
    // Fresh registry and distinct names, registration cannot fail.
    let _ = registry.register(SINGLE, group_by_single, None);
    let _ = registry.register(ALL, group_by_all, None);
    let _ = registry.register(ATTRIBUTE, group_by_attribute, Some(Schema::String));
}

/// Group candidates with the strategy named by `spec`
///
/// The context value is validated against the strategy's schema before the
/// strategy runs. Empty groups are handled according to `policy`.
pub fn group<'a>(
    ctx: &GroupContext<'_>,
    registry: &Registry,
    candidates: &[&'a Task],
    spec: &GroupBySpec,
    policy: EmptyGroupPolicy,
) -> ExpansionResult<Vec<Group<'a>>> {
    let strategy = registry
        .resolve(&spec.name)
        .map_err(|_| ExpansionError::UnknownStrategy {
            template: ctx.template.to_string(),
            strategy: spec.name.clone(),
        })?;

    validate_context(ctx, &spec.name, strategy.schema(), spec.context.as_ref())?;

    let groups = strategy.call(ctx, candidates, spec.context.as_ref())?;

    let mut kept = Vec::with_capacity(groups.len());
    for (index, group) in groups.into_iter().enumerate() {
        if !group.is_empty() {
            kept.push(group);
            continue;
        }
        match policy {
            EmptyGroupPolicy::Drop => {
                debug!(
                    template = ctx.template,
                    strategy = %spec.name,
                    group = index,
                    "dropping empty group"
                );
            }
            EmptyGroupPolicy::Error => {
                return Err(ExpansionError::EmptyGroup {
                    template: ctx.template.to_string(),
                    strategy: spec.name.clone(),
                    group: index,
                });
            }
        }
    }

    debug!(
        template = ctx.template,
        strategy = %spec.name,
        candidates = candidates.len(),
        groups = kept.len(),
        "grouped candidates"
    );
    Ok(kept)
}

/// Check a context value against a strategy's schema
///
/// A strategy without a schema receives the context value unchecked.
fn validate_context(
    ctx: &GroupContext<'_>,
    strategy: &str,
    schema: Option<&Schema>,
    context: Option<&Value>,
) -> ExpansionResult<()> {
    let Some(schema) = schema else {
        return Ok(());
    };
    if schema.validate(context.unwrap_or(&Value::Null)) {
        return Ok(());
    }

    Err(ExpansionError::SchemaValidation {
        template: ctx.template.to_string(),
        strategy: strategy.to_string(),
        value: context
            .map(render_value)
            .unwrap_or_else(|| "null".to_string()),
        schema: schema.to_string(),
    })
}

/// Render a YAML value on one line for error messages
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Null => "null".to_string(),
        other => render_yaml(other),
    }
}

fn render_yaml(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(rendered) => rendered.trim_end().replace('\n', " "),
        Err(_) => format!("{:?}", value),
    }
}

fn group_by_single<'a>(
    _ctx: &GroupContext<'_>,
    candidates: &[&'a Task],
    _context: Option<&Value>,
) -> ExpansionResult<Vec<Group<'a>>> {
    Ok(candidates.iter().map(|task| vec![*task]).collect())
}

fn group_by_all<'a>(
    _ctx: &GroupContext<'_>,
    candidates: &[&'a Task],
    _context: Option<&Value>,
) -> ExpansionResult<Vec<Group<'a>>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![candidates.to_vec()])
}

fn group_by_attribute<'a>(
    ctx: &GroupContext<'_>,
    candidates: &[&'a Task],
    context: Option<&Value>,
) -> ExpansionResult<Vec<Group<'a>>> {
    let Some(attribute) = context.and_then(Value::as_str) else {
        return Err(ExpansionError::SchemaValidation {
            template: ctx.template.to_string(),
            strategy: ATTRIBUTE.to_string(),
            value: context.map(render_value).unwrap_or_else(|| "null".to_string()),
            schema: Schema::String.to_string(),
        });
    };

    // Groups keep the order in which their value first appears.
    let mut groups: Vec<(&'a Value, Group<'a>)> = Vec::new();
    for &task in candidates {
        let Some(value) = task.attributes.get(attribute).filter(|v| !v.is_null()) else {
            continue;
        };
        match groups.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, group)) => group.push(task),
            None => groups.push((value, vec![task])),
        }
    }

    Ok(groups.into_iter().map(|(_, group)| group).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform_pool() -> Vec<Task> {
        vec![
            Task::new("build", "build-linux").with_attribute("platform", "linux"),
            Task::new("signing", "signing-linux").with_attribute("platform", "linux"),
            Task::new("build", "build-mac").with_attribute("platform", "mac"),
            Task::new("build", "build-docs"),
            Task::new("signing", "signing-mac").with_attribute("platform", "mac"),
        ]
    }

    fn labels<'a>(groups: &[Group<'a>]) -> Vec<Vec<&'a str>> {
        groups
            .iter()
            .map(|g| g.iter().map(|t| t.label.as_str()).collect())
            .collect()
    }

    fn kinds() -> Vec<String> {
        vec!["build".to_string(), "signing".to_string()]
    }

    fn ctx<'a>(kinds: &'a [String]) -> GroupContext<'a> {
        GroupContext {
            kind: "bundle",
            template: "bundle",
            kinds,
        }
    }

    #[test]
    fn test_single_yields_one_group_per_candidate() {
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();
        let groups = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &refs,
            &GroupBySpec::named(SINGLE),
            EmptyGroupPolicy::Drop,
        )
        .unwrap();

        assert_eq!(groups.len(), pool.len());
        for (group, task) in groups.iter().zip(&pool) {
            assert_eq!(group.len(), 1);
            assert_eq!(group[0].label, task.label);
        }
    }

    #[test]
    fn test_attribute_groups_by_first_appearance() {
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();
        let groups = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &refs,
            &GroupBySpec::with_context(ATTRIBUTE, "platform"),
            EmptyGroupPolicy::Drop,
        )
        .unwrap();

        assert_eq!(
            labels(&groups),
            vec![
                vec!["build-linux", "signing-linux"],
                vec!["build-mac", "signing-mac"],
            ]
        );
    }

    #[test]
    fn test_attribute_excludes_null_values() {
        let pool = vec![
            Task::new("build", "build-a").with_attribute("locale", Value::Null),
            Task::new("build", "build-b").with_attribute("locale", "de"),
        ];
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();
        let groups = group_by_attribute(&ctx(&kinds), &refs, Some(&Value::from("locale"))).unwrap();
        assert_eq!(labels(&groups), vec![vec!["build-b"]]);
    }

    #[test]
    fn test_all_groups_everything() {
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();
        let groups = group_by_all(&ctx(&kinds), &refs, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), pool.len());

        assert!(group_by_all(&ctx(&kinds), &[], None).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_requires_string_context() {
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();
        let result = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &refs,
            &GroupBySpec::with_context(ATTRIBUTE, 3),
            EmptyGroupPolicy::Drop,
        );
        match result {
            Err(ExpansionError::SchemaValidation { value, schema, .. }) => {
                assert_eq!(value, "3");
                assert_eq!(schema, "string");
            }
            other => panic!("expected schema validation error, got {:?}", other),
        }

        let missing = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &refs,
            &GroupBySpec::named(ATTRIBUTE),
            EmptyGroupPolicy::Drop,
        );
        assert!(matches!(
            missing,
            Err(ExpansionError::SchemaValidation { .. })
        ));
    }

    fn echo_context<'a>(
        _ctx: &GroupContext<'_>,
        candidates: &[&'a Task],
        context: Option<&Value>,
    ) -> ExpansionResult<Vec<Group<'a>>> {
        let wanted = context.and_then(Value::as_str).unwrap_or_default();
        Ok(vec![candidates
            .iter()
            .copied()
            .filter(|t| t.label.ends_with(wanted))
            .collect()])
    }

    #[test]
    fn test_schemaless_strategy_receives_context_unchecked() {
        let mut registry = Registry::new();
        registry.register("by-suffix", echo_context, None).unwrap();
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();

        let groups = group(
            &ctx(&kinds),
            &registry,
            &refs,
            &GroupBySpec::with_context("by-suffix", "mac"),
            EmptyGroupPolicy::Drop,
        )
        .unwrap();
        assert_eq!(labels(&groups), vec![vec!["build-mac", "signing-mac"]]);

        // Built-ins without a schema ignore a stray value.
        let single = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &refs,
            &GroupBySpec::with_context(SINGLE, "platform"),
            EmptyGroupPolicy::Drop,
        )
        .unwrap();
        assert_eq!(single.len(), pool.len());
    }

    #[test]
    fn test_unknown_strategy() {
        let kinds = kinds();
        let result = group(
            &ctx(&kinds),
            &Registry::with_builtins(),
            &[],
            &GroupBySpec::named("by-locale"),
            EmptyGroupPolicy::Drop,
        );
        assert_eq!(
            result.unwrap_err(),
            ExpansionError::UnknownStrategy {
                template: "bundle".to_string(),
                strategy: "by-locale".to_string(),
            }
        );
    }

    fn with_empty<'a>(
        _ctx: &GroupContext<'_>,
        candidates: &[&'a Task],
        _context: Option<&Value>,
    ) -> ExpansionResult<Vec<Group<'a>>> {
        Ok(vec![Vec::new(), candidates.to_vec(), Vec::new()])
    }

    #[test]
    fn test_empty_groups_dropped_by_default() {
        let mut registry = Registry::new();
        registry.register("sparse", with_empty, None).unwrap();
        let pool = platform_pool();
        let refs: Vec<&Task> = pool.iter().collect();
        let kinds = kinds();

        let groups = group(
            &ctx(&kinds),
            &registry,
            &refs,
            &GroupBySpec::named("sparse"),
            EmptyGroupPolicy::Drop,
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), pool.len());
    }

    #[test]
    fn test_empty_group_error_policy() {
        let mut registry = Registry::new();
        registry.register("sparse", with_empty, None).unwrap();
        let kinds = kinds();

        let result = group(
            &ctx(&kinds),
            &registry,
            &[],
            &GroupBySpec::named("sparse"),
            EmptyGroupPolicy::Error,
        );
        assert_eq!(
            result.unwrap_err(),
            ExpansionError::EmptyGroup {
                template: "bundle".to_string(),
                strategy: "sparse".to_string(),
                group: 0,
            }
        );
    }
}
