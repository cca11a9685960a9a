//! Template expansion
//!
//! Expanding a template filters the upstream pool down to candidates, groups
//! them and produces one task per group. A template either expands fully or
//! fails as a whole; templates never affect one another.

use crate::config::{resolve_kinds, FromDeps, KindConfig, SetName, TaskTemplate};
use crate::error::{ConfigError, ExpansionError, ExpansionResult};
use crate::transform::attributes::filter_tasks;
use crate::transform::context::Context;
use crate::transform::group::{group, Group};
use crate::transform::primary::require_primary;
use crate::transform::registry::Registry;
use crate::transform::task::{Task, PRIMARY_KIND_DEPENDENCY};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Expand one template against the upstream pool
pub fn expand(
    ctx: &Context<'_>,
    label: &str,
    template: &TaskTemplate,
    pool: &[Task],
) -> ExpansionResult<Vec<Task>> {
    let Some(from_deps) = template.from_deps.as_ref() else {
        let source = ConfigError::NotFromDeps {
            template: label.to_string(),
        };
        return Err(config_error(label, source));
    };

    if ctx.kind_dependencies.is_empty() {
        return Err(config_error(
            label,
            ConfigError::MissingKindDependencies {
                kind: ctx.kind.clone(),
            },
        ));
    }
    let kinds = resolve_kinds(label, from_deps, &ctx.kind_dependencies)
        .map_err(|source| config_error(label, source))?;

    let candidates = filter_tasks(
        pool.iter().filter(|task| kinds.contains(&task.kind)),
        &from_deps.with_attributes,
    );
    debug!(
        template = label,
        pool = pool.len(),
        candidates = candidates.len(),
        "filtered upstream tasks"
    );

    if candidates.is_empty() {
        if from_deps.allow_empty {
            debug!(template = label, "no candidates, allow-empty is set");
            return Ok(Vec::new());
        }
        return Err(ExpansionError::NoMatchingTasks {
            template: label.to_string(),
            kinds,
        });
    }

    let group_ctx = ctx.group_context(label, &kinds);
    let groups = group(
        &group_ctx,
        ctx.registry(),
        &candidates,
        &from_deps.group_by,
        from_deps.on_empty_group,
    )?;

    let mut labels = LabelAllocator::default();
    let mut tasks = Vec::with_capacity(groups.len());
    for (index, members) in groups.iter().enumerate() {
        if from_deps.unique_kinds {
            check_unique_kinds(label, index, members)?;
        }
        let primary = require_primary(label, index, members, &kinds)?;

        let base = match discriminator(from_deps.set_name, primary) {
            Some(name) => format!("{}-{}", label, name),
            None => label.to_string(),
        };
        let task_label = labels.allocate(base);

        tasks.push(synthesize(ctx, task_label, template, from_deps, members, primary));
    }

    info!(
        template = label,
        groups = groups.len(),
        tasks = tasks.len(),
        "expanded template"
    );
    Ok(tasks)
}

/// Build the output task for one group
fn synthesize(
    ctx: &Context<'_>,
    label: String,
    template: &TaskTemplate,
    from_deps: &FromDeps,
    members: &Group<'_>,
    primary: &Task,
) -> Task {
    let mut attributes = template.attributes.clone();
    attributes.insert(
        PRIMARY_KIND_DEPENDENCY.to_string(),
        Value::String(primary.kind.clone()),
    );
    if from_deps.copy_attributes {
        for (key, value) in &primary.attributes {
            attributes
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    let mut dependencies = template.dependencies.clone();
    for dep in members {
        let edge = if from_deps.unique_kinds {
            dep.kind.clone()
        } else {
            dep.label.clone()
        };
        dependencies.insert(edge, dep.label.clone());
    }

    Task {
        kind: ctx.kind.clone(),
        label,
        attributes,
        dependencies,
        payload: template.payload.clone(),
    }
}

/// Derive the label discriminator from the primary task
fn discriminator(set_name: SetName, primary: &Task) -> Option<String> {
    match set_name {
        SetName::StripKind => {
            let prefix = format!("{}-", primary.kind);
            let name = primary
                .label
                .strip_prefix(&prefix)
                .filter(|rest| !rest.is_empty())
                .unwrap_or(primary.label.as_str());
            Some(name.to_string())
        }
        SetName::RetainKind => Some(primary.label.clone()),
        SetName::Disabled => None,
    }
}

fn check_unique_kinds(template: &str, index: usize, members: &Group<'_>) -> ExpansionResult<()> {
    let mut seen = HashSet::new();
    for task in members {
        if !seen.insert(task.kind.as_str()) {
            return Err(ExpansionError::DuplicateKindInGroup {
                template: template.to_string(),
                group: index,
                kind: task.kind.clone(),
            });
        }
    }
    Ok(())
}

fn config_error(template: &str, source: ConfigError) -> ExpansionError {
    ExpansionError::Config {
        template: template.to_string(),
        source,
    }
}

/// Hands out unique labels; repeats get `-1`, `-2`, ... in request order
#[derive(Default)]
struct LabelAllocator {
    used: HashSet<String>,
    repeats: BTreeMap<String, usize>,
}

impl LabelAllocator {
    fn allocate(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let counter = self.repeats.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}-{}", base, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Outcome of expanding one template
#[derive(Debug, Clone)]
pub struct TemplateOutcome {
    /// Label of the template
    pub template: String,

    /// Produced tasks, or why the template failed
    pub result: ExpansionResult<Vec<Task>>,
}

/// Outcome of expanding every template of a kind
#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    /// Per-template outcomes, in template order
    pub outcomes: Vec<TemplateOutcome>,
}

impl ExpansionReport {
    /// Tasks produced by the templates that succeeded
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .flatten()
    }

    /// Errors of the templates that failed
    pub fn errors(&self) -> Vec<&ExpansionError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect()
    }

    /// Check if every template expanded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// All produced tasks, or the first template error
    pub fn into_result(self) -> ExpansionResult<Vec<Task>> {
        let mut tasks = Vec::new();
        for outcome in self.outcomes {
            tasks.extend(outcome.result?);
        }
        Ok(tasks)
    }
}

/// Expand every template of a kind definition
///
/// Templates without a `from-deps` block pass through as a single task
/// labelled after the template. A failing template is reported and does not
/// stop the others.
pub fn expand_kind(config: &KindConfig, pool: &[Task], registry: &Registry) -> ExpansionReport {
    let ctx = Context::using(config.kind.clone(), registry)
        .with_kind_dependencies(config.kind_dependencies.clone());
    expand_templates(&ctx, &config.tasks, pool)
}

/// Expand a set of templates with an existing context
pub fn expand_templates(
    ctx: &Context<'_>,
    templates: &BTreeMap<String, TaskTemplate>,
    pool: &[Task],
) -> ExpansionReport {
    let mut report = ExpansionReport::default();

    for (label, template) in templates {
        let result = if template.from_deps.is_some() {
            expand(ctx, label, template, pool)
        } else {
            Ok(vec![passthrough(ctx, label, template)])
        };

        if let Err(e) = &result {
            warn!(template = %label, error = %e, "template expansion failed");
        }
        report.outcomes.push(TemplateOutcome {
            template: label.clone(),
            result,
        });
    }

    report
}

fn passthrough(ctx: &Context<'_>, label: &str, template: &TaskTemplate) -> Task {
    Task {
        kind: ctx.kind.clone(),
        label: label.to_string(),
        attributes: template.attributes.clone(),
        dependencies: template.dependencies.clone(),
        payload: template.payload.clone(),
    }
}
