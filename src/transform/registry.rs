//! Group-by strategy registry
//!
//! A registry maps strategy names to grouping functions and the optional
//! schema their context value must satisfy. Registration happens on an
//! owned `Registry` during initialization; the process-wide table is set
//! once with [`install`] and is read-only from then on.

use crate::config::Schema;
use crate::error::{ExpansionError, ExpansionResult, RegistryError, RegistryResult};
use crate::transform::context::GroupContext;
use crate::transform::group::{self, Group};
use crate::transform::Task;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Signature of a grouping function
///
/// Candidates have already passed the template's attribute filter and the
/// context value, when present, has already passed the strategy's schema.
pub type StrategyFn = dyn for<'a> Fn(&GroupContext<'_>, &[&'a Task], Option<&Value>) -> ExpansionResult<Vec<Group<'a>>>
    + Send
    + Sync;

/// A registered strategy
#[derive(Clone)]
pub struct Strategy {
    name: String,
    func: Arc<StrategyFn>,
    schema: Option<Schema>,
}

impl Strategy {
    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema of the context value, if the strategy takes one
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Invoke the grouping function
    pub fn call<'a>(
        &self,
        ctx: &GroupContext<'_>,
        candidates: &[&'a Task],
        context: Option<&Value>,
    ) -> ExpansionResult<Vec<Group<'a>>> {
        (self.func)(ctx, candidates, context)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Table of group-by strategies
#[derive(Clone, Default, Debug)]
pub struct Registry {
    strategies: BTreeMap<String, Strategy>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// Create a registry holding the built-in strategies
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        group::register_builtins(&mut registry);
        registry
    }

    /// Register a strategy under a unique name
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        func: F,
        schema: Option<Schema>,
    ) -> RegistryResult<()>
    where
        F: for<'a> Fn(&GroupContext<'_>, &[&'a Task], Option<&Value>) -> ExpansionResult<Vec<Group<'a>>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.strategies.contains_key(&name) {
            return Err(RegistryError::DuplicateStrategy(name));
        }

        debug!(strategy = %name, has_schema = schema.is_some(), "registering group-by strategy");
        self.strategies.insert(
            name.clone(),
            Strategy {
                name,
                func: Arc::new(func),
                schema,
            },
        );
        Ok(())
    }

    /// Register a strategy that receives its context value as a typed struct
    ///
    /// The value is checked against `schema` and then deserialized into `C`.
    /// A value that passes the schema but does not deserialize is reported as
    /// a schema validation failure.
    pub fn register_typed<C, F>(
        &mut self,
        name: impl Into<String>,
        schema: Schema,
        func: F,
    ) -> RegistryResult<()>
    where
        C: DeserializeOwned,
        F: for<'a> Fn(&GroupContext<'_>, &[&'a Task], C) -> ExpansionResult<Vec<Group<'a>>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let strategy = name.clone();
        let rendered_schema = schema.to_string();

        self.register(
            name,
            move |ctx, candidates, context| {
                let value = context.cloned().unwrap_or(Value::Null);
                let typed: C = serde_yaml::from_value(value.clone()).map_err(|_| {
                    ExpansionError::SchemaValidation {
                        template: ctx.template.to_string(),
                        strategy: strategy.clone(),
                        value: group::render_value(&value),
                        schema: rendered_schema.clone(),
                    }
                })?;
                func(ctx, candidates, typed)
            },
            Some(schema),
        )
    }

    /// Look up a strategy
    pub fn resolve(&self, name: &str) -> RegistryResult<&Strategy> {
        self.strategies
            .get(name)
            .ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))
    }

    /// Check if a strategy is registered
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered strategy names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry
///
/// Must happen before the first call to [`global`]; fails once a registry
/// has been installed, explicitly or by a prior [`global`] call. The
/// registry must carry the `single` and `attribute` built-ins.
pub fn install(registry: Registry) -> RegistryResult<()> {
    if GLOBAL.get().is_some() {
        return Err(RegistryError::AlreadyInstalled);
    }
    if let Some(missing) = [group::SINGLE, group::ATTRIBUTE]
        .into_iter()
        .find(|name| !registry.contains(name))
    {
        return Err(RegistryError::MissingBuiltin(missing.to_string()));
    }

    debug!(strategies = ?registry.names(), "installing process-wide registry");
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)
}

/// Get the process-wide registry, installing the built-ins if none was set
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::with_builtins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::group::{ALL, ATTRIBUTE, SINGLE};
    use serde::Deserialize;

    fn reversed<'a>(
        _ctx: &GroupContext<'_>,
        candidates: &[&'a Task],
        _context: Option<&Value>,
    ) -> ExpansionResult<Vec<Group<'a>>> {
        Ok(vec![candidates.iter().rev().copied().collect()])
    }

    fn group_context<'a>(kinds: &'a [String]) -> GroupContext<'a> {
        GroupContext {
            kind: "bundle",
            template: "bundle",
            kinds,
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        assert_eq!(registry.names(), vec![ALL, ATTRIBUTE, SINGLE]);
        assert_eq!(
            registry.resolve(ATTRIBUTE).unwrap().schema(),
            Some(&Schema::String)
        );
        assert!(registry.resolve(SINGLE).unwrap().schema().is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = Registry::with_builtins();
        let result = registry.register(SINGLE, reversed, None);
        assert_eq!(
            result,
            Err(RegistryError::DuplicateStrategy(SINGLE.to_string()))
        );
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = Registry::new();
        assert_eq!(
            registry.resolve("platform").unwrap_err(),
            RegistryError::UnknownStrategy("platform".to_string())
        );
    }

    #[test]
    fn test_register_and_call_custom() {
        let mut registry = Registry::new();
        registry.register("reversed", reversed, None).unwrap();

        let tasks = vec![Task::new("build", "a"), Task::new("build", "b")];
        let refs: Vec<&Task> = tasks.iter().collect();
        let kinds = vec!["build".to_string()];

        let groups = registry
            .resolve("reversed")
            .unwrap()
            .call(&group_context(&kinds), &refs, None)
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0][0].label, "b");
        assert_eq!(groups[0][1].label, "a");
    }

    #[derive(Deserialize)]
    struct Chunk {
        size: usize,
    }

    fn chunked<'a>(
        _ctx: &GroupContext<'_>,
        candidates: &[&'a Task],
        chunk: Chunk,
    ) -> ExpansionResult<Vec<Group<'a>>> {
        Ok(candidates.chunks(chunk.size).map(|c| c.to_vec()).collect())
    }

    #[test]
    fn test_register_typed_receives_struct() {
        let mut registry = Registry::new();
        registry
            .register_typed(
                "chunk",
                Schema::Record(vec![("size".to_string(), Schema::Integer)]),
                chunked,
            )
            .unwrap();

        let tasks: Vec<Task> = (0..5)
            .map(|i| Task::new("build", format!("build-{}", i)))
            .collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        let kinds = vec!["build".to_string()];
        let context: Value = serde_yaml::from_str("{size: 2}").unwrap();

        let groups = registry
            .resolve("chunk")
            .unwrap()
            .call(&group_context(&kinds), &refs, Some(&context))
            .unwrap();
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_register_typed_rejects_undeserializable_value() {
        let mut registry = Registry::new();
        registry
            .register_typed("chunk", Schema::Any, chunked)
            .unwrap();

        let kinds = vec!["build".to_string()];
        let context = Value::from("two");
        let result = registry
            .resolve("chunk")
            .unwrap()
            .call(&group_context(&kinds), &[], Some(&context));
        assert!(matches!(
            result,
            Err(ExpansionError::SchemaValidation { ref strategy, .. }) if strategy == "chunk"
        ));
    }

    #[test]
    fn test_install_after_global_fails() {
        let registry = global();
        assert!(registry.contains(SINGLE));
        assert_eq!(
            install(Registry::new()),
            Err(RegistryError::AlreadyInstalled)
        );
    }
}
