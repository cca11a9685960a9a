//! Error types for fromdeps

use thiserror::Error;

/// Result type alias for fromdeps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fromdeps
#[derive(Error, Debug)]
pub enum Error {
    /// Group-by registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template expansion errors
    #[error("Expansion error: {0}")]
    Expansion(#[from] ExpansionError),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Group-by strategy registration and lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Group-by strategy '{0}' is already registered")]
    DuplicateStrategy(String),

    #[error("Group-by strategy '{0}' is not registered")]
    UnknownStrategy(String),

    #[error("The process-wide group-by registry is already installed")]
    AlreadyInstalled,

    #[error("Built-in group-by strategy '{0}' is missing from the registry")]
    MissingBuiltin(String),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Kind '{kind}' uses from-deps but declares no kind-dependencies")]
    MissingKindDependencies { kind: String },

    #[error("Template '{template}' has an empty from-deps kinds list")]
    EmptyKinds { template: String },

    #[error("Template '{template}' lists kinds that are not kind-dependencies: {}", kinds.join(", "))]
    UnknownKinds { template: String, kinds: Vec<String> },

    #[error("Template '{template}' has no from-deps block")]
    NotFromDeps { template: String },
}

/// Errors raised while expanding a single template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("Template '{template}': group-by strategy '{strategy}' is not registered")]
    UnknownStrategy { template: String, strategy: String },

    #[error(
        "Template '{template}': context {value} for group-by strategy '{strategy}' does not match schema {schema}"
    )]
    SchemaValidation {
        template: String,
        strategy: String,
        value: String,
        schema: String,
    },

    #[error(
        "Template '{template}': group {group} has no task of a preferred kind ({})",
        kinds.join(", ")
    )]
    NoPrimaryKind {
        template: String,
        group: usize,
        kinds: Vec<String>,
    },

    #[error("Template '{template}': no upstream task matches kinds ({})", kinds.join(", "))]
    NoMatchingTasks { template: String, kinds: Vec<String> },

    #[error("Template '{template}': group-by strategy '{strategy}' produced empty group {group}")]
    EmptyGroup {
        template: String,
        strategy: String,
        group: usize,
    },

    #[error("Template '{template}': group {group} holds more than one task of kind '{kind}'")]
    DuplicateKindInGroup {
        template: String,
        group: usize,
        kind: String,
    },

    #[error("Template '{template}': {source}")]
    Config {
        template: String,
        #[source]
        source: ConfigError,
    },
}

impl ExpansionError {
    /// Label of the template whose expansion failed
    pub fn template(&self) -> &str {
        match self {
            ExpansionError::UnknownStrategy { template, .. }
            | ExpansionError::SchemaValidation { template, .. }
            | ExpansionError::NoPrimaryKind { template, .. }
            | ExpansionError::NoMatchingTasks { template, .. }
            | ExpansionError::EmptyGroup { template, .. }
            | ExpansionError::DuplicateKindInGroup { template, .. }
            | ExpansionError::Config { template, .. } => template,
        }
    }
}

/// Specialized result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for expansion operations
pub type ExpansionResult<T> = std::result::Result<T, ExpansionError>;
