//! fromdeps - expand task templates over their upstream kind dependencies
//!
//! A template carrying a `from-deps` block is turned into one task per group
//! of upstream tasks. Groups come from a named group-by strategy; custom
//! strategies are added to a [`transform::Registry`] before expansion starts.

// Public modules
pub mod config;
pub mod error;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use transform::{expand, expand_kind, Context, Registry, Task};

/// Current version of fromdeps
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
