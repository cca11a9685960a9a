//! Task expansion engine
//!
//! This module turns templates into concrete tasks: attribute matching,
//! the group-by registry and built-in strategies, primary dependency
//! resolution and the expansion itself.

pub mod attributes;
pub mod context;
pub mod expand;
pub mod group;
pub mod primary;
pub mod registry;
pub mod task;

// Re-export main types
pub use attributes::*;
pub use context::*;
pub use expand::*;
pub use group::{group, Group, ALL, ATTRIBUTE, SINGLE};
pub use primary::*;
pub use registry::{Registry, Strategy, StrategyFn};
pub use task::*;
