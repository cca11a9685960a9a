//! Configuration parsing and validation
//!
//! This module handles the typed model of kind definitions and their
//! `from-deps` blocks, and validation of that model.

pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
