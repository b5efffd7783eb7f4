//! Core types for pinhook
//!
//! This is the foundation crate that every other pinhook crate depends on.
//! It provides the shared error taxonomy and nothing else, so it has no
//! dependencies on other pinhook crates.

pub mod error;

pub use error::{Error, Result};
