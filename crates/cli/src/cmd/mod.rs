//! Command implementations

pub mod cache;
pub mod install;
pub mod list;
pub mod run;
pub mod sample;
pub mod validate;
