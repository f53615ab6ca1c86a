//! Shared types, error definitions, and utilities used across all teledrive crates.

pub mod error;
pub mod types;

pub use error::{Error, Result};
