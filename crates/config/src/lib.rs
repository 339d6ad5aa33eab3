//! Configuration management for the image manager
//!
//! This crate validates the image manager's configuration document against
//! its schema and produces an immutable [`ServiceConfig`]. Documents come
//! from JSON or YAML files with environment variable overrides, or straight
//! from memory.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, DocumentFormat, DEFAULT_ENV_PREFIX};
pub use schema::*;
pub use validation::*;
