//! Shared types for the image manager
//!
//! This crate contains the error taxonomy and value types shared by the
//! configuration loader and the operator tooling.

pub mod error;
pub mod timeout;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, ImageManagerError, Result};
pub use timeout::{ExpirationTimeout, TimeoutParseError};
