//! Girder module descriptions
//!
//! Authored inputs for the girder build system: per-module descriptors
//! (girder.toml), target-level configuration, and descriptor-set
//! validation. Descriptors are immutable once loaded; all graph logic
//! lives in girder-build.

pub mod descriptor;
pub mod target;
pub mod validator;

pub use descriptor::{ModuleDescriptor, ModuleKind, SymbolVisibility};
pub use target::{LinkType, TargetConfig};
pub use validator::{ValidationError, Validator};

/// Module description errors
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Failed to parse descriptor: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize descriptor: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ModuleError>;
