/// Build resolution error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read descriptor at {path}: {error}")]
    DescriptorReadError { path: PathBuf, error: String },

    #[error("Invalid descriptor set:\n{0}")]
    InvalidDescriptors(String),

    #[error("Module not found: '{module}' (referenced via {chain})")]
    ModuleNotFound { module: String, chain: String },

    #[error(
        "Circular dependency on '{module}' detected.\n\
         \tFull route: {route}\n\
         \tCycled route: {cycle}\n\
         Break this loop by moving shared code into a separate module, declaring the cycle \
         on one of its members, or referencing declarations through include-path modules"
    )]
    CircularDependency {
        module: String,
        route: String,
        cycle: String,
    },

    #[error("Module '{module}' is already bound to binary '{bound}' (attempted rebind to '{requested}')")]
    ModuleAlreadyBound {
        module: String,
        bound: String,
        requested: String,
    },

    #[error("External module '{module}' cannot be bound to binary '{binary}'")]
    ExternalModuleBound { module: String, binary: String },

    #[error("More than one binary named '{name}' in target")]
    AmbiguousBinary { name: String },

    #[error("Module '{module}' is not bound to any binary but is required to link '{binary}'")]
    UnboundModule { module: String, binary: String },

    #[error("Environment variable '{variable}' is not defined (referenced by module '{module}')")]
    UndefinedPathVariable { variable: String, module: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export serialization failed: {0}")]
    ExportError(#[from] serde_json::Error),

    #[error("Module error: {0}")]
    Module(#[from] girder_module::ModuleError),
}

impl BuildError {
    /// Create a descriptor read error
    pub fn descriptor_read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::DescriptorReadError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>, chain: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
            chain: chain.into(),
        }
    }

    /// Create an unbound module error
    pub fn unbound_module(module: impl Into<String>, binary: impl Into<String>) -> Self {
        Self::UnboundModule {
            module: module.into(),
            binary: binary.into(),
        }
    }
}
