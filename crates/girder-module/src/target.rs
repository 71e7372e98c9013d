//! Target-level configuration consumed by graph resolution

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the target's modules are combined into binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// All modules are linked into a single binary. Import/export macros
    /// collapse to one visibility value for the whole target.
    Monolithic,
    /// Modules are spread across multiple dynamic binaries. Import/export
    /// macros distinguish same-binary from cross-binary references.
    Modular,
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monolithic => write!(f, "monolithic"),
            Self::Modular => write!(f, "modular"),
        }
    }
}

/// Target-level settings that affect environment resolution.
///
/// Per-module platform gating is resolved by the platform layer before
/// descriptors reach girder; a descriptor present in the input set is
/// buildable by definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target name; also the name of the monolithic output binary.
    pub name: String,

    pub link_type: LinkType,

    /// Whether a monolithic target is itself compiled as a DLL.
    #[serde(default)]
    pub compile_as_dll: bool,

    /// Whether the target exports symbols.
    #[serde(default)]
    pub has_exports: bool,

    /// Root directory for output binaries.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target")
}

impl TargetConfig {
    /// Create a target configuration with default output settings.
    pub fn new(name: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            name: name.into(),
            link_type,
            compile_as_dll: false,
            has_exports: false,
            output_dir: default_output_dir(),
        }
    }

    /// Compile the monolithic target as a DLL.
    pub fn with_compile_as_dll(mut self, compile_as_dll: bool) -> Self {
        self.compile_as_dll = compile_as_dll;
        self
    }

    /// Mark the target as exporting symbols.
    pub fn with_exports(mut self, has_exports: bool) -> Self {
        self.has_exports = has_exports;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn is_monolithic(&self) -> bool {
        self.link_type == LinkType::Monolithic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_config_defaults() {
        let config = TargetConfig::new("Game", LinkType::Monolithic);
        assert!(config.is_monolithic());
        assert!(!config.compile_as_dll);
        assert!(!config.has_exports);
        assert_eq!(config.output_dir, PathBuf::from("target"));
    }

    #[test]
    fn test_target_config_builders() {
        let config = TargetConfig::new("Editor", LinkType::Modular)
            .with_exports(true)
            .with_output_dir("out/Editor");
        assert!(!config.is_monolithic());
        assert!(config.has_exports);
        assert_eq!(config.output_dir, PathBuf::from("out/Editor"));
    }

    #[test]
    fn test_target_config_from_toml() {
        let toml = r#"
            name = "Game"
            link_type = "Modular"
            has_exports = true
        "#;

        let config: TargetConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name, "Game");
        assert_eq!(config.link_type, LinkType::Modular);
        assert!(config.has_exports);
        assert_eq!(config.output_dir, PathBuf::from("target"));
    }

    #[test]
    fn test_link_type_display() {
        assert_eq!(LinkType::Monolithic.to_string(), "monolithic");
        assert_eq!(LinkType::Modular.to_string(), "modular");
    }
}
