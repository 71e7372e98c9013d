//! Module descriptor parsing and types (girder.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a module's code is provided to the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Compiled from sources owned by this build.
    #[default]
    CPlusPlus,
    /// Prebuilt or header-only code. External modules are never compiled
    /// and are never bound to a binary of their own.
    External,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CPlusPlus => write!(f, "c++"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Per-module override for export macro selection in monolithic targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SymbolVisibility {
    /// Follow the target-level export settings.
    #[default]
    Default,
    /// Export symbols whenever the target is compiled as a DLL, even if
    /// the target itself declares no exports.
    VisibleForDll,
}

/// Authored description of one unit of compilation and linking.
///
/// Loaded from a `girder.toml` file and never mutated afterwards. Name
/// lists reference other modules by name; resolution to graph nodes
/// happens in girder-build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub name: String,

    #[serde(default)]
    pub kind: ModuleKind,

    /// Module root directory. Include paths and library references are
    /// interpreted relative to the build invocation, so authored entries
    /// are expected to be rooted here already.
    #[serde(default)]
    pub directory: PathBuf,

    /// Modules this module's public interface depends on. Their public
    /// compile environment propagates to this module's consumers.
    #[serde(default)]
    pub public_dependencies: Vec<String>,

    /// Modules only this module's implementation depends on.
    #[serde(default)]
    pub private_dependencies: Vec<String>,

    /// Modules loaded at runtime rather than linked. These never
    /// participate in build-order cycle detection.
    #[serde(default)]
    pub dynamically_loaded: Vec<String>,

    /// Modules whose headers this module's public interface needs, without
    /// taking a link dependency on them.
    #[serde(default)]
    pub public_include_path_modules: Vec<String>,

    /// Modules whose headers only this module's implementation needs.
    #[serde(default)]
    pub private_include_path_modules: Vec<String>,

    /// Modules this module is allowed to be mutually dependent on. A cycle
    /// through this module is accepted only if the next module in the
    /// chain appears here.
    #[serde(default)]
    pub circular_dependencies: Vec<String>,

    #[serde(default)]
    pub public_include_paths: Vec<PathBuf>,

    #[serde(default)]
    pub private_include_paths: Vec<PathBuf>,

    /// Include paths searched as system headers (no warnings).
    #[serde(default)]
    pub system_include_paths: Vec<PathBuf>,

    /// Directories searched for system libraries at link time.
    #[serde(default)]
    pub public_system_library_paths: Vec<PathBuf>,

    /// Files force-included into every translation unit of this module.
    #[serde(default)]
    pub forced_include_files: Vec<PathBuf>,

    /// Preprocessor definitions exposed to this module and its consumers.
    #[serde(default)]
    pub public_definitions: Vec<String>,

    /// Libraries linked by path into any binary consuming this module.
    #[serde(default)]
    pub public_libraries: Vec<String>,

    /// Subset of `public_libraries` produced by a prerequisite that has
    /// not been built yet. Unresolvable references listed here are
    /// deferred instead of warned about.
    #[serde(default)]
    pub prebuilt_libraries: Vec<String>,

    /// Libraries resolved by the linker's own search paths.
    #[serde(default)]
    pub public_system_libraries: Vec<String>,

    #[serde(default)]
    pub public_frameworks: Vec<String>,

    #[serde(default)]
    pub public_weak_frameworks: Vec<String>,

    /// DLLs that consumers should delay-load rather than import directly.
    #[serde(default)]
    pub public_delay_load_dlls: Vec<String>,

    /// Runtime library search paths for consumers of this module. Entries
    /// may use `$(ModuleDir)`, `$(BinaryOutputDir)` and `$(TargetOutputDir)`
    /// variables, expanded at link time.
    #[serde(default)]
    pub public_runtime_library_paths: Vec<String>,

    #[serde(default)]
    pub symbol_visibility: SymbolVisibility,
}

impl ModuleDescriptor {
    /// Create a descriptor with the given name and defaults everywhere
    /// else. Primarily a test and tooling convenience; real descriptors
    /// come from `from_file`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::default(),
            directory: PathBuf::new(),
            public_dependencies: Vec::new(),
            private_dependencies: Vec::new(),
            dynamically_loaded: Vec::new(),
            public_include_path_modules: Vec::new(),
            private_include_path_modules: Vec::new(),
            circular_dependencies: Vec::new(),
            public_include_paths: Vec::new(),
            private_include_paths: Vec::new(),
            system_include_paths: Vec::new(),
            public_system_library_paths: Vec::new(),
            forced_include_files: Vec::new(),
            public_definitions: Vec::new(),
            public_libraries: Vec::new(),
            prebuilt_libraries: Vec::new(),
            public_system_libraries: Vec::new(),
            public_frameworks: Vec::new(),
            public_weak_frameworks: Vec::new(),
            public_delay_load_dlls: Vec::new(),
            public_runtime_library_paths: Vec::new(),
            symbol_visibility: SymbolVisibility::default(),
        }
    }

    /// Parse a descriptor from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a descriptor from a girder.toml file. The descriptor's
    /// directory defaults to the file's parent directory when the file
    /// does not set one.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut descriptor = Self::from_str(&content)?;
        if descriptor.directory.as_os_str().is_empty() {
            if let Some(parent) = path.parent() {
                descriptor.directory = parent.to_path_buf();
            }
        }
        Ok(descriptor)
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Whether this module has declared an intentional cycle through the
    /// given module.
    pub fn confesses_cycle_on(&self, module_name: &str) -> bool {
        self.circular_dependencies.iter().any(|m| m == module_name)
    }

    /// The `NAME_API` macro used for this module's import/export
    /// declarations. Non-alphanumeric characters map to underscores.
    pub fn api_define(&self) -> String {
        let mut define: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        define.push_str("_API");
        define
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_descriptor() {
        let toml = r#"
            name = "Core"
        "#;

        let descriptor = ModuleDescriptor::from_str(toml).unwrap();
        assert_eq!(descriptor.name, "Core");
        assert_eq!(descriptor.kind, ModuleKind::CPlusPlus);
        assert!(descriptor.public_dependencies.is_empty());
        assert!(descriptor.circular_dependencies.is_empty());
    }

    #[test]
    fn test_parse_complete_descriptor() {
        let toml = r#"
            name = "Engine"
            kind = "CPlusPlus"
            directory = "Engine"
            public_dependencies = ["Core", "CoreUObject"]
            private_dependencies = ["Renderer"]
            dynamically_loaded = ["PluginHost"]
            public_include_path_modules = ["Json"]
            circular_dependencies = ["Renderer"]
            public_include_paths = ["Engine/Public"]
            private_include_paths = ["Engine/Private"]
            public_definitions = ["WITH_ENGINE=1"]
            public_system_libraries = ["ws2_32.lib"]
            public_delay_load_dlls = ["d3d12.dll"]
        "#;

        let descriptor = ModuleDescriptor::from_str(toml).unwrap();
        assert_eq!(descriptor.public_dependencies.len(), 2);
        assert_eq!(descriptor.private_dependencies, vec!["Renderer"]);
        assert_eq!(descriptor.dynamically_loaded, vec!["PluginHost"]);
        assert!(descriptor.confesses_cycle_on("Renderer"));
        assert!(!descriptor.confesses_cycle_on("Core"));
        assert_eq!(descriptor.public_delay_load_dlls, vec!["d3d12.dll"]);
    }

    #[test]
    fn test_parse_external_module() {
        let toml = r#"
            name = "zlib"
            kind = "External"
            public_include_paths = ["ThirdParty/zlib/include"]
            public_libraries = ["ThirdParty/zlib/lib/zlibstatic.lib"]
        "#;

        let descriptor = ModuleDescriptor::from_str(toml).unwrap();
        assert_eq!(descriptor.kind, ModuleKind::External);
        assert_eq!(descriptor.public_libraries.len(), 1);
    }

    #[test]
    fn test_api_define() {
        assert_eq!(ModuleDescriptor::new("Core").api_define(), "CORE_API");
        assert_eq!(
            ModuleDescriptor::new("OnlineSubsystem").api_define(),
            "ONLINESUBSYSTEM_API"
        );
        assert_eq!(
            ModuleDescriptor::new("D3D11-RHI").api_define(),
            "D3D11_RHI_API"
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let mut descriptor = ModuleDescriptor::new("Core");
        descriptor.public_definitions = vec!["CORE=1".to_string()];
        descriptor.public_dependencies = vec!["TraceLog".to_string()];

        let text = descriptor.to_toml().unwrap();
        let parsed = ModuleDescriptor::from_str(&text).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_from_file_defaults_directory() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("Core");
        std::fs::create_dir_all(&module_dir).unwrap();
        let path = module_dir.join("girder.toml");
        std::fs::write(&path, "name = \"Core\"\n").unwrap();

        let descriptor = ModuleDescriptor::from_file(&path).unwrap();
        assert_eq!(descriptor.directory, module_dir);
    }

    #[test]
    fn test_symbol_visibility_default() {
        let descriptor = ModuleDescriptor::from_str("name = \"Core\"").unwrap();
        assert_eq!(descriptor.symbol_visibility, SymbolVisibility::Default);

        let toml = r#"
            name = "Launch"
            symbol_visibility = "VisibleForDll"
        "#;
        let descriptor = ModuleDescriptor::from_str(toml).unwrap();
        assert_eq!(descriptor.symbol_visibility, SymbolVisibility::VisibleForDll);
    }
}
