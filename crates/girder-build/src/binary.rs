//! Output binaries and module-to-binary assignment
//!
//! Every reachable compiled module is assigned to exactly one binary
//! before the environment resolvers run. External modules never own a
//! binary; their link inputs are pulled through by consumers.

use crate::error::{BuildError, BuildResult};
use crate::graph::{ModuleGraph, ModuleId};
use girder_module::{ModuleKind, TargetConfig};
use std::collections::HashMap;
use std::path::PathBuf;

/// Stable handle to a binary within one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryId(pub(crate) u32);

impl BinaryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of output binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryKind {
    Executable,
    DynamicLibrary,
    StaticLibrary,
}

impl BinaryKind {
    /// Conventional output directory name for this kind
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Self::Executable | Self::DynamicLibrary => "bin",
            Self::StaticLibrary => "lib",
        }
    }

    /// File extension for this kind
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Executable => "exe",
            Self::DynamicLibrary => "dll",
            Self::StaticLibrary => "lib",
        }
    }
}

impl std::fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executable => write!(f, "executable"),
            Self::DynamicLibrary => write!(f, "dynamic library"),
            Self::StaticLibrary => write!(f, "static library"),
        }
    }
}

/// An output binary and the modules linked into it
#[derive(Debug)]
pub struct Binary {
    pub name: String,
    pub kind: BinaryKind,
    /// Directory the binary is written to.
    pub output_dir: PathBuf,
    /// Whether modules compiled into this binary may export symbols.
    pub allow_exports: bool,
    /// Modules statically assigned to this binary.
    pub modules: Vec<ModuleId>,
}

impl Binary {
    pub fn output_filename(&self) -> String {
        format!("{}.{}", self.name, self.kind.file_extension())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.output_filename())
    }
}

/// The binaries of one target, addressed by `BinaryId`.
#[derive(Debug, Default)]
pub struct BinarySet {
    binaries: Vec<Binary>,
    by_name: HashMap<String, BinaryId>,
}

impl BinarySet {
    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<BinaryId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binary> {
        self.binaries.iter()
    }

    pub fn binary_ids(&self) -> impl Iterator<Item = BinaryId> {
        (0..self.binaries.len() as u32).map(BinaryId)
    }
}

impl std::ops::Index<BinaryId> for BinarySet {
    type Output = Binary;

    fn index(&self, id: BinaryId) -> &Binary {
        &self.binaries[id.index()]
    }
}

/// Assigns modules to binaries.
///
/// Assignments are set-once: rebinding a module is a configuration
/// error. Modules left unassigned surface later, and only if link
/// resolution actually touches them.
pub struct BinaryBinder {
    binaries: BinarySet,
}

impl BinaryBinder {
    pub fn new() -> Self {
        Self {
            binaries: BinarySet::default(),
        }
    }

    /// Create a binary. Names are unique within a target.
    pub fn create_binary(
        &mut self,
        name: impl Into<String>,
        kind: BinaryKind,
        output_dir: impl Into<PathBuf>,
        allow_exports: bool,
    ) -> BuildResult<BinaryId> {
        let name = name.into();
        if self.binaries.by_name.contains_key(&name) {
            return Err(BuildError::AmbiguousBinary { name });
        }
        let id = BinaryId(self.binaries.binaries.len() as u32);
        let output_dir = output_dir.into().join(kind.output_dir_name());
        self.binaries.by_name.insert(name.clone(), id);
        self.binaries.binaries.push(Binary {
            name,
            kind,
            output_dir,
            allow_exports,
            modules: Vec::new(),
        });
        Ok(id)
    }

    /// Assign a module to a binary.
    pub fn bind(
        &mut self,
        graph: &mut ModuleGraph,
        binary: BinaryId,
        module: ModuleId,
    ) -> BuildResult<()> {
        let binary_name = self.binaries[binary].name.clone();
        if graph[module].kind() == ModuleKind::External {
            return Err(BuildError::ExternalModuleBound {
                module: graph[module].name().to_string(),
                binary: binary_name,
            });
        }
        if let Some(bound) = graph[module].binary() {
            return Err(BuildError::ModuleAlreadyBound {
                module: graph[module].name().to_string(),
                bound: self.binaries[bound].name.clone(),
                requested: binary_name,
            });
        }
        graph.set_binary(module, binary);
        self.binaries.binaries[binary.index()].modules.push(module);
        Ok(())
    }

    /// Place the root module and everything reachable from it into a
    /// single binary, per the target's monolithic settings.
    pub fn bind_monolithic(
        graph: &mut ModuleGraph,
        target: &TargetConfig,
        root: ModuleId,
    ) -> BuildResult<BinarySet> {
        let mut binder = Self::new();
        let kind = if target.compile_as_dll {
            BinaryKind::DynamicLibrary
        } else {
            BinaryKind::Executable
        };
        let binary = binder.create_binary(
            target.name.clone(),
            kind,
            target.output_dir.clone(),
            target.has_exports,
        )?;

        let mut members = vec![root];
        members.extend(graph.all_dependencies(root, true, false));
        for module in members {
            if graph[module].kind() != ModuleKind::External {
                binder.bind(graph, binary, module)?;
            }
        }
        Ok(binder.finish())
    }

    /// Modular layout: the root module becomes the target executable and
    /// each listed module gets a dynamic library of its own. Reachable
    /// modules not listed stay unbound; touching one during link
    /// resolution is the consumer's error.
    pub fn bind_modular(
        graph: &mut ModuleGraph,
        target: &TargetConfig,
        root: ModuleId,
        dynamic_modules: &[ModuleId],
    ) -> BuildResult<BinarySet> {
        let mut binder = Self::new();

        let executable = binder.create_binary(
            target.name.clone(),
            BinaryKind::Executable,
            target.output_dir.clone(),
            target.has_exports,
        )?;
        binder.bind(graph, executable, root)?;

        for &module in dynamic_modules {
            if module == root {
                continue;
            }
            let name = graph[module].name().to_string();
            let binary = binder.create_binary(
                name,
                BinaryKind::DynamicLibrary,
                target.output_dir.clone(),
                true,
            )?;
            binder.bind(graph, binary, module)?;
        }
        Ok(binder.finish())
    }

    pub fn finish(self) -> BinarySet {
        self.binaries
    }
}

impl Default for BinaryBinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dependencies of `module` that have no binary yet. External modules
/// are exempt; they never receive one.
pub fn unbound_references(graph: &ModuleGraph, module: ModuleId) -> Vec<ModuleId> {
    graph[module]
        .link_dependencies()
        .filter(|&dep| graph[dep].binary().is_none() && graph[dep].kind() != ModuleKind::External)
        .collect()
}
