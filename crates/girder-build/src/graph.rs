//! Module graph construction
//!
//! Resolves a set of descriptors into an arena of module nodes. Each
//! module name produces exactly one node per build session; dependency
//! lists are resolved to arena ids exactly once and are immutable
//! afterwards. Cycles through public/private dependencies are accepted
//! only when a module on the cycled chain has declared them.

use crate::binary::BinaryId;
use crate::diagnostics::Diagnostics;
use crate::error::{BuildError, BuildResult};
use girder_module::{ModuleDescriptor, ModuleKind};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stable handle to a module node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved module node.
///
/// Dependency lists are `None` until resolution reaches the module. The
/// private-include-path list doubles as the "resolution started" marker:
/// a module whose list is set while it is still on the reference stack
/// has been reached through a cycle.
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    descriptor: Arc<ModuleDescriptor>,

    /// Library references resolved to files on disk.
    pub libraries: Vec<PathBuf>,
    /// Declared system libraries plus unresolvable library references
    /// demoted to the linker search path.
    pub system_libraries: Vec<String>,
    /// Existence-filtered include paths.
    pub public_include_paths: Vec<PathBuf>,
    pub private_include_paths: Vec<PathBuf>,
    pub system_include_paths: Vec<PathBuf>,

    pub(crate) public_include_path_modules: Option<Vec<ModuleId>>,
    pub(crate) private_include_path_modules: Option<Vec<ModuleId>>,
    pub(crate) public_dependency_modules: Option<Vec<ModuleId>>,
    pub(crate) private_dependency_modules: Option<Vec<ModuleId>>,
    pub(crate) dynamically_loaded_modules: Option<Vec<ModuleId>>,

    pub(crate) binary: Option<BinaryId>,
}

impl Module {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// The binary this module is assigned to, if binding has happened.
    pub fn binary(&self) -> Option<BinaryId> {
        self.binary
    }

    pub fn public_dependencies(&self) -> &[ModuleId] {
        self.public_dependency_modules.as_deref().unwrap_or(&[])
    }

    pub fn private_dependencies(&self) -> &[ModuleId] {
        self.private_dependency_modules.as_deref().unwrap_or(&[])
    }

    pub fn public_include_path_modules(&self) -> &[ModuleId] {
        self.public_include_path_modules.as_deref().unwrap_or(&[])
    }

    pub fn private_include_path_modules(&self) -> &[ModuleId] {
        self.private_include_path_modules.as_deref().unwrap_or(&[])
    }

    pub fn dynamically_loaded_modules(&self) -> &[ModuleId] {
        self.dynamically_loaded_modules.as_deref().unwrap_or(&[])
    }

    /// Public and private dependencies, private first. This is the order
    /// link resolution walks them in.
    pub fn link_dependencies(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.private_dependencies()
            .iter()
            .chain(self.public_dependencies())
            .copied()
    }
}

/// Arena of resolved module nodes, addressed by `ModuleId`.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    by_name: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module by name.
    pub fn find(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len() as u32).map(ModuleId)
    }

    /// Record a module's binary assignment. The set-once check lives in
    /// `BinaryBinder`, which knows both binaries' names.
    pub(crate) fn set_binary(&mut self, id: ModuleId, binary: BinaryId) {
        self.modules[id.index()].binary = Some(binary);
    }

    /// Ordered transitive dependency listing rooted at `root`, dependencies
    /// before dependents. Confessed back-edges are skipped unless
    /// `force_circular` is set, so the listing terminates on accepted
    /// cycles; forcing them still terminates because visited modules are
    /// never re-entered.
    pub fn all_dependencies(
        &self,
        root: ModuleId,
        include_dynamic: bool,
        force_circular: bool,
    ) -> Vec<ModuleId> {
        let mut referenced = Vec::new();
        let mut ignored = HashSet::new();
        ignored.insert(root);
        self.gather_dependencies(
            root,
            include_dynamic,
            force_circular,
            &mut referenced,
            &mut ignored,
        );
        referenced
    }

    fn gather_dependencies(
        &self,
        from: ModuleId,
        include_dynamic: bool,
        force_circular: bool,
        referenced: &mut Vec<ModuleId>,
        ignored: &mut HashSet<ModuleId>,
    ) {
        let module = &self[from];
        let mut dependencies: Vec<ModuleId> = Vec::new();
        dependencies.extend_from_slice(module.private_dependencies());
        dependencies.extend_from_slice(module.public_dependencies());
        if include_dynamic {
            dependencies.extend_from_slice(module.dynamically_loaded_modules());
        }

        for dependency in dependencies {
            if ignored.contains(&dependency) {
                continue;
            }
            // Don't follow confessed back-references.
            let circular = module
                .descriptor
                .confesses_cycle_on(self[dependency].name());
            if force_circular || !circular {
                ignored.insert(dependency);
                self.gather_dependencies(
                    dependency,
                    include_dynamic,
                    force_circular,
                    referenced,
                    ignored,
                );
                referenced.push(dependency);
            }
        }
    }
}

impl std::ops::Index<ModuleId> for ModuleGraph {
    type Output = Module;

    fn index(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }
}

/// Expand a `$(Variable)` prefix within a path-like value.
///
/// `ModuleDir` resolves against the owning module's directory;
/// `BinaryOutputDir` and `TargetOutputDir` are only available once a
/// binary assignment exists and are passed in by the caller. Any other
/// name falls back to the process environment; an unset variable is a
/// configuration error naming the referencing module.
pub fn expand_path_variables(
    value: &str,
    module: &ModuleDescriptor,
    binary_output_dir: Option<&Path>,
    target_output_dir: Option<&Path>,
) -> BuildResult<String> {
    let Some(rest) = value.strip_prefix("$(") else {
        return Ok(value.to_string());
    };
    let Some(end) = rest.find(')') else {
        return Ok(value.to_string());
    };
    let (name, tail) = (&rest[..end], &rest[end + 1..]);

    let expanded = match name {
        "ModuleDir" => Some(module.directory.clone()),
        "BinaryOutputDir" => binary_output_dir.map(Path::to_path_buf),
        "TargetOutputDir" => target_output_dir.map(Path::to_path_buf),
        _ => None,
    };
    let prefix = match expanded {
        Some(dir) => dir,
        None => match std::env::var(name) {
            Ok(value) if !value.is_empty() => PathBuf::from(value),
            _ => {
                return Err(BuildError::UndefinedPathVariable {
                    variable: name.to_string(),
                    module: module.name.clone(),
                })
            }
        },
    };

    Ok(format!("{}{}", prefix.display(), tail))
}

/// Builds a `ModuleGraph` from a descriptor set.
///
/// Resolution is single-threaded and memoized by module name: resolving
/// a name twice in one session returns the same node. The reference
/// stack threaded through public/private dependency resolution is what
/// detects cycles; dynamically-loaded and include-path-only resolution
/// runs outside it.
pub struct GraphBuilder {
    descriptors: HashMap<String, Arc<ModuleDescriptor>>,
    graph: ModuleGraph,
    diagnostics: Diagnostics,
    probe_paths: bool,
    warned_missing_dirs: HashSet<PathBuf>,
}

impl GraphBuilder {
    pub fn new(descriptors: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        Self {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), Arc::new(d)))
                .collect(),
            graph: ModuleGraph::default(),
            diagnostics: Diagnostics::new(),
            probe_paths: true,
            warned_missing_dirs: HashSet::new(),
        }
    }

    /// Disable filesystem probing for library references and include
    /// directories. Intended for planning against a descriptor set whose
    /// paths are not present locally.
    pub fn with_path_probing(mut self, probe_paths: bool) -> Self {
        self.probe_paths = probe_paths;
        self
    }

    /// Resolve the module with the given name and everything it
    /// transitively references.
    pub fn resolve(&mut self, root_name: &str) -> BuildResult<ModuleId> {
        let root = self.instantiate(root_name, "target")?;
        let mut stack = Vec::new();
        self.wire(root, "target", &mut stack)?;
        Ok(root)
    }

    /// Finish the session, yielding the graph and accumulated findings.
    pub fn finish(self) -> (ModuleGraph, Diagnostics) {
        (self.graph, self.diagnostics)
    }

    /// Create the node for `name` if this session has not seen it yet.
    fn instantiate(&mut self, name: &str, chain: &str) -> BuildResult<ModuleId> {
        if let Some(&id) = self.graph.by_name.get(name) {
            return Ok(id);
        }
        let descriptor = self
            .descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| BuildError::module_not_found(name, chain))?;

        let id = ModuleId(self.graph.modules.len() as u32);
        let module = self.build_node(id, descriptor)?;
        self.graph.by_name.insert(name.to_string(), id);
        self.graph.modules.push(module);
        Ok(id)
    }

    /// Materialize a node: expand path variables, resolve library
    /// references, and drop include directories that do not exist.
    fn build_node(&mut self, id: ModuleId, descriptor: Arc<ModuleDescriptor>) -> BuildResult<Module> {
        let mut libraries = Vec::new();
        let mut system_libraries = descriptor.public_system_libraries.clone();

        for library in &descriptor.public_libraries {
            let expanded = expand_path_variables(library, &descriptor, None, None)?;
            let path = PathBuf::from(&expanded);
            if !self.probe_paths || path.is_file() {
                libraries.push(path);
            } else if descriptor.prebuilt_libraries.contains(library) {
                self.diagnostics.verbose(format!(
                    "Library '{}' in module '{}' was not resolvable to a file; it is declared \
                     prebuilt and is assumed to exist at link time",
                    library, descriptor.name
                ));
                system_libraries.push(library.clone());
            } else {
                self.diagnostics.warning(format!(
                    "Library '{}' in module '{}' was not resolvable to a file; assuming it is a \
                     filename and searching system library paths for it. This is slow and \
                     dependency checking will not see it",
                    library, descriptor.name
                ));
                system_libraries.push(library.clone());
            }
        }

        let public_include_paths =
            self.filter_directories(&descriptor.public_include_paths, &descriptor)?;
        let private_include_paths =
            self.filter_directories(&descriptor.private_include_paths, &descriptor)?;
        let system_include_paths =
            self.filter_directories(&descriptor.system_include_paths, &descriptor)?;

        Ok(Module {
            id,
            descriptor,
            libraries,
            system_libraries,
            public_include_paths,
            private_include_paths,
            system_include_paths,
            public_include_path_modules: None,
            private_include_path_modules: None,
            public_dependency_modules: None,
            private_dependency_modules: None,
            dynamically_loaded_modules: None,
            binary: None,
        })
    }

    fn filter_directories(
        &mut self,
        directories: &[PathBuf],
        descriptor: &ModuleDescriptor,
    ) -> BuildResult<Vec<PathBuf>> {
        let mut filtered = Vec::new();
        for directory in directories {
            let expanded = expand_path_variables(
                &directory.to_string_lossy(),
                descriptor,
                None,
                None,
            )?;
            let directory = PathBuf::from(expanded);
            if !self.probe_paths || directory.is_dir() {
                filtered.push(directory);
            } else if self.warned_missing_dirs.insert(directory.clone()) {
                self.diagnostics.warning(format!(
                    "{}: referenced directory '{}' does not exist",
                    descriptor.name,
                    directory.display()
                ));
            }
        }
        Ok(filtered)
    }

    /// Resolve all of a module's dependency lists, recursively.
    fn wire(&mut self, id: ModuleId, chain: &str, stack: &mut Vec<ModuleId>) -> BuildResult<()> {
        let descriptor = self.graph[id].descriptor.clone();
        let next_chain = format!("{} -> {}", chain, descriptor.name);

        // A module that has started resolving and is already on the stack
        // was reached through a cycle.
        let check_for_cycles =
            self.graph[id].private_include_path_modules.is_some() && stack.contains(&id);

        stack.push(id);

        if check_for_cycles {
            self.check_cycle_confessed(stack, &next_chain)?;
        }

        // Include-path modules expose headers only; the restricted
        // recursion never pulls in their dependency lists.
        self.wire_public_include_path_modules(id, &next_chain)?;

        if self.graph[id].private_include_path_modules.is_none() {
            // Mark resolution as started before recursing so re-entrant
            // visits through a cycle take the confession path above.
            self.graph.modules[id.index()].private_include_path_modules = Some(Vec::new());

            let private_include = self.wire_include_path_list(
                &descriptor.private_include_path_modules,
                &next_chain,
            )?;
            self.graph.modules[id.index()].private_include_path_modules = Some(private_include);

            let public_deps =
                self.wire_dependency_list(&descriptor.public_dependencies, &next_chain, stack)?;
            self.graph.modules[id.index()].public_dependency_modules = Some(public_deps);

            let private_deps =
                self.wire_dependency_list(&descriptor.private_dependencies, &next_chain, stack)?;
            self.graph.modules[id.index()].private_dependency_modules = Some(private_deps);

            // Runtime-loaded modules are not build-order references, so
            // they start from a fresh stack.
            let mut fresh_stack = Vec::new();
            let dynamic = self.wire_dependency_list(
                &descriptor.dynamically_loaded,
                &next_chain,
                &mut fresh_stack,
            )?;
            self.graph.modules[id.index()].dynamically_loaded_modules = Some(dynamic);
        }

        stack.pop();
        Ok(())
    }

    fn wire_dependency_list(
        &mut self,
        names: &[String],
        chain: &str,
        stack: &mut Vec<ModuleId>,
    ) -> BuildResult<Vec<ModuleId>> {
        let mut modules = Vec::new();
        for name in names {
            let dependency = self.instantiate(name, chain)?;
            if !modules.contains(&dependency) {
                self.wire(dependency, chain, stack)?;
                modules.push(dependency);
            }
        }
        Ok(modules)
    }

    fn wire_public_include_path_modules(
        &mut self,
        id: ModuleId,
        chain: &str,
    ) -> BuildResult<()> {
        if self.graph[id].public_include_path_modules.is_some() {
            return Ok(());
        }
        // Set immediately so cycles among include-path modules terminate.
        self.graph.modules[id.index()].public_include_path_modules = Some(Vec::new());

        let names = self.graph[id].descriptor.public_include_path_modules.clone();
        let list = self.wire_include_path_list(&names, chain)?;
        self.graph.modules[id.index()].public_include_path_modules = Some(list);
        Ok(())
    }

    fn wire_include_path_list(
        &mut self,
        names: &[String],
        chain: &str,
    ) -> BuildResult<Vec<ModuleId>> {
        let mut modules = Vec::new();
        for name in names {
            let module = self.instantiate(name, chain)?;
            self.wire_public_include_path_modules(module, chain)?;
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        Ok(modules)
    }

    /// The repeated module sits at the top of the stack. Walk the chain
    /// looking for a module that declared the edge to its successor; if
    /// none did, the cycle is a fatal configuration error.
    fn check_cycle_confessed(&mut self, stack: &[ModuleId], route: &str) -> BuildResult<()> {
        let Some(&repeated) = stack.last() else {
            return Ok(());
        };

        for window in stack.windows(2) {
            let referrer = &self.graph[window[0]];
            let target = &self.graph[window[1]];
            if referrer.descriptor.confesses_cycle_on(target.name()) {
                let message = format!(
                    "Found circular reference to '{}', but '{}' declares a cycle on '{}' which \
                     breaks the chain",
                    self.graph[repeated].name(),
                    referrer.name(),
                    target.name()
                );
                self.diagnostics.verbose(message);
                return Ok(());
            }
        }

        let first = stack.iter().position(|&m| m == repeated).unwrap_or(0);
        let names = |ids: &[ModuleId]| {
            ids.iter()
                .map(|&m| self.graph[m].name().to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        };
        Err(BuildError::CircularDependency {
            module: self.graph[repeated].name().to_string(),
            route: route.to_string(),
            cycle: names(&stack[first..]),
        })
    }
}
