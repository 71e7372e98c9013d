//! Link environment resolution
//!
//! Computes, per output binary, the transitive closure of libraries and
//! frameworks that must be linked, plus the binary-level dependency
//! edges used for build ordering and deployment.
//!
//! Ordering contract: link inputs are appended in the first-encountered
//! order of a depth-first walk over the authored dependency lists.
//! Duplicates across modules are preserved; consumers may collapse them
//! but must keep the relative order of first appearances, since some
//! linkers resolve symbols in input order. Reordering an authored
//! dependency list is therefore a semantic change.

use crate::binary::{BinaryId, BinaryKind, BinarySet};
use crate::error::{BuildError, BuildResult};
use crate::graph::{expand_path_variables, ModuleGraph, ModuleId};
use girder_module::{ModuleKind, TargetConfig};
use std::collections::HashSet;
use std::path::PathBuf;

/// Resolved link inputs for one binary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkEnvironment {
    /// Libraries linked by path.
    pub libraries: Vec<PathBuf>,
    /// Directories searched for system libraries.
    pub system_library_paths: Vec<PathBuf>,
    /// Libraries resolved by the linker's search paths.
    pub system_libraries: Vec<String>,
    /// Runtime search paths, with `$(...)` variables expanded.
    pub runtime_library_paths: Vec<String>,
    pub frameworks: Vec<String>,
    pub weak_frameworks: Vec<String>,
    pub delay_load_dlls: Vec<String>,
}

/// A binary's link environment plus the binary dependencies it induces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedBinaryLink {
    pub environment: LinkEnvironment,
    /// Other binaries this binary depends on, in first-encountered
    /// order. Consumed for build ordering and copy-on-deploy decisions.
    pub binary_dependencies: Vec<BinaryId>,
}

/// Resolves private link environments against a bound module graph.
pub struct LinkEnvironmentResolver<'a> {
    graph: &'a ModuleGraph,
    binaries: &'a BinarySet,
    target: &'a TargetConfig,
}

impl<'a> LinkEnvironmentResolver<'a> {
    pub fn new(graph: &'a ModuleGraph, binaries: &'a BinarySet, target: &'a TargetConfig) -> Self {
        Self {
            graph,
            binaries,
            target,
        }
    }

    /// Compute the link environment for one binary.
    pub fn compute_private_link_environment(
        &self,
        binary: BinaryId,
    ) -> BuildResult<ResolvedBinaryLink> {
        let mut resolved = ResolvedBinaryLink::default();
        let mut visited = HashSet::new();

        // Modules were assigned in binding order; walking them in that
        // order keeps the result deterministic.
        for &module in &self.binaries[binary].modules {
            self.setup_private_link_environment(module, binary, &mut resolved, &mut visited)?;
        }
        Ok(resolved)
    }

    fn setup_private_link_environment(
        &self,
        module: ModuleId,
        source_binary: BinaryId,
        resolved: &mut ResolvedBinaryLink,
        visited: &mut HashSet<ModuleId>,
    ) -> BuildResult<()> {
        self.setup_public_link_environment(module, source_binary, resolved, visited)?;

        // The module's own public and private dependencies contribute
        // their public link settings.
        for dependency in self.graph[module].link_dependencies() {
            self.setup_public_link_environment(dependency, source_binary, resolved, visited)?;
        }
        Ok(())
    }

    fn setup_public_link_environment(
        &self,
        id: ModuleId,
        source_binary: BinaryId,
        resolved: &mut ResolvedBinaryLink,
        visited: &mut HashSet<ModuleId>,
    ) -> BuildResult<()> {
        let module = &self.graph[id];

        // Binding is allowed to leave modules out, but asking the linker
        // to process one is a configuration error.
        if module.kind() != ModuleKind::External && module.binary().is_none() {
            return Err(BuildError::unbound_module(
                module.name(),
                &self.binaries[source_binary].name,
            ));
        }

        // Compile-time dependencies may be circular; never re-enter.
        if !visited.insert(id) {
            return Ok(());
        }

        if let Some(module_binary) = module.binary() {
            if module_binary != source_binary
                && !resolved.binary_dependencies.contains(&module_binary)
            {
                resolved.binary_dependencies.push(module_binary);
            }

            // Static libraries do not carry their dependencies' symbols.
            // When this module lives in a static library other than the
            // binary being linked, its dependencies' link settings must
            // be pulled through into the consumer, recursively, until a
            // module outside static-library territory is reached.
            let building_static_library =
                self.binaries[source_binary].kind == BinaryKind::StaticLibrary;
            let module_in_static_library =
                self.binaries[module_binary].kind == BinaryKind::StaticLibrary;
            if !building_static_library && module_in_static_library {
                for dependency in module.link_dependencies() {
                    let dependency_module = &self.graph[dependency];
                    let external = dependency_module.kind() == ModuleKind::External;
                    let in_static_library = dependency_module
                        .binary()
                        .map(|b| self.binaries[b].kind == BinaryKind::StaticLibrary)
                        .unwrap_or(false);
                    if external || in_static_library {
                        self.setup_public_link_environment(
                            dependency,
                            source_binary,
                            resolved,
                            visited,
                        )?;
                    }
                }
            }
        }

        // A module that lives in its own dynamic or executable binary is
        // satisfied by the binary dependency edge alone; appending its
        // inputs here would duplicate them into every consumer.
        let contributes_link_inputs = match module.binary() {
            None => true,
            Some(binary) if binary == source_binary => true,
            Some(binary) => self.binaries[binary].kind == BinaryKind::StaticLibrary,
        };
        if !contributes_link_inputs {
            return Ok(());
        }

        // Append this module's own public link inputs.
        let environment = &mut resolved.environment;
        environment.libraries.extend(module.libraries.iter().cloned());
        environment
            .system_library_paths
            .extend(module.descriptor().public_system_library_paths.iter().cloned());
        environment
            .system_libraries
            .extend(module.system_libraries.iter().cloned());
        for path in &module.descriptor().public_runtime_library_paths {
            let expanded = expand_path_variables(
                path,
                module.descriptor(),
                Some(&self.binaries[source_binary].output_dir),
                Some(&self.target.output_dir),
            )?;
            environment.runtime_library_paths.push(expanded);
        }
        environment
            .frameworks
            .extend(module.descriptor().public_frameworks.iter().cloned());
        environment
            .weak_frameworks
            .extend(module.descriptor().public_weak_frameworks.iter().cloned());
        environment
            .delay_load_dlls
            .extend(module.descriptor().public_delay_load_dlls.iter().cloned());
        Ok(())
    }
}
