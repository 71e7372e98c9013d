//! Resolution-phase orchestration
//!
//! Ties the pieces together the way a build invocation uses them: load
//! and validate descriptors, resolve the graph from the target's root
//! module, bind binaries, then materialize every compile and link
//! environment. Environments are pure functions of the frozen graph, so
//! they are computed in parallel; graph construction itself stays
//! single-threaded.

use crate::binary::{BinaryBinder, BinarySet};
use crate::build_order::BuildOrder;
use crate::compile_env::{CompileEnvironment, CompileEnvironmentResolver};
use crate::diagnostics::Diagnostics;
use crate::error::{BuildError, BuildResult};
use crate::graph::{GraphBuilder, ModuleGraph, ModuleId};
use crate::link_env::{LinkEnvironmentResolver, ResolvedBinaryLink};
use girder_module::{LinkType, ModuleDescriptor, ModuleKind, TargetConfig, Validator};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Name of the per-module descriptor file.
pub const DESCRIPTOR_FILE_NAME: &str = "girder.toml";

/// Statistics from one resolution run
#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    pub module_count: usize,
    pub binary_count: usize,
    /// Time spent building and binding the graph.
    pub resolution_time: Duration,
    /// Time spent materializing compile and link environments.
    pub environment_time: Duration,
    pub total_time: Duration,
}

/// Result of a successful resolution phase
#[derive(Debug)]
pub struct ResolvedTarget {
    pub target: TargetConfig,
    pub graph: ModuleGraph,
    pub binaries: BinarySet,
    /// Sequential module build order, dependencies first.
    pub build_order: Vec<ModuleId>,
    /// Private compile environment for every module assigned to a binary.
    pub compile_environments: HashMap<ModuleId, CompileEnvironment>,
    /// Link environment per binary, aligned with binary id order.
    pub link_environments: Vec<ResolvedBinaryLink>,
    pub stats: PlanStats,
    pub diagnostics: Diagnostics,
}

/// Orchestrates the resolution phase for one target.
pub struct TargetPlanner {
    descriptors: Vec<ModuleDescriptor>,
    target: TargetConfig,
    root_module: String,
    /// Modular targets: modules that get a dynamic library of their own.
    /// Empty means every reachable compiled module.
    dynamic_modules: Vec<String>,
    probe_paths: bool,
    verbose: bool,
}

impl TargetPlanner {
    pub fn new(
        descriptors: Vec<ModuleDescriptor>,
        target: TargetConfig,
        root_module: impl Into<String>,
    ) -> Self {
        Self {
            descriptors,
            target,
            root_module: root_module.into(),
            dynamic_modules: Vec::new(),
            probe_paths: true,
            verbose: false,
        }
    }

    /// Restrict which modules get their own dynamic library in a modular
    /// layout.
    pub fn with_dynamic_modules(mut self, modules: Vec<String>) -> Self {
        self.dynamic_modules = modules;
        self
    }

    /// Enable/disable filesystem probing of library and include paths.
    pub fn with_path_probing(mut self, probe_paths: bool) -> Self {
        self.probe_paths = probe_paths;
        self
    }

    /// Enable/disable progress output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run the resolution phase.
    pub fn plan(self) -> BuildResult<ResolvedTarget> {
        let Self {
            descriptors,
            target,
            root_module,
            dynamic_modules,
            probe_paths,
            verbose,
        } = self;
        let plan_start = Instant::now();

        if let Err(errors) = Validator::validate(&descriptors) {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(BuildError::InvalidDescriptors(joined));
        }

        if verbose {
            println!(
                "Resolving target '{}' ({} descriptors)",
                target.name,
                descriptors.len()
            );
        }

        // Graph construction and binding.
        let resolution_start = Instant::now();
        let mut builder = GraphBuilder::new(descriptors).with_path_probing(probe_paths);
        let root = builder.resolve(&root_module)?;
        let (mut graph, diagnostics) = builder.finish();

        let binaries = match target.link_type {
            LinkType::Monolithic => BinaryBinder::bind_monolithic(&mut graph, &target, root)?,
            LinkType::Modular => {
                let dynamic = resolve_dynamic_modules(&dynamic_modules, &graph, root)?;
                BinaryBinder::bind_modular(&mut graph, &target, root, &dynamic)?
            }
        };
        let build_order = BuildOrder::new(&graph).compute_build_order()?;
        let resolution_time = resolution_start.elapsed();

        if verbose {
            println!(
                "Resolved {} modules into {} binaries in {:.2}s",
                graph.len(),
                binaries.len(),
                resolution_time.as_secs_f64()
            );
        }

        // Environments are pure functions of the frozen graph; compute
        // them in parallel.
        let environment_start = Instant::now();
        let compile_resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let compiled_modules: Vec<ModuleId> = binaries
            .iter()
            .flat_map(|binary| binary.modules.iter().copied())
            .collect();
        let compile_environments: HashMap<ModuleId, CompileEnvironment> = compiled_modules
            .par_iter()
            .map(|&module| {
                (
                    module,
                    compile_resolver.compute_private_compile_environment(module),
                )
            })
            .collect();

        let link_resolver = LinkEnvironmentResolver::new(&graph, &binaries, &target);
        let link_environments: Vec<ResolvedBinaryLink> = binaries
            .binary_ids()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|&binary| link_resolver.compute_private_link_environment(binary))
            .collect::<BuildResult<Vec<_>>>()?;
        let environment_time = environment_start.elapsed();

        let stats = PlanStats {
            module_count: graph.len(),
            binary_count: binaries.len(),
            resolution_time,
            environment_time,
            total_time: plan_start.elapsed(),
        };

        if verbose {
            println!(
                "Materialized {} compile and {} link environments in {:.2}s",
                compile_environments.len(),
                link_environments.len(),
                environment_time.as_secs_f64()
            );
        }

        Ok(ResolvedTarget {
            target,
            graph,
            binaries,
            build_order,
            compile_environments,
            link_environments,
            stats,
            diagnostics,
        })
    }
}

/// Modules receiving their own dynamic library in a modular layout.
fn resolve_dynamic_modules(
    dynamic_modules: &[String],
    graph: &ModuleGraph,
    root: ModuleId,
) -> BuildResult<Vec<ModuleId>> {
    if dynamic_modules.is_empty() {
        return Ok(graph
            .all_dependencies(root, true, false)
            .into_iter()
            .filter(|&m| graph[m].kind() != ModuleKind::External)
            .collect());
    }
    dynamic_modules
        .iter()
        .map(|name| {
            graph
                .find(name)
                .ok_or_else(|| BuildError::module_not_found(name, "modular layout"))
        })
        .collect()
}

/// Find every descriptor file under `root`.
///
/// Descriptors are returned sorted by module name so downstream digests
/// and reports do not depend on directory iteration order.
pub fn discover_descriptors(root: &Path) -> BuildResult<Vec<ModuleDescriptor>> {
    let mut descriptors = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| BuildError::descriptor_read(root, e))?;
        if entry.file_type().is_file() && entry.file_name() == DESCRIPTOR_FILE_NAME {
            let descriptor = ModuleDescriptor::from_file(entry.path())
                .map_err(|e| BuildError::descriptor_read(entry.path(), e))?;
            descriptors.push(descriptor);
        }
    }
    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(descriptors)
}
