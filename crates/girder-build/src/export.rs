//! Read-only JSON export of the resolved data model
//!
//! A serialization of the graph and binary assignment for downstream
//! tooling (project generators, deployment). Nothing here feeds back
//! into resolution. The descriptor-set fingerprint lets consumers detect
//! a stale export without re-reading every descriptor.

use crate::binary::BinarySet;
use crate::error::BuildResult;
use crate::graph::{ModuleGraph, ModuleId};
use crate::link_env::ResolvedBinaryLink;
use girder_module::TargetConfig;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct GraphExport {
    pub target: String,
    pub link_type: String,
    /// SHA-256 over the sorted descriptor set.
    pub fingerprint: String,
    pub modules: Vec<ModuleExport>,
    pub binaries: Vec<BinaryExport>,
}

#[derive(Debug, Serialize)]
pub struct ModuleExport {
    pub name: String,
    pub kind: String,
    pub directory: PathBuf,
    pub binary: Option<String>,
    pub public_dependencies: Vec<String>,
    pub private_dependencies: Vec<String>,
    pub public_include_path_modules: Vec<String>,
    pub private_include_path_modules: Vec<String>,
    pub dynamically_loaded: Vec<String>,
    pub circular_dependencies: Vec<String>,
    pub public_include_paths: Vec<PathBuf>,
    pub private_include_paths: Vec<PathBuf>,
    pub system_include_paths: Vec<PathBuf>,
    pub public_definitions: Vec<String>,
    pub libraries: Vec<PathBuf>,
    pub system_libraries: Vec<String>,
    pub delay_load_dlls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BinaryExport {
    pub name: String,
    pub kind: String,
    pub output_path: PathBuf,
    pub modules: Vec<String>,
    /// Binaries this binary depends on; deployment copies these
    /// alongside it.
    pub binary_dependencies: Vec<String>,
    pub delay_load_dlls: Vec<String>,
}

impl GraphExport {
    /// Snapshot a resolved target. `links` is aligned with the binary
    /// set's id order.
    pub fn new(
        graph: &ModuleGraph,
        binaries: &BinarySet,
        links: &[ResolvedBinaryLink],
        target: &TargetConfig,
    ) -> BuildResult<Self> {
        let names = |ids: &[ModuleId]| -> Vec<String> {
            ids.iter().map(|&m| graph[m].name().to_string()).collect()
        };

        let modules = graph
            .modules()
            .map(|module| ModuleExport {
                name: module.name().to_string(),
                kind: module.kind().to_string(),
                directory: module.descriptor().directory.clone(),
                binary: module.binary().map(|b| binaries[b].name.clone()),
                public_dependencies: names(module.public_dependencies()),
                private_dependencies: names(module.private_dependencies()),
                public_include_path_modules: names(module.public_include_path_modules()),
                private_include_path_modules: names(module.private_include_path_modules()),
                dynamically_loaded: names(module.dynamically_loaded_modules()),
                circular_dependencies: module.descriptor().circular_dependencies.clone(),
                public_include_paths: module.public_include_paths.clone(),
                private_include_paths: module.private_include_paths.clone(),
                system_include_paths: module.system_include_paths.clone(),
                public_definitions: module.descriptor().public_definitions.clone(),
                libraries: module.libraries.clone(),
                system_libraries: module.system_libraries.clone(),
                delay_load_dlls: module.descriptor().public_delay_load_dlls.clone(),
            })
            .collect();

        let exported_binaries = binaries
            .binary_ids()
            .map(|id| {
                let binary = &binaries[id];
                let link = links.get(id.index());
                BinaryExport {
                    name: binary.name.clone(),
                    kind: binary.kind.to_string(),
                    output_path: binary.output_path(),
                    modules: names(&binary.modules),
                    binary_dependencies: link
                        .map(|l| {
                            l.binary_dependencies
                                .iter()
                                .map(|&b| binaries[b].name.clone())
                                .collect()
                        })
                        .unwrap_or_default(),
                    delay_load_dlls: link
                        .map(|l| l.environment.delay_load_dlls.clone())
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(Self {
            target: target.name.clone(),
            link_type: target.link_type.to_string(),
            fingerprint: descriptor_fingerprint(graph)?,
            modules,
            binaries: exported_binaries,
        })
    }

    pub fn to_json_string(&self) -> BuildResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// SHA-256 over the descriptor set, sorted by module name so the digest
/// is independent of resolution order.
fn descriptor_fingerprint(graph: &ModuleGraph) -> BuildResult<String> {
    let mut modules: Vec<_> = graph.modules().collect();
    modules.sort_by(|a, b| a.name().cmp(b.name()));

    let mut hasher = Sha256::new();
    for module in modules {
        hasher.update(module.name().as_bytes());
        hasher.update([0]);
        let serialized = module
            .descriptor()
            .to_toml()
            .map_err(girder_module::ModuleError::from)?;
        hasher.update(serialized.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}
