//! Girder module graph resolution
//!
//! The core of the girder build system:
//! - Module graph construction with declared-cycle tolerance
//! - Module-to-binary assignment
//! - Compile environment resolution (public/private visibility,
//!   import/export macros)
//! - Link environment resolution (static-library pull-through, binary
//!   dependency edges)
//! - Build order computation and graph export for downstream tooling

pub mod binary;
pub mod build_order;
pub mod compile_env;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod graph;
pub mod link_env;
pub mod planner;

// Re-export main types
pub use binary::{unbound_references, Binary, BinaryBinder, BinaryId, BinaryKind, BinarySet};
pub use build_order::BuildOrder;
pub use compile_env::{CompileEnvironment, CompileEnvironmentResolver};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{BuildError, BuildResult};
pub use export::{BinaryExport, GraphExport, ModuleExport};
pub use graph::{expand_path_variables, GraphBuilder, Module, ModuleGraph, ModuleId};
pub use link_env::{LinkEnvironment, LinkEnvironmentResolver, ResolvedBinaryLink};
pub use planner::{
    discover_descriptors, PlanStats, ResolvedTarget, TargetPlanner, DESCRIPTOR_FILE_NAME,
};

// Re-export girder-module types for convenience
pub use girder_module::{LinkType, ModuleDescriptor, ModuleKind, TargetConfig};
