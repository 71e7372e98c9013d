pub mod check;
pub mod graph;
pub mod resolve;

use anyhow::{Context, Result};
use colored::Colorize;
use girder_build::{discover_descriptors, ResolvedTarget, Severity, TargetPlanner};
use girder_module::{LinkType, TargetConfig};
use std::path::PathBuf;

/// Target selection shared by the resolve and graph commands
#[derive(clap::Args)]
pub struct TargetArgs {
    /// Root directory searched for girder.toml descriptors
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Root module of the target
    #[arg(long, short = 'm')]
    pub module: String,

    /// Target name (defaults to the root module name)
    #[arg(long)]
    pub name: Option<String>,

    /// Spread modules across dynamic libraries instead of one binary
    #[arg(long)]
    pub modular: bool,

    /// Modules that get a dynamic library of their own (with --modular;
    /// default is every reachable module)
    #[arg(long = "dll", value_name = "MODULE")]
    pub dlls: Vec<String>,

    /// Compile a monolithic target as a dynamic library
    #[arg(long)]
    pub compile_as_dll: bool,

    /// The target exports symbols
    #[arg(long)]
    pub exports: bool,

    /// Output directory for binaries
    #[arg(long, default_value = "target")]
    pub output_dir: PathBuf,

    /// Skip filesystem checks for library and include references
    #[arg(long)]
    pub no_probe: bool,

    /// Verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl TargetArgs {
    fn target_config(&self) -> TargetConfig {
        let link_type = if self.modular {
            LinkType::Modular
        } else {
            LinkType::Monolithic
        };
        let name = self.name.clone().unwrap_or_else(|| self.module.clone());
        TargetConfig::new(name, link_type)
            .with_compile_as_dll(self.compile_as_dll)
            .with_exports(self.exports)
            .with_output_dir(self.output_dir.clone())
    }
}

/// Run the resolution phase for the selected target.
pub fn plan_target(args: &TargetArgs) -> Result<ResolvedTarget> {
    let descriptors = discover_descriptors(&args.root)
        .with_context(|| format!("Failed to load descriptors under {}", args.root.display()))?;
    if descriptors.is_empty() {
        anyhow::bail!("No girder.toml descriptors found under {}", args.root.display());
    }

    let resolved = TargetPlanner::new(descriptors, args.target_config(), args.module.clone())
        .with_dynamic_modules(args.dlls.clone())
        .with_path_probing(!args.no_probe)
        .with_verbose(args.verbose)
        .plan()
        .context("Resolution failed")?;
    Ok(resolved)
}

/// Surface accumulated findings once, after the phase completed.
pub fn print_diagnostics(resolved: &ResolvedTarget, verbose: bool) {
    for diagnostic in resolved.diagnostics.iter() {
        match diagnostic.severity {
            Severity::Warning => {
                eprintln!("{} {}", "warning:".yellow().bold(), diagnostic.message);
            }
            Severity::Verbose if verbose => {
                eprintln!("{} {}", "verbose:".dimmed(), diagnostic.message);
            }
            Severity::Verbose => {}
        }
    }
}
