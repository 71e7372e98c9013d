//! Graph command - export the resolved graph as JSON

use super::{plan_target, print_diagnostics, TargetArgs};
use anyhow::{Context, Result};
use girder_build::GraphExport;

pub fn run(args: TargetArgs) -> Result<()> {
    let resolved = plan_target(&args)?;
    print_diagnostics(&resolved, args.verbose);

    let export = GraphExport::new(
        &resolved.graph,
        &resolved.binaries,
        &resolved.link_environments,
        &resolved.target,
    )
    .context("Failed to build graph export")?;
    println!("{}", export.to_json_string()?);
    Ok(())
}
