//! Resolve command - plan a target and print its build order and stats

use super::{plan_target, print_diagnostics, TargetArgs};
use anyhow::Result;
use colored::Colorize;

pub fn run(args: TargetArgs, json: bool) -> Result<()> {
    let resolved = plan_target(&args)?;
    print_diagnostics(&resolved, args.verbose);

    if json {
        let order: Vec<&str> = resolved
            .build_order
            .iter()
            .map(|&m| resolved.graph[m].name())
            .collect();
        let binaries: Vec<String> = resolved
            .binaries
            .iter()
            .map(|b| b.output_path().display().to_string())
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "target": resolved.target.name,
                "link_type": resolved.target.link_type.to_string(),
                "modules": resolved.stats.module_count,
                "binaries": binaries,
                "build_order": order,
                "warnings": resolved.diagnostics.warning_count(),
                "resolution_time": resolved.stats.resolution_time.as_secs_f64(),
                "total_time": resolved.stats.total_time.as_secs_f64(),
            })
        );
        return Ok(());
    }

    println!(
        "{} '{}' ({})",
        "Resolved target".green().bold(),
        resolved.target.name,
        resolved.target.link_type
    );
    println!(
        "  {} modules across {} binaries",
        resolved.stats.module_count,
        resolved.binaries.len()
    );

    println!("\nBuild order:");
    for &module in &resolved.build_order {
        let module = &resolved.graph[module];
        let binary = module
            .binary()
            .map(|b| resolved.binaries[b].name.clone())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<32} -> {}", module.name(), binary);
    }

    println!("\nBinaries:");
    for binary in resolved.binaries.iter() {
        println!(
            "  {} ({}, {} modules)",
            binary.output_path().display(),
            binary.kind,
            binary.modules.len()
        );
    }

    println!(
        "\nResolution took {:.2}s ({} warnings)",
        resolved.stats.total_time.as_secs_f64(),
        resolved.diagnostics.warning_count()
    );
    Ok(())
}
