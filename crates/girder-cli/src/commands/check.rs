//! Check command - validate the descriptor set without resolving

use anyhow::{Context, Result};
use colored::Colorize;
use girder_build::discover_descriptors;
use girder_module::Validator;
use std::path::Path;

pub fn run(root: &Path) -> Result<()> {
    let descriptors = discover_descriptors(root)
        .with_context(|| format!("Failed to load descriptors under {}", root.display()))?;

    if descriptors.is_empty() {
        anyhow::bail!("No girder.toml descriptors found under {}", root.display());
    }

    match Validator::validate(&descriptors) {
        Ok(()) => {
            println!(
                "{} {} descriptors",
                "Validated".green().bold(),
                descriptors.len()
            );
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("{} {}", "error:".red().bold(), error);
            }
            anyhow::bail!("{} validation error(s)", errors.len())
        }
    }
}
