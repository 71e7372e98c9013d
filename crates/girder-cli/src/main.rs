use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;

/// Girder module graph resolver.
///
/// Girder resolves a tree of module descriptors (girder.toml files) into
/// a module graph, assigns modules to output binaries, and computes the
/// compile and link environments an external toolchain consumes.
///
/// EXAMPLES:
///     girder resolve -m Game              Resolve a target and print its plan
///     girder resolve -m Game --modular    One dynamic library per module
///     girder graph -m Game                Export the resolved graph as JSON
///     girder check                        Validate descriptors only
#[derive(Parser)]
#[command(name = "girder")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a target and print its build plan
    ///
    /// Loads every descriptor under the root directory, resolves the
    /// module graph from the given root module, binds binaries, and
    /// prints the build order and statistics.
    #[command(visible_alias = "r")]
    Resolve {
        #[command(flatten)]
        target: commands::TargetArgs,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the resolved module graph as JSON
    ///
    /// The export is a read-only snapshot of the resolved data model for
    /// project generators and deployment tooling.
    #[command(visible_alias = "g")]
    Graph {
        #[command(flatten)]
        target: commands::TargetArgs,
    },

    /// Validate the descriptor set without resolving a target
    #[command(visible_alias = "c")]
    Check {
        /// Root directory searched for girder.toml descriptors
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Resolve { target, json } => commands::resolve::run(target, json),
        Commands::Graph { target } => commands::graph::run(target),
        Commands::Check { root } => commands::check::run(&root),
    };

    if let Err(error) = result {
        eprintln!("{} {:#}", "error:".red().bold(), error);
        std::process::exit(1);
    }
}
