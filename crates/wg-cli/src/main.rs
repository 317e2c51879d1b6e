//! CLI frontend for inspecting persisted world graph documents.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "wg",
    about = "Inspect interactive-fiction world graphs saved as JSON",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a small sample world to a new file
    Demo {
        /// Where to write the world document
        path: PathBuf,
    },

    /// Count entities by kind
    Stats {
        /// World document to read
        #[arg(short, long, default_value = "world.json")]
        file: PathBuf,
    },

    /// Print the containment tree
    Tree {
        /// Only show the subtree under this entity (ID or name)
        #[arg(short, long)]
        root: Option<String>,

        /// World document to read
        #[arg(short, long, default_value = "world.json")]
        file: PathBuf,
    },

    /// Show what an entity can see and what it knows is around
    Look {
        /// Observer (ID or name)
        observer: String,

        /// World document to read
        #[arg(short, long, default_value = "world.json")]
        file: PathBuf,
    },

    /// Find the doors between two rooms
    Path {
        /// Starting room (ID or name)
        from: String,

        /// Destination room (ID or name)
        to: String,

        /// World document to read
        #[arg(short, long, default_value = "world.json")]
        file: PathBuf,
    },

    /// Check the containment index for inconsistencies
    Check {
        /// World document to read
        #[arg(short, long, default_value = "world.json")]
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo { path } => commands::demo::run(&path),
        Commands::Stats { file } => commands::stats::run(&file),
        Commands::Tree { root, file } => commands::tree::run(&file, root.as_deref()),
        Commands::Look { observer, file } => commands::look::run(&file, &observer),
        Commands::Path { from, to, file } => commands::path::run(&file, &from, &to),
        Commands::Check { file } => commands::check::run(&file),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
