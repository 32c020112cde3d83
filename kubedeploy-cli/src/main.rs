//! kubedeploy — templated Kubernetes manifest apply.
//!
//! # Usage
//!
//! ```text
//! kubedeploy apply [-c CONFIG] [--namespace NS] [--init-template P]... [--template P]...
//!                  [--config-file TOKEN]... [--max-concurrency N] [--cancel-on-error] [--debug]
//! kubedeploy render [-c CONFIG] [--namespace NS] [--init-template P]... [--template P]...
//! ```
//!
//! Settings are read from the config file, then `PLUGIN_*` environment
//! variables, then flags.

mod commands;
mod connect;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, render::RenderArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "kubedeploy",
    version,
    about = "Render manifest templates and apply them to a Kubernetes cluster",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render templates and create or update every object.
    Apply(ApplyArgs),

    /// Render templates and print the objects without contacting the cluster.
    Render(RenderArgs),
}

/// Logs go to stderr; `RUST_LOG` overrides the level.
pub(crate) fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Apply(args) => args.run(),
        Commands::Render(args) => args.run(),
    }
}
