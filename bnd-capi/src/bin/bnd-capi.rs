//! CLI entry point for bnd-capi.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// bnd-capi: generate a C API for C++ classes.
#[derive(Parser, Debug)]
#[command(name = "bnd-capi", version, about)]
struct Cli {
    /// Path to the bnd-capi.toml configuration file.
    #[arg(default_value = "bnd-capi.toml")]
    config: PathBuf,

    /// Output directory (defaults to the config file's directory).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bnd_capi=info")),
        )
        .init();

    let cli = Cli::parse();
    bnd_capi::run(&cli.config, cli.output.as_deref())?;
    Ok(())
}
