mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

/// iospack - incremental iOS player packaging
#[derive(Parser)]
#[command(name = "iospack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Summary format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Declare the pipeline and execute every out-of-date action
  Build {
    /// Path to the configuration file
    #[arg(default_value = "iospack.toml")]
    config: PathBuf,

    /// Run every action, ignoring cached signatures
    #[arg(short, long)]
    force: bool,
  },

  /// Show the actions the pipeline declares without running them
  Plan {
    /// Path to the configuration file
    #[arg(default_value = "iospack.toml")]
    config: PathBuf,
  },

  /// Remove previous build output
  Clean {
    /// Path to the configuration file
    #[arg(default_value = "iospack.toml")]
    config: PathBuf,
  },

  /// Install the built app on a connected device and launch it
  Run {
    /// Path to the configuration file
    #[arg(default_value = "iospack.toml")]
    config: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build { config, force } => cmd::cmd_build(&config, force, cli.output),
    Commands::Plan { config } => cmd::cmd_plan(&config, cli.verbose, cli.output),
    Commands::Clean { config } => cmd::cmd_clean(&config, cli.output),
    Commands::Run { config } => cmd::cmd_run(&config, cli.output),
  }
}
