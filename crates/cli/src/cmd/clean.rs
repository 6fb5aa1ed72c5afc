use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use iospack_lib::pipeline;

use super::load_config;
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct CleanSummary {
  removed: Vec<PathBuf>,
}

pub fn cmd_clean(config_path: &Path, output: OutputFormat) -> Result<()> {
  let config = load_config(config_path)?;
  let removed = pipeline::clean(&config).context("Failed to clean build output")?;

  if output.is_json() {
    return print_json(&CleanSummary { removed });
  }

  if removed.is_empty() {
    print_info("Nothing to clean");
  } else {
    print_success("Clean complete!");
    for dir in &removed {
      print_stat("Removed", &dir.display().to_string());
    }
  }

  Ok(())
}
