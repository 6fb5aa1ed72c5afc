//! Implementation of the `iospack build` command.
//!
//! Declares every pipeline step into a recording graph, then hands the graph
//! to the executor, which runs only the actions whose inputs changed since
//! the previous build.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use iospack_lib::execute::{ExecuteConfig, ExecutionResult, execute_graph};

use super::{declare_pipeline, load_config};
use crate::output::{
  OutputFormat, format_duration, print_error, print_failed_action, print_json, print_skipped_action, print_stat,
  print_success,
};

#[derive(Debug, Serialize)]
struct BuildSummary {
  product: String,
  build_dir: PathBuf,
  actions: usize,
  executed: Vec<String>,
  up_to_date: usize,
  failed: Vec<FailedAction>,
  skipped: Vec<SkippedAction>,
  relinked: Option<PathBuf>,
  duration_ms: u128,
}

#[derive(Debug, Serialize)]
struct FailedAction {
  label: String,
  error: String,
}

#[derive(Debug, Serialize)]
struct SkippedAction {
  label: String,
  failed_dependency: String,
}

impl BuildSummary {
  fn new(product: String, build_dir: PathBuf, actions: usize, result: &ExecutionResult) -> Self {
    Self {
      product,
      build_dir,
      actions,
      executed: result.executed.clone(),
      up_to_date: result.up_to_date.len(),
      failed: result
        .failed
        .iter()
        .map(|(label, e)| FailedAction {
          label: label.clone(),
          error: e.to_string(),
        })
        .collect(),
      skipped: result
        .skipped
        .iter()
        .map(|(label, dep)| SkippedAction {
          label: label.clone(),
          failed_dependency: dep.clone(),
        })
        .collect(),
      relinked: None,
      duration_ms: 0,
    }
  }
}

pub fn cmd_build(config_path: &Path, force: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let config = load_config(config_path)?;
  let (state, graph) = declare_pipeline(&config)?;
  info!(actions = graph.len(), "pipeline declared");

  let build_dir = config.paths.build_dir.clone();
  let mut exec_config = ExecuteConfig::for_build_dir(&build_dir);
  exec_config.force = force;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(execute_graph(&graph, &exec_config))
    .context("Failed to execute build graph")?;

  let mut summary = BuildSummary::new(state.product_name.clone(), build_dir, graph.len(), &result);
  summary.relinked = state.relinked.as_ref().map(|r| r.deployed.clone());
  summary.duration_ms = start.elapsed().as_millis();

  if output.is_json() {
    print_json(&summary)?;
  } else {
    println!();
    if result.is_success() {
      print_success("Build complete!");
    } else {
      print_error("Build failed");
    }
    print_stat("Product", &summary.product);
    print_stat("Build dir", &summary.build_dir.display().to_string());
    print_stat("Actions", &summary.actions.to_string());
    print_stat("Executed", &summary.executed.len().to_string());
    print_stat("Up to date", &summary.up_to_date.to_string());
    if let Some(relinked) = &summary.relinked {
      print_stat("Relinked", &relinked.display().to_string());
    }
    print_stat("Duration", &format_duration(start.elapsed()));

    for failed in &summary.failed {
      print_failed_action(&failed.label, &failed.error);
    }
    for skipped in &summary.skipped {
      print_skipped_action(&skipped.label, &skipped.failed_dependency);
    }
  }

  if !result.is_success() {
    bail!(
      "{} action(s) failed, {} skipped",
      result.failed.len(),
      result.skipped.len()
    );
  }

  Ok(())
}
