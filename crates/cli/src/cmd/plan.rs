//! Implementation of the `iospack plan` command.
//!
//! Runs the pipeline declaration without executing anything and lists the
//! actions it recorded.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use iospack_lib::action::{ActionCommand, ActionSpec};
use iospack_lib::pipeline::Pipeline;

use super::{declare_pipeline, load_config};
use crate::output::{OutputFormat, print_action, print_detail, print_info, print_json, print_stat};

#[derive(Debug, Serialize)]
struct PlanSummary {
  steps: Vec<&'static str>,
  build_dir: PathBuf,
  actions: Vec<PlannedAction>,
}

#[derive(Debug, Serialize)]
struct PlannedAction {
  label: String,
  kind: &'static str,
  outputs: Vec<PathBuf>,
  inputs: Vec<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  command: Option<String>,
}

impl From<&ActionSpec> for PlannedAction {
  fn from(spec: &ActionSpec) -> Self {
    let command = match &spec.command {
      ActionCommand::Copy { source } => Some(source.display().to_string()),
      ActionCommand::WriteText { .. } => None,
      ActionCommand::Exec(opts) => Some(opts.display()),
    };
    Self {
      label: spec.label.clone(),
      kind: spec.command.kind(),
      outputs: spec.outputs.iter().cloned().collect(),
      inputs: spec.inputs.iter().cloned().collect(),
      command,
    }
  }
}

pub fn cmd_plan(config_path: &Path, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = load_config(config_path)?;
  let (_, graph) = declare_pipeline(&config)?;

  let summary = PlanSummary {
    steps: Pipeline::ios_incremental().step_names(),
    build_dir: config.paths.build_dir.clone(),
    actions: graph.actions().iter().map(PlannedAction::from).collect(),
  };

  if output.is_json() {
    return print_json(&summary);
  }

  print_info(&format!("Plan: {} action(s)", summary.actions.len()));
  print_stat("Steps", &summary.steps.join(", "));
  print_stat("Build dir", &summary.build_dir.display().to_string());
  println!();

  for action in &summary.actions {
    print_action(action.kind, &action.label);
    if verbose {
      if let Some(command) = &action.command {
        print_detail(command);
      }
      for out in &action.outputs {
        print_detail(&out.display().to_string());
      }
    }
  }

  Ok(())
}
