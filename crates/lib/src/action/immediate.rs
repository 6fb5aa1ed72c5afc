use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{ActionCommand, ActionGraph, ActionSpec, GraphError, RecordingGraph};

/// An [`ActionGraph`] that executes each action synchronously as soon as it
/// is declared.
///
/// Every executed action's label is appended to [`ImmediateGraph::log`], so
/// tests can assert on the order in which work happened. Declarations are
/// also validated through an inner [`RecordingGraph`], so duplicate outputs
/// are rejected exactly as in a real run.
#[derive(Debug, Default)]
pub struct ImmediateGraph {
  recorded: RecordingGraph,
  log: Vec<String>,
}

impl ImmediateGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Labels of executed actions, in execution order.
  pub fn log(&self) -> &[String] {
    &self.log
  }

  /// Everything declared so far.
  pub fn recorded(&self) -> &RecordingGraph {
    &self.recorded
  }

  fn run(spec: &ActionSpec) -> Result<(), String> {
    for input in &spec.inputs {
      if !input.exists() {
        return Err(format!("missing input artifact {}", input.display()));
      }
    }

    for output in &spec.outputs {
      if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
      }
    }

    match &spec.command {
      ActionCommand::Copy { source } => {
        let dest = single_output(spec)?;
        fs::copy(source, dest).map_err(|e| e.to_string())?;
      }
      ActionCommand::WriteText { content } => {
        let dest = single_output(spec)?;
        fs::write(dest, content).map_err(|e| e.to_string())?;
      }
      ActionCommand::Exec(opts) => {
        let mut command = Command::new(&opts.bin);
        command.args(opts.args.iter().flatten());
        for (key, value) in opts.env.iter().flatten() {
          command.env(key, value);
        }
        if let Some(cwd) = &opts.cwd {
          command.current_dir(cwd);
        }
        debug!(cmd = %opts.display(), "running action immediately");
        let status = command.status().map_err(|e| e.to_string())?;
        if !status.success() {
          return Err(format!("{} exited with {:?}", opts.bin, status.code()));
        }
      }
    }
    Ok(())
  }
}

fn single_output(spec: &ActionSpec) -> Result<&PathBuf, String> {
  spec
    .outputs
    .iter()
    .next()
    .ok_or_else(|| format!("action '{}' has no output", spec.label))
}

impl ActionGraph for ImmediateGraph {
  fn declare_action(&mut self, spec: ActionSpec) -> Result<(), GraphError> {
    let mut staged = self.recorded.clone();
    staged.declare_action(spec.clone())?;
    if staged.len() == self.recorded.len() {
      // Identical re-declaration, already executed.
      return Ok(());
    }

    Self::run(&spec).map_err(|message| GraphError::Immediate {
      label: spec.label.clone(),
      message,
    })?;
    // Only successful actions count as declared.
    self.recorded = staged;
    self.log.push(spec.label);
    Ok(())
  }

  fn declare_dependency(&mut self, downstream: &Path, upstream: &Path) -> Result<(), GraphError> {
    self.recorded.declare_dependency(downstream, upstream)
  }
}
