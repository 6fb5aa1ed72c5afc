//! Action execution module.
//!
//! This module provides the dispatch logic for running a single declared action.

pub mod cmd;
pub mod copy;
pub mod write;

use std::path::Path;

use crate::action::{ActionCommand, ActionSpec};
use crate::execute::types::ExecuteError;

pub use cmd::execute_cmd;
pub use copy::execute_copy;
pub use write::execute_write;

/// Execute a single action.
///
/// Parent directories of every declared output are created first. After the
/// command finishes, every declared output must exist unless the action
/// allows extra outputs.
///
/// # Arguments
///
/// * `spec` - The action to execute
/// * `working_dir` - Working directory for exec actions without their own `cwd`
pub async fn execute_action(spec: &ActionSpec, working_dir: &Path) -> Result<(), ExecuteError> {
  for output in &spec.outputs {
    if let Some(parent) = output.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
  }

  match &spec.command {
    ActionCommand::Copy { source } => {
      let dest = single_output(spec)?;
      execute_copy(source, dest).await?;
    }
    ActionCommand::WriteText { content } => {
      let dest = single_output(spec)?;
      execute_write(dest, content).await?;
    }
    ActionCommand::Exec(opts) => {
      execute_cmd(opts, working_dir).await?;
    }
  }

  if !spec.allow_extra_outputs
    && let Some(missing) = spec.outputs.iter().find(|p| !p.exists())
  {
    return Err(ExecuteError::OutputNotWritten {
      action: spec.label.clone(),
      path: missing.clone(),
    });
  }

  Ok(())
}

fn single_output(spec: &ActionSpec) -> Result<&Path, ExecuteError> {
  spec.primary_output().ok_or_else(|| ExecuteError::OutputNotWritten {
    action: spec.label.clone(),
    path: Default::default(),
  })
}
