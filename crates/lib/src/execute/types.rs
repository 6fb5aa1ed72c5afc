//! Types for action execution.
//!
//! This module defines the error types, result types, and configuration
//! for executing a recorded action graph.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::hash::{HashError, InputHashError};

/// Errors that can occur during action execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A declared input did not exist when the action was about to run.
  #[error("missing input artifact for '{action}': {path}")]
  MissingInputArtifact { action: String, path: PathBuf },

  /// A declared output was not produced by the action.
  #[error("action '{action}' did not write declared output {path}")]
  OutputNotWritten { action: String, path: PathBuf },

  /// Command execution failed.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Hashing inputs for the incremental signature failed.
  #[error("failed to hash inputs: {0}")]
  Hash(#[from] InputHashError),

  /// Serializing an action for its identity failed.
  #[error("failed to compute action identity: {0}")]
  Identity(#[from] HashError),

  /// An explicit dependency names an output no action produces.
  #[error("dependency references unknown output: {0}")]
  UnknownDependency(PathBuf),

  /// Cycle detected in the dependency graph.
  #[error("dependency cycle detected")]
  CycleDetected,

  /// The persisted signature cache could not be read or written.
  #[error("action state error: {0}")]
  State(String),

  /// The task running an action panicked or was cancelled.
  #[error("action task aborted: {0}")]
  TaskAborted(String),

  /// An upstream action failed, so this one was not run.
  #[error("dependency failed: {0}")]
  DependencyFailed(String),
}

/// How a single action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
  /// The command ran.
  Executed,
  /// Inputs and outputs matched the previous run; nothing ran.
  UpToDate,
}

/// Result of executing the whole graph.
#[derive(Debug, Default)]
pub struct ExecutionResult {
  /// Labels of actions whose command ran, in completion order.
  pub executed: Vec<String>,

  /// Labels of actions skipped because they were up to date.
  pub up_to_date: Vec<String>,

  /// Actions that failed, with their error.
  pub failed: Vec<(String, ExecuteError)>,

  /// Actions not run because a dependency failed: (label, failed dependency label).
  pub skipped: Vec<(String, String)>,
}

impl ExecutionResult {
  /// Returns true if no action failed or was skipped.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  /// Returns the total number of actions processed.
  pub fn total(&self) -> usize {
    self.executed.len() + self.up_to_date.len() + self.failed.len() + self.skipped.len()
  }
}

/// Configuration for graph execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of actions to execute in parallel.
  pub parallelism: usize,

  /// Directory holding the persisted action signatures.
  pub state_dir: PathBuf,

  /// Ignore cached signatures and run every action.
  pub force: bool,

  /// Working directory for exec actions without an explicit `cwd`.
  pub working_dir: PathBuf,
}

impl ExecuteConfig {
  /// Configuration rooted at a build directory.
  pub fn for_build_dir(build_dir: impl Into<PathBuf>) -> Self {
    let build_dir = build_dir.into();
    Self {
      parallelism: num_cpus(),
      state_dir: build_dir.join(crate::consts::STATE_DIR),
      force: false,
      working_dir: build_dir,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn execution_result_success_when_empty() {
    let result = ExecutionResult::default();
    assert!(result.is_success());
    assert_eq!(result.total(), 0);
  }

  #[test]
  fn execution_result_up_to_date_is_success() {
    let result = ExecutionResult {
      up_to_date: vec!["Copy a".to_string()],
      ..Default::default()
    };
    assert!(result.is_success());
    assert_eq!(result.total(), 1);
  }

  #[test]
  fn execution_result_failure_with_failed_action() {
    let result = ExecutionResult {
      failed: vec![(
        "link".to_string(),
        ExecuteError::CmdFailed {
          cmd: "clang".to_string(),
          code: Some(1),
        },
      )],
      ..Default::default()
    };
    assert!(!result.is_success());
    assert_eq!(result.total(), 1);
  }

  #[test]
  fn execution_result_failure_with_skipped_action() {
    let result = ExecutionResult {
      skipped: vec![("deploy".to_string(), "link".to_string())],
      ..Default::default()
    };
    assert!(!result.is_success());
  }

  #[test]
  fn config_for_build_dir() {
    let config = ExecuteConfig::for_build_dir("/tmp/build");
    assert!(config.parallelism >= 1);
    assert!(!config.force);
    assert_eq!(config.state_dir, PathBuf::from("/tmp/build/.iospack"));
    assert_eq!(config.working_dir, PathBuf::from("/tmp/build"));
  }
}
