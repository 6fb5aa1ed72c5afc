use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::Hashable;

/// Options for running an external program as part of an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecOpts {
  /// Program to run. Resolved through `PATH` when not absolute.
  pub bin: String,
  /// Arguments, passed verbatim (no shell word splitting).
  pub args: Option<Vec<String>>,
  /// Extra environment variables merged over the inherited environment.
  pub env: Option<BTreeMap<String, String>>,
  /// Working directory. Defaults to the build directory.
  pub cwd: Option<String>,
}

impl ExecOpts {
  pub fn new(bin: impl Into<String>) -> Self {
    Self {
      bin: bin.into(),
      args: None,
      env: None,
      cwd: None,
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args = Some(args.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env = Some(env);
    self
  }

  pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  /// Renders the invocation for logs and plan output.
  pub fn display(&self) -> String {
    let mut out = self.bin.clone();
    for arg in self.args.iter().flatten() {
      out.push(' ');
      if arg.contains(' ') {
        out.push_str(&format!("\"{}\"", arg));
      } else {
        out.push_str(arg);
      }
    }
    out
  }
}

impl From<&str> for ExecOpts {
  fn from(bin: &str) -> Self {
    ExecOpts::new(bin)
  }
}

/// What an action does when the executor runs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCommand {
  /// Copy a single file to the action's only output.
  Copy { source: PathBuf },
  /// Write literal text to the action's only output.
  WriteText { content: String },
  /// Run an external program that produces the declared outputs.
  Exec(ExecOpts),
}

impl ActionCommand {
  pub fn kind(&self) -> &'static str {
    match self {
      ActionCommand::Copy { .. } => "copy",
      ActionCommand::WriteText { .. } => "write",
      ActionCommand::Exec(_) => "exec",
    }
  }
}

/// A declarative file action: the executor runs `command` to turn `inputs`
/// into `outputs`, and re-runs it only when an input changed or an output is
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSpec {
  /// Human readable label shown in logs and plans.
  pub label: String,
  /// Files (or directories) this action produces.
  pub outputs: BTreeSet<PathBuf>,
  /// Files (or directories) this action reads.
  pub inputs: BTreeSet<PathBuf>,
  pub command: ActionCommand,
  /// Outputs are directories the command populates, or files it may leave
  /// unwritten; the executor does not verify them after a run.
  pub allow_extra_outputs: bool,
}

impl Hashable for ActionSpec {}

impl ActionSpec {
  /// An action copying `source` to `destination`.
  pub fn copy(destination: &Path, source: &Path) -> Self {
    Self {
      label: format!("Copy {}", destination.display()),
      outputs: BTreeSet::from([destination.to_path_buf()]),
      inputs: BTreeSet::from([source.to_path_buf()]),
      command: ActionCommand::Copy {
        source: source.to_path_buf(),
      },
      allow_extra_outputs: false,
    }
  }

  /// An action writing `content` to `path`.
  pub fn write_text(path: &Path, content: impl Into<String>) -> Self {
    Self {
      label: format!("WriteText {}", path.display()),
      outputs: BTreeSet::from([path.to_path_buf()]),
      inputs: BTreeSet::new(),
      command: ActionCommand::WriteText { content: content.into() },
      allow_extra_outputs: false,
    }
  }

  /// An action running an external program.
  pub fn exec<I, O>(label: impl Into<String>, outputs: O, inputs: I, opts: ExecOpts) -> Self
  where
    I: IntoIterator<Item = PathBuf>,
    O: IntoIterator<Item = PathBuf>,
  {
    Self {
      label: label.into(),
      outputs: outputs.into_iter().collect(),
      inputs: inputs.into_iter().collect(),
      command: ActionCommand::Exec(opts),
      allow_extra_outputs: false,
    }
  }

  pub fn allowing_extra_outputs(mut self) -> Self {
    self.allow_extra_outputs = true;
    self
  }

  /// The single output of a copy or write action.
  pub fn primary_output(&self) -> Option<&Path> {
    self.outputs.iter().next().map(PathBuf::as_path)
  }
}

/// Errors raised while declaring actions. These indicate a pipeline
/// construction bug, not a build failure.
#[derive(Debug, Error)]
pub enum GraphError {
  /// Two different actions declared the same output.
  #[error("output {path} declared by both '{first}' and '{second}'")]
  DuplicateOutput {
    path: PathBuf,
    first: String,
    second: String,
  },

  /// A write or copy action was declared without exactly one output.
  #[error("action '{label}' must declare exactly one output")]
  SingleOutputRequired { label: String },

  /// The immediate graph failed to run an action while it was declared.
  #[error("action '{label}' failed: {message}")]
  Immediate { label: String, message: String },
}
