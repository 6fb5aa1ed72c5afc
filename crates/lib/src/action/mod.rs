//! Declarative build actions.
//!
//! Build steps never touch the file system for build outputs themselves.
//! Instead they declare actions on an [`ActionGraph`], and an executor runs
//! them later with incremental re-execution (see [`crate::execute`]).
//!
//! # Action Kinds
//!
//! - [`ActionCommand::Copy`] - Copy one file to a destination
//! - [`ActionCommand::WriteText`] - Write literal text to a destination
//! - [`ActionCommand::Exec`] - Run an external program (toolchain, xcodebuild)
//!
//! # Graph Implementations
//!
//! - [`RecordingGraph`] collects declarations for the executor
//! - [`ImmediateGraph`] runs every action the moment it is declared and
//!   records the order; tests use it as a synchronous stand-in executor

mod immediate;
mod types;

pub use immediate::ImmediateGraph;
pub use types::*;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::trace;

/// Sink for declared actions.
///
/// Declaring is cheap and side-effect free for [`RecordingGraph`]; failures of
/// the declared work surface only when the executor runs it. The only errors
/// returned here are construction errors such as two actions claiming the
/// same output.
pub trait ActionGraph {
  /// Declare an arbitrary action.
  fn declare_action(&mut self, spec: ActionSpec) -> Result<(), GraphError>;

  /// Record that the action producing `downstream` must run after the action
  /// producing `upstream`, even without a file dependency between them.
  fn declare_dependency(&mut self, downstream: &Path, upstream: &Path) -> Result<(), GraphError>;

  /// Declare a text write and return the written path.
  fn declare_write(&mut self, path: &Path, content: &str) -> Result<PathBuf, GraphError> {
    self.declare_action(ActionSpec::write_text(path, content))?;
    Ok(path.to_path_buf())
  }

  /// Declare a file copy and return the destination path.
  fn declare_copy(&mut self, destination: &Path, source: &Path) -> Result<PathBuf, GraphError> {
    self.declare_action(ActionSpec::copy(destination, source))?;
    Ok(destination.to_path_buf())
  }
}

/// An [`ActionGraph`] that records declarations for later execution.
///
/// Re-declaring an identical action is a no-op. Declaring a different action
/// for an output that already has a producer is a [`GraphError::DuplicateOutput`].
#[derive(Debug, Default, Clone)]
pub struct RecordingGraph {
  actions: Vec<ActionSpec>,
  producers: HashMap<PathBuf, usize>,
  dependencies: Vec<(PathBuf, PathBuf)>,
}

impl RecordingGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declared actions, in declaration order.
  pub fn actions(&self) -> &[ActionSpec] {
    &self.actions
  }

  /// Explicit `(downstream, upstream)` output pairs.
  pub fn dependencies(&self) -> &[(PathBuf, PathBuf)] {
    &self.dependencies
  }

  /// The action producing `path`, if any.
  pub fn producer_of(&self, path: &Path) -> Option<&ActionSpec> {
    self.producers.get(path).map(|&idx| &self.actions[idx])
  }

  /// Index of the action producing `path`, if any.
  pub fn producer_index(&self, path: &Path) -> Option<usize> {
    self.producers.get(path).copied()
  }

  pub fn len(&self) -> usize {
    self.actions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }
}

impl ActionGraph for RecordingGraph {
  fn declare_action(&mut self, spec: ActionSpec) -> Result<(), GraphError> {
    if matches!(spec.command, ActionCommand::Copy { .. } | ActionCommand::WriteText { .. }) && spec.outputs.len() != 1 {
      return Err(GraphError::SingleOutputRequired { label: spec.label });
    }

    for output in &spec.outputs {
      if let Some(&idx) = self.producers.get(output) {
        let existing = &self.actions[idx];
        if *existing == spec {
          trace!(label = %spec.label, "action already declared");
          return Ok(());
        }
        return Err(GraphError::DuplicateOutput {
          path: output.clone(),
          first: existing.label.clone(),
          second: spec.label.clone(),
        });
      }
    }

    let idx = self.actions.len();
    for output in &spec.outputs {
      self.producers.insert(output.clone(), idx);
    }
    trace!(label = %spec.label, kind = spec.command.kind(), "declared action");
    self.actions.push(spec);
    Ok(())
  }

  fn declare_dependency(&mut self, downstream: &Path, upstream: &Path) -> Result<(), GraphError> {
    self
      .dependencies
      .push((downstream.to_path_buf(), upstream.to_path_buf()));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_redeclaration_is_ignored() {
    let mut graph = RecordingGraph::new();
    graph
      .declare_copy(Path::new("/out/a.txt"), Path::new("/src/a.txt"))
      .unwrap();
    graph
      .declare_copy(Path::new("/out/a.txt"), Path::new("/src/a.txt"))
      .unwrap();

    assert_eq!(graph.len(), 1);
  }

  #[test]
  fn conflicting_producers_are_rejected() {
    let mut graph = RecordingGraph::new();
    graph
      .declare_copy(Path::new("/out/a.txt"), Path::new("/src/a.txt"))
      .unwrap();

    let err = graph
      .declare_copy(Path::new("/out/a.txt"), Path::new("/src/other.txt"))
      .unwrap_err();

    assert!(matches!(err, GraphError::DuplicateOutput { ref path, .. } if path == Path::new("/out/a.txt")));
    assert_eq!(graph.len(), 1);
  }

  #[test]
  fn write_then_copy_share_no_outputs() {
    let mut graph = RecordingGraph::new();
    let written = graph
      .declare_write(Path::new("/artifacts/Info.plist"), "<plist/>")
      .unwrap();
    graph.declare_copy(Path::new("/build/Info.plist"), &written).unwrap();

    assert_eq!(graph.len(), 2);
    let copy = graph.producer_of(Path::new("/build/Info.plist")).unwrap();
    assert!(copy.inputs.contains(Path::new("/artifacts/Info.plist")));
  }

  #[test]
  fn copy_requires_single_output() {
    let mut graph = RecordingGraph::new();
    let mut spec = ActionSpec::copy(Path::new("/out/a"), Path::new("/src/a"));
    spec.outputs.insert(PathBuf::from("/out/b"));

    let err = graph.declare_action(spec).unwrap_err();
    assert!(matches!(err, GraphError::SingleOutputRequired { .. }));
  }

  #[test]
  fn dependencies_are_recorded_in_order() {
    let mut graph = RecordingGraph::new();
    graph
      .declare_dependency(Path::new("/out/b"), Path::new("/out/a"))
      .unwrap();

    assert_eq!(
      graph.dependencies(),
      &[(PathBuf::from("/out/b"), PathBuf::from("/out/a"))]
    );
  }

  #[test]
  fn exec_opts_display_quotes_spaces() {
    let opts = ExecOpts::new("/usr/bin/xcodebuild").with_args(["-project", "/tmp/My App.xcodeproj"]);
    assert_eq!(opts.display(), "/usr/bin/xcodebuild -project \"/tmp/My App.xcodeproj\"");
  }

  #[test]
  fn exec_preserves_env_and_cwd() {
    let mut env = std::collections::BTreeMap::new();
    env.insert("CC".to_string(), "clang".to_string());

    let spec = ActionSpec::exec(
      "make",
      [PathBuf::from("/out/bin")],
      Vec::<PathBuf>::new(),
      ExecOpts::new("make").with_env(env.clone()).with_cwd("/build"),
    );

    match &spec.command {
      ActionCommand::Exec(opts) => {
        assert_eq!(opts.bin, "make");
        assert_eq!(opts.env, Some(env));
        assert_eq!(opts.cwd, Some("/build".to_string()));
      }
      _ => panic!("Expected Exec action"),
    }
  }
}
