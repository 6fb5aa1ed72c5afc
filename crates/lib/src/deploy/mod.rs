//! Artifact deployment planning.
//!
//! Maps every file of a source tree to a destination under a deploy root
//! according to [`DeployRules`], then declares one action per file on an
//! [`ActionGraph`]. Planning only walks the source tree; nothing is copied
//! until the graph executes.

mod rules;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::action::{ActionGraph, ActionSpec, ExecOpts, GraphError};

pub use rules::{DeployRule, DeployRules};

#[derive(Debug, Error)]
pub enum DeployError {
  /// Two different sources map to one destination.
  #[error("{destination} would be deployed from both {first} and {second}")]
  DuplicateDestination {
    destination: PathBuf,
    first: String,
    second: String,
  },

  #[error("source tree does not exist: {0}")]
  SourceMissing(PathBuf),

  #[error("failed to walk {path}: {message}")]
  Walk { path: PathBuf, message: String },

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// How a deployed file is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployKind {
  Copy { source: PathBuf },
  WriteText { content: String },
  ShellCommand { inputs: Vec<PathBuf>, opts: ExecOpts },
}

impl DeployKind {
  fn describe(&self) -> String {
    match self {
      DeployKind::Copy { source } => source.display().to_string(),
      DeployKind::WriteText { .. } => "<text>".to_string(),
      DeployKind::ShellCommand { opts, .. } => opts.display(),
    }
  }
}

/// One file to deploy. `destination` is relative to the plan's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployAction {
  pub destination: PathBuf,
  pub kind: DeployKind,
}

/// Deploy actions keyed by destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
  root: PathBuf,
  actions: BTreeMap<PathBuf, DeployAction>,
}

impl DeployPlan {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      actions: BTreeMap::new(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Add an action. Re-adding an identical action is a no-op; a different
  /// action for the same destination is an error.
  pub fn insert(&mut self, action: DeployAction) -> Result<(), DeployError> {
    if let Some(existing) = self.actions.get(&action.destination) {
      if existing == &action {
        return Ok(());
      }
      return Err(DeployError::DuplicateDestination {
        destination: action.destination.clone(),
        first: existing.kind.describe(),
        second: action.kind.describe(),
      });
    }
    self.actions.insert(action.destination.clone(), action);
    Ok(())
  }

  pub fn actions(&self) -> impl Iterator<Item = &DeployAction> {
    self.actions.values()
  }

  pub fn len(&self) -> usize {
    self.actions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }

  /// Absolute destination paths, sorted.
  pub fn destinations(&self) -> Vec<PathBuf> {
    self.actions.keys().map(|d| self.root.join(d)).collect()
  }

  /// Declare one action per entry on `graph`.
  pub fn declare(&self, graph: &mut dyn ActionGraph) -> Result<(), DeployError> {
    for action in self.actions.values() {
      let destination = self.root.join(&action.destination);
      match &action.kind {
        DeployKind::Copy { source } => {
          graph.declare_copy(&destination, source)?;
        }
        DeployKind::WriteText { content } => {
          graph.declare_write(&destination, content)?;
        }
        DeployKind::ShellCommand { inputs, opts } => {
          let spec = ActionSpec::exec(
            format!("Deploy {}", action.destination.display()),
            [destination],
            inputs.iter().cloned(),
            opts.clone(),
          );
          graph.declare_action(spec)?;
        }
      }
    }
    debug!(root = %self.root.display(), count = self.actions.len(), "declared deploy plan");
    Ok(())
  }
}

/// Plan copies of every file under `source_tree` into `destination_root`.
///
/// Files are visited in sorted order. An empty or fully excluded tree gives
/// an empty plan.
pub fn plan_deployments(
  source_tree: &Path,
  destination_root: &Path,
  rules: &DeployRules,
) -> Result<DeployPlan, DeployError> {
  if !source_tree.is_dir() {
    return Err(DeployError::SourceMissing(source_tree.to_path_buf()));
  }

  let mut plan = DeployPlan::new(destination_root);

  for entry in WalkDir::new(source_tree).sort_by_file_name() {
    let entry = entry.map_err(|e| DeployError::Walk {
      path: source_tree.to_path_buf(),
      message: e.to_string(),
    })?;
    if entry.file_type().is_dir() {
      continue;
    }

    let Ok(rel) = entry.path().strip_prefix(source_tree) else {
      continue;
    };
    let Some(destination) = rules.destination(rel) else {
      trace!(path = %rel.display(), "excluded from deployment");
      continue;
    };

    plan.insert(DeployAction {
      destination,
      kind: DeployKind::Copy {
        source: entry.path().to_path_buf(),
      },
    })?;
  }

  debug!(
    source = %source_tree.display(),
    destination = %destination_root.display(),
    files = plan.len(),
    "planned deployments"
  );
  Ok(plan)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::{ImmediateGraph, RecordingGraph};
  use crate::util::testutil::write_tree;
  use tempfile::TempDir;

  #[test]
  fn plans_player_files() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("variation");
    write_tree(
      &src,
      &[
        ("Data/foo/bar.bin", "x"),
        ("Data/Managed/Assembly-CSharp.dll", "x"),
        ("Data/Managed/Metadata/global-metadata.dat", "x"),
        ("Libraries/libil2cpp.a", "x"),
        ("Plugins/helper.pdb", "x"),
        (".DS_Store", "x"),
      ],
    );

    let plan = plan_deployments(&src, &temp.path().join("build"), &DeployRules::player_files("Game")).unwrap();

    let destinations: Vec<&Path> = plan.actions().map(|a| a.destination.as_path()).collect();
    assert_eq!(
      destinations,
      vec![
        // Only the immediate `Managed` parent is skipped.
        Path::new("Game.app/Contents/Resources/Data/Managed/Metadata/global-metadata.dat"),
        Path::new("Game.app/Contents/Resources/Data/foo/bar.bin"),
        Path::new("Libraries/libil2cpp.a"),
      ]
    );
  }

  #[test]
  fn excluded_extensions_never_planned() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write_tree(&src, &[("a.dll", ""), ("b/c.pdb", ""), ("d.txt", "")]);

    let plan = plan_deployments(&src, temp.path(), &DeployRules::player_files("Game")).unwrap();

    assert!(plan.actions().all(|a| {
      let ext = a.destination.extension().and_then(|e| e.to_str());
      ext != Some("dll") && ext != Some("pdb")
    }));
    assert_eq!(plan.len(), 1);
  }

  #[test]
  fn empty_tree_gives_empty_plan() {
    let temp = TempDir::new().unwrap();
    let plan = plan_deployments(temp.path(), &temp.path().join("out"), &DeployRules::new()).unwrap();
    assert!(plan.is_empty());
  }

  #[test]
  fn fully_excluded_tree_gives_empty_plan() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("x.dll", ""), ("Managed/y.bin", "")]);
    let plan = plan_deployments(temp.path(), &temp.path().join("out"), &DeployRules::player_files("G")).unwrap();
    assert!(plan.is_empty());
  }

  #[test]
  fn missing_source_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = plan_deployments(&temp.path().join("nope"), temp.path(), &DeployRules::new()).unwrap_err();
    assert!(matches!(err, DeployError::SourceMissing(_)));
  }

  #[test]
  fn duplicate_destination_is_rejected() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write_tree(&src, &[("Data/x.bin", "1"), ("App.app/Contents/Resources/Data/x.bin", "2")]);

    let err = plan_deployments(&src, temp.path(), &DeployRules::player_files("App")).unwrap_err();
    assert!(matches!(err, DeployError::DuplicateDestination { .. }));
  }

  #[test]
  fn identical_insert_is_ignored() {
    let mut plan = DeployPlan::new("/out");
    let action = DeployAction {
      destination: PathBuf::from("a"),
      kind: DeployKind::WriteText { content: "x".into() },
    };
    plan.insert(action.clone()).unwrap();
    plan.insert(action).unwrap();
    assert_eq!(plan.len(), 1);
  }

  #[test]
  fn declare_registers_one_copy_per_action() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write_tree(&src, &[("a.txt", "a"), ("b/c.txt", "c")]);
    let plan = plan_deployments(&src, &temp.path().join("out"), &DeployRules::new()).unwrap();

    let mut graph = RecordingGraph::new();
    plan.declare(&mut graph).unwrap();

    assert_eq!(graph.len(), 2);
    assert!(graph.producer_of(&temp.path().join("out/b/c.txt")).is_some());
  }

  #[test]
  fn declared_copies_run_on_immediate_graph() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write_tree(&src, &[("Data/level0", "bytes")]);
    let plan = plan_deployments(&src, &temp.path().join("out"), &DeployRules::player_files("Game")).unwrap();

    let mut graph = ImmediateGraph::new();
    plan.declare(&mut graph).unwrap();

    let deployed = temp.path().join("out/Game.app/Contents/Resources/Data/level0");
    assert_eq!(std::fs::read_to_string(deployed).unwrap(), "bytes");
  }
}
