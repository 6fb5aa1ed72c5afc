//! Action graph execution.
//!
//! This module provides the entry point for running a recorded action graph.
//! It handles:
//! - DAG-based ordering from declared inputs, outputs and explicit dependencies
//! - Parallel execution of independent actions
//! - Incremental skipping of actions whose inputs did not change
//! - Failure propagation and skip tracking

pub mod actions;
pub mod dag;
pub mod state;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::action::{ActionSpec, RecordingGraph};

pub use dag::ExecutionDag;
pub use state::{ActionState, ActionStateStore};
pub use types::{ActionStatus, ExecuteConfig, ExecuteError, ExecutionResult};

/// Outcome of one action task: the action index and either its status plus
/// the (id, signature) pair to remember, or the error it failed with.
type TaskOutcome = (usize, Result<(ActionStatus, String, String), ExecuteError>);

/// Execute every action in a recorded graph.
///
/// This is the main entry point for execution. It:
/// 1. Constructs a DAG from the declarations
/// 2. Computes parallel execution waves
/// 3. Executes waves in order, with parallelism within each wave
/// 4. Skips actions whose input signature matches the previous run and whose
///    outputs still exist
/// 5. Skips the dependents of failed actions; independent actions still run
/// 6. Persists the signatures of every action that succeeded
///
/// # Errors
///
/// Returns an error only for graph-level problems (cycles, unknown explicit
/// dependencies, unreadable state). Per-action failures are reported in
/// [`ExecutionResult::failed`].
pub async fn execute_graph(graph: &RecordingGraph, config: &ExecuteConfig) -> Result<ExecutionResult, ExecuteError> {
  info!(action_count = graph.len(), "starting graph execution");

  let dag = ExecutionDag::from_graph(graph)?;
  let waves = dag.waves()?;

  info!(wave_count = waves.len(), "computed execution waves");

  let store = ActionStateStore::new(&config.state_dir);
  let mut state = store.load()?;

  let mut result = ExecutionResult::default();
  let mut failed: HashSet<usize> = HashSet::new();
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, actions = wave.len(), "executing wave");

    let mut ready = Vec::new();
    for &idx in wave {
      let failed_dep = dag.dependencies(idx).into_iter().find(|dep| failed.contains(dep));
      if let Some(dep) = failed_dep {
        let label = graph.actions()[idx].label.clone();
        let dep_label = graph.actions()[dep].label.clone();
        warn!(action = %label, failed_dep = %dep_label, "skipping action due to failed dependency");
        failed.insert(idx);
        result.skipped.push((label, dep_label));
      } else {
        ready.push(idx);
      }
    }

    if ready.is_empty() {
      continue;
    }

    let mut outcomes = execute_wave(&ready, graph, config, &state, semaphore.clone()).await;
    outcomes.sort_by_key(|(idx, _)| *idx);

    for (idx, outcome) in outcomes {
      let label = graph.actions()[idx].label.clone();
      match outcome {
        Ok((status, id, signature)) => {
          match status {
            ActionStatus::Executed => {
              info!(action = %label, "action executed");
              result.executed.push(label);
            }
            ActionStatus::UpToDate => {
              debug!(action = %label, "action up to date");
              result.up_to_date.push(label);
            }
          }
          state.signatures.insert(id, signature);
        }
        Err(e) => {
          error!(action = %label, error = %e, "action failed");
          if let Ok(id) = state::action_id(&graph.actions()[idx]) {
            state.signatures.remove(&id.0);
          }
          failed.insert(idx);
          result.failed.push((label, e));
        }
      }
    }
  }

  store.save(&state)?;

  info!(
    executed = result.executed.len(),
    up_to_date = result.up_to_date.len(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "graph execution complete"
  );

  Ok(result)
}

/// Execute a wave of actions in parallel.
async fn execute_wave(
  ready: &[usize],
  graph: &RecordingGraph,
  config: &ExecuteConfig,
  state: &state::ActionState,
  semaphore: Arc<Semaphore>,
) -> Vec<TaskOutcome> {
  let mut join_set = JoinSet::new();

  for &idx in ready {
    let spec = graph.actions()[idx].clone();
    let previous = state::action_id(&spec)
      .ok()
      .and_then(|id| state.signatures.get(&id.0).cloned());
    let force = config.force;
    let working_dir = config.working_dir.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let outcome = match semaphore.acquire().await {
        Ok(_permit) => run_action(&spec, previous.as_deref(), force, working_dir).await,
        Err(e) => Err(ExecuteError::TaskAborted(e.to_string())),
      };
      (idx, outcome)
    });
  }

  let mut results: HashMap<usize, Result<(ActionStatus, String, String), ExecuteError>> = HashMap::new();

  while let Some(join_result) = join_set.join_next().await {
    match join_result {
      Ok((idx, outcome)) => {
        results.insert(idx, outcome);
      }
      Err(e) => {
        error!(error = %e, "action task panicked");
      }
    }
  }

  ready
    .iter()
    .map(|&idx| {
      let outcome = results
        .remove(&idx)
        .unwrap_or_else(|| Err(ExecuteError::TaskAborted(graph.actions()[idx].label.clone())));
      (idx, outcome)
    })
    .collect()
}

/// Run one action unless it is up to date.
async fn run_action(
  spec: &ActionSpec,
  previous: Option<&str>,
  force: bool,
  working_dir: PathBuf,
) -> Result<(ActionStatus, String, String), ExecuteError> {
  let id = state::action_id(spec)?;
  let signature = state::input_signature(spec)?;

  if !force && previous == Some(signature.0.as_str()) && state::outputs_present(spec) {
    return Ok((ActionStatus::UpToDate, id.0, signature.0));
  }

  actions::execute_action(spec, &working_dir).await?;
  Ok((ActionStatus::Executed, id.0, signature.0))
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::Path;

  use super::*;
  use crate::action::{ActionGraph, ExecOpts};
  use crate::util::testutil::shell_cmd;
  use tempfile::TempDir;

  fn config(root: &Path) -> ExecuteConfig {
    ExecuteConfig::for_build_dir(root.join("build"))
  }

  fn write_then_copy(root: &Path) -> RecordingGraph {
    let mut graph = RecordingGraph::new();
    let staged = root.join("build/staged.txt");
    graph.declare_write(&staged, "payload").unwrap();
    graph.declare_copy(&root.join("deploy/final.txt"), &staged).unwrap();
    graph
  }

  #[tokio::test]
  async fn runs_producer_before_consumer() {
    let temp = TempDir::new().unwrap();
    let graph = write_then_copy(temp.path());

    let result = execute_graph(&graph, &config(temp.path())).await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.executed.len(), 2);
    assert!(result.executed[0].starts_with("WriteText"));
    assert_eq!(
      fs::read_to_string(temp.path().join("deploy/final.txt")).unwrap(),
      "payload"
    );
  }

  #[tokio::test]
  async fn second_run_is_up_to_date() {
    let temp = TempDir::new().unwrap();
    let graph = write_then_copy(temp.path());
    let config = config(temp.path());

    execute_graph(&graph, &config).await.unwrap();
    let second = execute_graph(&graph, &config).await.unwrap();

    assert!(second.executed.is_empty());
    assert_eq!(second.up_to_date.len(), 2);
    assert!(config.state_dir.join(crate::consts::ACTION_STATE_FILENAME).exists());
  }

  #[tokio::test]
  async fn deleted_output_reruns_action() {
    let temp = TempDir::new().unwrap();
    let graph = write_then_copy(temp.path());
    let config = config(temp.path());

    execute_graph(&graph, &config).await.unwrap();
    fs::remove_file(temp.path().join("deploy/final.txt")).unwrap();
    let second = execute_graph(&graph, &config).await.unwrap();

    assert_eq!(second.executed.len(), 1);
    assert!(second.executed[0].starts_with("Copy"));
  }

  #[tokio::test]
  async fn changed_input_reruns_consumer() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src.txt");
    fs::write(&source, "one").unwrap();
    let mut graph = RecordingGraph::new();
    graph.declare_copy(&temp.path().join("out.txt"), &source).unwrap();
    let config = config(temp.path());

    execute_graph(&graph, &config).await.unwrap();
    fs::write(&source, "two").unwrap();
    let second = execute_graph(&graph, &config).await.unwrap();

    assert_eq!(second.executed.len(), 1);
    assert_eq!(fs::read_to_string(temp.path().join("out.txt")).unwrap(), "two");
  }

  #[tokio::test]
  async fn force_reruns_everything() {
    let temp = TempDir::new().unwrap();
    let graph = write_then_copy(temp.path());
    let mut config = config(temp.path());

    execute_graph(&graph, &config).await.unwrap();
    config.force = true;
    let second = execute_graph(&graph, &config).await.unwrap();

    assert_eq!(second.executed.len(), 2);
  }

  #[tokio::test]
  async fn missing_input_fails_action() {
    let temp = TempDir::new().unwrap();
    let mut graph = RecordingGraph::new();
    graph
      .declare_copy(&temp.path().join("out.txt"), &temp.path().join("nope.txt"))
      .unwrap();

    let result = execute_graph(&graph, &config(temp.path())).await.unwrap();

    assert_eq!(result.failed.len(), 1);
    assert!(matches!(result.failed[0].1, ExecuteError::MissingInputArtifact { .. }));
  }

  #[tokio::test]
  async fn failure_skips_dependents_but_not_independent_actions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let mut graph = RecordingGraph::new();

    let (bin, args) = shell_cmd("exit 3");
    let broken = root.join("build/lib.dylib");
    graph
      .declare_action(ActionSpec::exec(
        "link",
        [broken.clone()],
        Vec::<PathBuf>::new(),
        ExecOpts::new(bin).with_args(args),
      ))
      .unwrap();
    graph.declare_copy(&root.join("deploy/lib.dylib"), &broken).unwrap();
    graph.declare_write(&root.join("deploy/other.txt"), "x").unwrap();

    let result = execute_graph(&graph, &config(root)).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0, "link");
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].1, "link");
    assert_eq!(result.executed.len(), 1);
    assert!(root.join("deploy/other.txt").exists());
  }

  #[tokio::test]
  async fn explicit_dependency_orders_execution() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let mut graph = RecordingGraph::new();
    let second = root.join("b.txt");
    let first = root.join("a.txt");
    graph.declare_write(&second, "b").unwrap();
    graph.declare_write(&first, "a").unwrap();
    graph.declare_dependency(&second, &first).unwrap();

    let result = execute_graph(&graph, &config(root)).await.unwrap();

    assert_eq!(result.executed[0], format!("WriteText {}", first.display()));
  }
}
