//! Execution DAG over declared actions.
//!
//! This module turns a [`RecordingGraph`] into a directed acyclic graph and
//! computes parallel execution waves. An edge runs from the action producing a
//! path to every action that reads that path (or a file below it), plus one
//! edge per explicit dependency.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::action::RecordingGraph;

use super::types::ExecuteError;

/// A DAG of action indices (positions in [`RecordingGraph::actions`]).
pub struct ExecutionDag {
  /// The underlying graph; node weights are action indices.
  graph: DiGraph<usize, ()>,

  /// Map from action index to node index.
  nodes: HashMap<usize, NodeIndex>,
}

impl ExecutionDag {
  /// Build an execution DAG from recorded declarations.
  ///
  /// # Errors
  ///
  /// Returns `UnknownDependency` if an explicit dependency names a path no
  /// action produces, and `CycleDetected` if the declarations form a cycle.
  pub fn from_graph(recorded: &RecordingGraph) -> Result<Self, ExecuteError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for idx in 0..recorded.len() {
      nodes.insert(idx, graph.add_node(idx));
    }

    for (idx, spec) in recorded.actions().iter().enumerate() {
      let dependent = nodes[&idx];
      let mut seen = HashSet::new();

      for input in &spec.inputs {
        // An input inside a produced directory depends on that directory's producer.
        let producer = input.ancestors().find_map(|p| recorded.producer_index(p));
        if let Some(dep) = producer
          && dep != idx
          && seen.insert(dep)
        {
          graph.add_edge(nodes[&dep], dependent, ());
        }
      }
    }

    for (downstream, upstream) in recorded.dependencies() {
      let down = recorded
        .producer_index(downstream)
        .ok_or_else(|| ExecuteError::UnknownDependency(downstream.clone()))?;
      let up = recorded
        .producer_index(upstream)
        .ok_or_else(|| ExecuteError::UnknownDependency(upstream.clone()))?;
      if down != up {
        graph.update_edge(nodes[&up], nodes[&down], ());
      }
    }

    let dag = Self { graph, nodes };
    dag.verify_acyclic()?;
    Ok(dag)
  }

  /// Verify that the graph is acyclic.
  fn verify_acyclic(&self) -> Result<(), ExecuteError> {
    toposort(&self.graph, None).map_err(|_| ExecuteError::CycleDetected)?;
    Ok(())
  }

  /// Get actions organized into parallel execution waves.
  ///
  /// Each wave contains actions whose dependencies all sit in earlier waves.
  /// Within a wave, actions are ordered by declaration.
  pub fn waves(&self) -> Result<Vec<Vec<usize>>, ExecuteError> {
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for idx in self.graph.node_indices() {
      in_degree.insert(idx, self.graph.neighbors_directed(idx, Direction::Incoming).count());
    }

    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();

      if ready.is_empty() {
        return Err(ExecuteError::CycleDetected);
      }
      ready.sort_by_key(|idx| self.graph[*idx]);

      for &idx in &ready {
        remaining.remove(&idx);
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      waves.push(ready.into_iter().map(|idx| self.graph[idx]).collect());
    }

    Ok(waves)
  }

  /// Get the direct dependencies of an action.
  pub fn dependencies(&self, action: usize) -> Vec<usize> {
    let Some(&idx) = self.nodes.get(&action) else {
      return Vec::new();
    };

    let mut deps: Vec<usize> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep| self.graph[dep])
      .collect();
    deps.sort_unstable();
    deps
  }

  /// Get the number of actions in the DAG.
  pub fn action_count(&self) -> usize {
    self.nodes.len()
  }
}
