//! Build step pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`BuildStep`]s. Each step reads the
//! typed [`PipelineConfig`] and the shared [`PipelineState`] and declares the
//! files it produces on an [`ActionGraph`]. Nothing is built while the
//! pipeline runs; the declared graph is executed afterwards.
//!
//! # Failure Semantics
//!
//! Steps run in order and the first failure ends the run. Work declared by
//! earlier steps is kept. Before a step runs, every configuration component
//! it names must be present, otherwise it fails with
//! [`StepError::ConfigurationInvalid`] without running. A panicking step is
//! reported as [`StepError::Unexpected`].

mod clean;
mod run;
mod state;
pub mod steps;

#[cfg(test)]
pub(crate) mod fixture;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::action::{ActionGraph, GraphError};
use crate::codegen::CodegenError;
use crate::config::{ComponentKind, PipelineConfig};
use crate::deploy::DeployError;
use crate::project::ProjectError;
use crate::relink::{RelinkError, ToolchainRegistry};

pub use clean::clean;
pub use run::{RunError, RunReport, can_run, run_on_device};
pub use state::{ArchitectureDeployInfo, PipelineState};

#[derive(Debug, Error)]
pub enum StepError {
  #[error("configuration component '{component}' is invalid: {reason}")]
  ConfigurationInvalid { component: ComponentKind, reason: String },

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Project(#[from] ProjectError),

  #[error(transparent)]
  Deploy(#[from] DeployError),

  #[error(transparent)]
  Relink(#[from] RelinkError),

  #[error(transparent)]
  Codegen(#[from] CodegenError),

  #[error("{0}")]
  Invalid(String),

  /// The step panicked.
  #[error("unexpected error: {0}")]
  Unexpected(String),
}

/// Everything a step may use.
pub struct StepContext<'a> {
  pub config: &'a PipelineConfig,
  pub state: &'a mut PipelineState,
  pub graph: &'a mut dyn ActionGraph,
  pub toolchains: &'a mut ToolchainRegistry,
}

/// One named unit of the pipeline.
pub trait BuildStep {
  fn name(&self) -> &'static str;

  /// Configuration components this step reads.
  fn components(&self) -> &'static [ComponentKind] {
    &[]
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug)]
pub enum PipelineResult {
  Success,
  Failure { step: String, error: StepError },
}

impl PipelineResult {
  pub fn is_success(&self) -> bool {
    matches!(self, PipelineResult::Success)
  }
}

pub struct Pipeline {
  steps: Vec<Box<dyn BuildStep>>,
}

impl Pipeline {
  pub fn new(steps: Vec<Box<dyn BuildStep>>) -> Self {
    Self { steps }
  }

  /// The incremental iOS player pipeline.
  pub fn ios_incremental() -> Self {
    Self::new(steps::ios_steps())
  }

  pub fn step_names(&self) -> Vec<&'static str> {
    self.steps.iter().map(|s| s.name()).collect()
  }

  /// Run every step in order, stopping at the first failure.
  pub fn run(&self, ctx: &mut StepContext<'_>) -> PipelineResult {
    for step in &self.steps {
      let name = step.name();

      if let Some(missing) = step
        .components()
        .iter()
        .find(|kind| !ctx.config.has_component(**kind))
      {
        let error = StepError::ConfigurationInvalid {
          component: *missing,
          reason: format!("required by step '{}' but not configured", name),
        };
        error!(step = name, error = %error, "build step not runnable");
        return PipelineResult::Failure {
          step: name.to_string(),
          error,
        };
      }

      info!(step = name, "running build step");
      let outcome = panic::catch_unwind(AssertUnwindSafe(|| step.run(ctx)))
        .unwrap_or_else(|payload| Err(StepError::Unexpected(panic_message(payload.as_ref()))));

      if let Err(error) = outcome {
        error!(step = name, error = %error, "build step failed");
        return PipelineResult::Failure {
          step: name.to_string(),
          error,
        };
      }
    }
    PipelineResult::Success
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "step panicked".to_string()
  }
}
