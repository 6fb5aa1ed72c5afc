mod build;
mod clean;
mod plan;
mod run;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use plan::cmd_plan;
pub use run::cmd_run;

use std::path::Path;

use anyhow::{Context, Result, bail};

use iospack_lib::action::RecordingGraph;
use iospack_lib::config::PipelineConfig;
use iospack_lib::pipeline::{Pipeline, PipelineResult, PipelineState, StepContext};
use iospack_lib::relink::ToolchainRegistry;

fn load_config(path: &Path) -> Result<PipelineConfig> {
  PipelineConfig::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Run every pipeline step against a fresh recording graph.
fn declare_pipeline(config: &PipelineConfig) -> Result<(PipelineState, RecordingGraph)> {
  let mut state = PipelineState::prepare(config).context("Failed to prepare pipeline state")?;
  let mut graph = RecordingGraph::new();
  let mut toolchains = ToolchainRegistry::new(config.toolchain_probe());

  let mut ctx = StepContext {
    config,
    state: &mut state,
    graph: &mut graph,
    toolchains: &mut toolchains,
  };

  match Pipeline::ios_incremental().run(&mut ctx) {
    PipelineResult::Success => Ok((state, graph)),
    PipelineResult::Failure { step, error } => bail!("Step '{}' failed: {}", step, error),
  }
}
