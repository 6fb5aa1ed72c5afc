use tracing::debug;

use crate::pipeline::{BuildStep, StepContext, StepError};

const DEFAULT_RESOURCES: &str = "unity default resources";

/// Copies the engine's default resources into the data directory.
pub struct CopyDefaultResources;

impl BuildStep for CopyDefaultResources {
  fn name(&self) -> &'static str {
    "copy-default-resources"
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let source = ctx
      .config
      .paths
      .trampoline_dir()
      .join("Data")
      .join(DEFAULT_RESOURCES);
    let destination = ctx.state.data_deploy_dir.join(DEFAULT_RESOURCES);

    ctx.graph.declare_copy(&destination, &source)?;
    debug!(destination = %destination.display(), "declared default resources");
    Ok(())
  }
}
