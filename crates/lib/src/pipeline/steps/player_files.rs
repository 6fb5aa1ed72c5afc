use crate::config::ComponentKind;
use crate::deploy::{DeployRules, plan_deployments};
use crate::pipeline::{BuildStep, StepContext, StepError};

use super::general;

/// Deploys the prebuilt player variation into the build directory.
pub struct SetupPlayerFiles;

impl BuildStep for SetupPlayerFiles {
  fn name(&self) -> &'static str {
    "setup-player-files"
  }

  fn components(&self) -> &'static [ComponentKind] {
    &[ComponentKind::General]
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let product_name = &general(ctx.config)?.product_name;
    let build_dir = ctx.state.build_directory()?.to_path_buf();

    let plan = plan_deployments(
      &ctx.state.variation_dir,
      &build_dir,
      &DeployRules::player_files(product_name),
    )?;
    plan.declare(ctx.graph)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::RecordingGraph;
  use crate::pipeline::PipelineState;
  use crate::pipeline::fixture::Fixture;

  #[test]
  fn deploys_variation_with_data_redirect() {
    let fixture = Fixture::new();
    let mut state = PipelineState::prepare(&fixture.config).unwrap();
    let mut graph = RecordingGraph::new();
    let mut toolchains = fixture.toolchains();
    let mut ctx = StepContext {
      config: &fixture.config,
      state: &mut state,
      graph: &mut graph,
      toolchains: &mut toolchains,
    };

    SetupPlayerFiles.run(&mut ctx).unwrap();

    let build = fixture.build_dir();
    assert!(graph.producer_of(&build.join("Game.app/Contents/Resources/Data/level0")).is_some());
    assert!(
      graph
        .producer_of(&build.join("Game.app/Contents/Resources/Data/Resources/unity_builtin_extra"))
        .is_some()
    );
    assert_eq!(graph.len(), 2);
  }
}
