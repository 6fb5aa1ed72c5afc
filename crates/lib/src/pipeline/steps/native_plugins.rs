use tracing::debug;

use crate::pipeline::{BuildStep, StepContext, StepError};
use crate::platform::Architecture;

/// Copies native plugins next to the arm64 dynamic libraries.
pub struct SetupNativePlugins;

impl BuildStep for SetupNativePlugins {
  fn name(&self) -> &'static str {
    "setup-native-plugins"
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    if ctx.config.native_plugins.is_empty() {
      return Ok(());
    }

    let deploy_dir = ctx.state.architecture(Architecture::Arm64)?.dynamic_lib_deploy_dir.clone();
    for plugin in &ctx.config.native_plugins {
      let Some(file_name) = plugin.file_name() else {
        return Err(StepError::Invalid(format!(
          "native plugin path has no file name: {}",
          plugin.display()
        )));
      };
      ctx.graph.declare_copy(&deploy_dir.join(file_name), plugin)?;
    }

    debug!(count = ctx.config.native_plugins.len(), "declared native plugins");
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
  fn plugins_keep_their_file_name() {
    let fixture = Fixture::with_extra("[[native_plugins]]\npath = \"Plugins/iOS/libcamera.dylib\"\n");
    let mut state = PipelineState::prepare(&fixture.config).unwrap();
    let mut graph = RecordingGraph::new();
    let mut toolchains = fixture.toolchains();
    let mut ctx = StepContext {
      config: &fixture.config,
      state: &mut state,
      graph: &mut graph,
      toolchains: &mut toolchains,
    };

    SetupNativePlugins.run(&mut ctx).unwrap();

    let action = graph
      .producer_of(&fixture.build_dir().join("Libraries/libcamera.dylib"))
      .unwrap();
    assert!(
      action
        .inputs
        .contains(&fixture.temp.path().join("Plugins/iOS/libcamera.dylib"))
    );
  }

  #[test]
  fn simulator_builds_have_no_arm64_deploy_dir() {
    let fixture = Fixture::with_extra(
      "[target]\nkind = \"simulator\"\n\n[[native_plugins]]\npath = \"libx.dylib\"\n",
    );
    let mut state = PipelineState::prepare(&fixture.config).unwrap();
    let mut graph = RecordingGraph::new();
    let mut toolchains = fixture.toolchains();
    let mut ctx = StepContext {
      config: &fixture.config,
      state: &mut state,
      graph: &mut graph,
      toolchains: &mut toolchains,
    };

    let err = SetupNativePlugins.run(&mut ctx).unwrap_err();
    assert!(matches!(err, StepError::ConfigurationInvalid { .. }));
  }
}
