//! Steps of the incremental iOS pipeline.
//!
//! Code generation and IL2CPP are run by external backends before the
//! pipeline; these steps assemble their outputs, the prebuilt player and the
//! trampoline project into a buildable Xcode project, then declare the
//! Xcode build itself.

mod build_project;
mod default_resources;
mod generate_project;
mod native_plugins;
mod player_files;

pub use build_project::BuildXcodeProject;
pub use default_resources::CopyDefaultResources;
pub use generate_project::GenerateXcodeProject;
pub use native_plugins::SetupNativePlugins;
pub use player_files::SetupPlayerFiles;

use super::{BuildStep, StepError};
use crate::config::{ComponentKind, GeneralSettings, PipelineConfig};

/// Every step, in execution order.
pub fn ios_steps() -> Vec<Box<dyn BuildStep>> {
  vec![
    Box::new(CopyDefaultResources),
    Box::new(SetupNativePlugins),
    Box::new(SetupPlayerFiles),
    Box::new(GenerateXcodeProject),
    Box::new(BuildXcodeProject),
  ]
}

fn general(config: &PipelineConfig) -> Result<&GeneralSettings, StepError> {
  config.general.as_ref().ok_or(StepError::ConfigurationInvalid {
    component: ComponentKind::General,
    reason: "missing [general] section".to_string(),
  })
}
