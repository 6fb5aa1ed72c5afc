//! Shared state of one pipeline run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::StepError;
use crate::config::{BuildConfig, ComponentKind, PipelineConfig};
use crate::platform::{Architecture, Platform};
use crate::relink::RelinkOutput;

/// Where native libraries for one architecture are deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitectureDeployInfo {
  pub dynamic_lib_deploy_dir: PathBuf,
  /// Platform whose toolchain builds for this architecture.
  pub platform: Platform,
}

/// Values computed once at pipeline start and shared by every step.
///
/// The build directory is assigned exactly once. Everything below it is
/// derived from it and never relocated afterwards.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
  pub product_name: String,
  pub company_name: String,
  pub build_config: Option<BuildConfig>,
  build_directory: Option<PathBuf>,
  pub architectures: BTreeMap<Architecture, ArchitectureDeployInfo>,
  pub data_deploy_dir: PathBuf,
  pub streaming_assets_dir: PathBuf,
  pub variation_dir: PathBuf,
  pub engine_assemblies_dir: PathBuf,
  pub il2cpp_data_dir: PathBuf,
  pub library_deploy_dir: PathBuf,
  pub artifacts_dir: PathBuf,
  /// Set by the build step once the burst library relink is declared.
  pub relinked: Option<RelinkOutput>,
}

impl PipelineState {
  /// Derive the state for `config`.
  pub fn prepare(config: &PipelineConfig) -> Result<Self, StepError> {
    let mut state = Self::default();
    if let Some(general) = &config.general {
      state.product_name = general.product_name.clone();
      state.company_name = general.company_name.clone();
    }
    state.build_config = Some(config.build_config());

    let build_dir = config.paths.build_dir.clone();
    state.set_build_directory(&build_dir)?;

    state.data_deploy_dir = build_dir.join("Data");
    state.streaming_assets_dir = state.data_deploy_dir.join("Raw");
    state.il2cpp_data_dir = state.data_deploy_dir.join("Managed");
    state.variation_dir = config.paths.variation_dir();
    state.engine_assemblies_dir = config.paths.engine_assemblies_dir();
    state.artifacts_dir = config.paths.artifacts_dir.clone();

    let arch = config.target.architecture();
    let libraries = build_dir.join("Libraries");
    state.architectures.insert(
      arch,
      ArchitectureDeployInfo {
        dynamic_lib_deploy_dir: libraries.clone(),
        platform: Platform::new(arch, config.target.sdk()),
      },
    );
    state.library_deploy_dir = libraries;
    Ok(state)
  }

  /// Assign the build directory. A second assignment is an error.
  pub fn set_build_directory(&mut self, path: &Path) -> Result<(), StepError> {
    if let Some(existing) = &self.build_directory {
      return Err(StepError::Invalid(format!(
        "build directory already set to {}",
        existing.display()
      )));
    }
    self.build_directory = Some(path.to_path_buf());
    Ok(())
  }

  pub fn build_directory(&self) -> Result<&Path, StepError> {
    self
      .build_directory
      .as_deref()
      .ok_or_else(|| StepError::Invalid("build directory is not set".to_string()))
  }

  /// Deploy info for `arch`.
  pub fn architecture(&self, arch: Architecture) -> Result<&ArchitectureDeployInfo, StepError> {
    self.architectures.get(&arch).ok_or(StepError::ConfigurationInvalid {
      component: ComponentKind::Target,
      reason: format!("no deploy directory for {}", arch),
    })
  }
}
