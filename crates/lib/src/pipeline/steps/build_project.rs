use std::path::PathBuf;

use tracing::debug;

use crate::action::{ActionSpec, ExecOpts};
use crate::config::ComponentKind;
use crate::consts::{DERIVED_DATA_DIR, MAIN_TARGET_NAME, XCODE_PROJECT_NAME};
use crate::pipeline::{BuildStep, StepContext, StepError};
use crate::relink::Relinker;

use super::general;

/// Name of the relinked burst library, without extension.
pub const BURST_LIBRARY_NAME: &str = "lib_burst_generated";

/// Relinks the burst library and declares the `xcodebuild` invocation.
pub struct BuildXcodeProject;

impl BuildStep for BuildXcodeProject {
  fn name(&self) -> &'static str {
    "build-xcode-project"
  }

  fn components(&self) -> &'static [ComponentKind] {
    &[ComponentKind::General]
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let product_name = general(ctx.config)?.product_name.clone();
    let build_dir = ctx.state.build_directory()?.to_path_buf();
    let arch = ctx.config.target.architecture();
    let sdk = ctx.config.target.sdk();
    let deploy_dir = ctx.state.architecture(arch)?.dynamic_lib_deploy_dir.clone();

    let relinked = Relinker::new(ctx.toolchains, sdk, &ctx.state.artifacts_dir, deploy_dir).relink(
      ctx.graph,
      &ctx.config.paths.burst_library,
      arch,
      BURST_LIBRARY_NAME,
    )?;

    let configuration = ctx.config.build_config().as_str();
    let project_dir = build_dir.join(format!("{}.xcodeproj", XCODE_PROJECT_NAME));
    let derived_data = build_dir.join(DERIVED_DATA_DIR);
    let app = ctx.config.app_bundle_path(&product_name);

    let inputs: Vec<PathBuf> = vec![
      relinked.deployed.clone(),
      project_dir.join("project.pbxproj"),
      build_dir.join("Classes").join("Native").join("UnityClassRegistration.cpp"),
      build_dir.join("Classes").join("Preprocessor.h"),
      build_dir.join("Info.plist"),
      build_dir.join("Libraries").join("GameAssembly.dylib"),
    ];

    let opts = ExecOpts::new("xcodebuild")
      .with_args([
        "-scheme".to_string(),
        MAIN_TARGET_NAME.to_string(),
        "-configuration".to_string(),
        configuration.to_string(),
        "-sdk".to_string(),
        sdk.as_str().to_string(),
        "-allowProvisioningUpdates".to_string(),
        "-allowProvisioningDeviceRegistration".to_string(),
        "-derivedDataPath".to_string(),
        derived_data.display().to_string(),
        "-project".to_string(),
        project_dir.display().to_string(),
      ])
      .with_cwd(build_dir.display().to_string());

    ctx.graph.declare_action(
      ActionSpec::exec(format!("Build {}.app", product_name), [app.clone()], inputs, opts).allowing_extra_outputs(),
    )?;

    debug!(app = %app.display(), configuration, "declared Xcode build");
    ctx.state.relinked = Some(relinked);
    Ok(())
  }
}
