//! Turns the trampoline into the project that is built.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::action::{ActionSpec, ExecOpts};
use crate::codegen::{class_registration_source, module_names, replace_defines};
use crate::config::{ComponentKind, SigningPolicy};
use crate::consts::XCODE_PROJECT_NAME;
use crate::deploy::{DeployRules, plan_deployments};
use crate::pipeline::{BuildStep, StepContext, StepError};
use crate::plist::update_info_plist;
use crate::project::{BuildPhaseKind, Guid, PbxProject, SUBFOLDER_EXECUTABLES, SUBFOLDER_FRAMEWORKS};

use super::general;

const BURST_STATIC_LIBRARY: &str = "Libraries/lib_burst_generated64.a";
const GAME_ASSEMBLY: &str = "Libraries/GameAssembly.dylib";
const BURST_BUNDLE: &str = "Libraries/lib_burst_generated.bundle";
const FRAMEWORK_PRODUCT: &str = "Products/UnityFramework.framework";
const CLASS_REGISTRATION: &str = "Classes/Native/UnityClassRegistration.cpp";
const ICALL_REGISTRATION: &str = "Classes/Native/UnityICallRegistration.cpp";
const PREPROCESSOR: &str = "Classes/Preprocessor.h";

/// Generates the Xcode project, class registration and patched headers.
pub struct GenerateXcodeProject;

impl BuildStep for GenerateXcodeProject {
  fn name(&self) -> &'static str {
    "generate-xcode-project"
  }

  fn components(&self) -> &'static [ComponentKind] {
    &[ComponentKind::General, ComponentKind::Orientation]
  }

  fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let plist_data = ctx.config.info_plist_data();
    if plist_data.orientations.is_empty() {
      return Err(StepError::ConfigurationInvalid {
        component: ComponentKind::Orientation,
        reason: "no screen orientation is enabled".to_string(),
      });
    }

    let general = general(ctx.config)?;
    let build_dir = ctx.state.build_directory()?.to_path_buf();
    let trampoline = ctx.config.paths.trampoline_dir();

    copy_trampoline(ctx, &trampoline, &build_dir)?;

    let project_file = trampoline
      .join(format!("{}.xcodeproj", XCODE_PROJECT_NAME))
      .join("project.pbxproj");
    let mut project = PbxProject::load(&project_file)?;
    let main_target = project.main_target_guid()?;
    let framework_target = project.framework_target_guid()?;
    let project_target = project.project_guid();
    let build_targets = [framework_target.clone(), main_target.clone()];
    let all_targets = [framework_target.clone(), main_target.clone(), project_target.clone()];

    if let Some(file) = project.find_file_by_real_path(BURST_STATIC_LIBRARY) {
      project.remove_file(&file);
    }
    add_dynamic_library(&mut project, &framework_target, GAME_ASSEMBLY, true, SUBFOLDER_EXECUTABLES)?;
    add_dynamic_library(&mut project, &main_target, BURST_BUNDLE, false, SUBFOLDER_FRAMEWORKS)?;

    // Signing on copy strips the signature of the embedded game assembly.
    if let Some(framework) = project.find_file_by_project_path(FRAMEWORK_PRODUCT) {
      project.set_code_sign_on_copy(&main_target, "Embed Frameworks", &framework, false)?;
    }

    project.set_build_setting(&[main_target.clone()], "PRODUCT_NAME", &general.product_name)?;
    project.set_build_setting(
      &[main_target.clone()],
      "PRODUCT_BUNDLE_IDENTIFIER",
      &format!("{}.${{PRODUCT_NAME:rfc1123identifier}}", general.company_name),
    )?;
    project.set_build_setting(&[project_target], "PRODUCT_NAME_APP", &general.product_name)?;
    project.set_build_setting(&build_targets, "ARCHS", ctx.config.target.architecture().as_str())?;
    project.set_build_setting(&build_targets, "UNITY_RUNTIME_VERSION", &general.engine_version)?;
    project.set_build_setting(&build_targets, "UNITY_SCRIPTING_BACKEND", "il2cpp")?;
    apply_signing(&mut project, &main_target, &framework_target, &ctx.config.signing_policy())?;
    project.set_build_setting(&build_targets, "CODE_SIGN_IDENTITY[sdk=iphoneos*]", "iPhone Developer")?;
    let sdk = ctx.config.target.sdk().as_str();
    project.set_build_setting(&all_targets, "SDKROOT", sdk)?;
    project.set_build_setting(&all_targets, "SUPPORTED_PLATFORMS", sdk)?;
    for target in &build_targets {
      project.update_build_setting(target, "OTHER_CFLAGS", &[], &["-mno-thumb"])?;
    }

    let assemblies = engine_assemblies(&ctx.state.engine_assemblies_dir)?;
    declare_class_registration(ctx, &assemblies, &build_dir)?;
    let class_registration = project.add_file(CLASS_REGISTRATION, CLASS_REGISTRATION)?;
    project.add_file_to_build_phase(&framework_target, BuildPhaseKind::Sources, &class_registration)?;

    if declare_icall_registration(ctx, &assemblies, &build_dir)? {
      let icall = project.add_file(ICALL_REGISTRATION, ICALL_REGISTRATION)?;
      project.add_file_to_build_phase(&framework_target, BuildPhaseKind::Sources, &icall)?;
    }

    project.remove_framework(&framework_target, "OpenGLES.framework")?;
    project.add_framework(&framework_target, "Metal.framework", false)?;

    let header = read(&trampoline.join(PREPROCESSOR))?;
    let header = replace_defines(
      &header,
      &[("PLATFORM_IOS", true), ("UNITY_USES_GLES", false), ("UNITY_DEVELOPER_BUILD", true)],
    )?;
    ctx.graph.declare_write(&build_dir.join(PREPROCESSOR), &header)?;

    let template_plist = trampoline.join("Info.plist");
    let deployed_plist = build_dir.join("Info.plist");
    match update_info_plist(&read(&template_plist)?, &plist_data) {
      Ok(text) => {
        let patched = ctx.state.artifacts_dir.join("iosinfoplist").join("Info.plist");
        ctx.graph.declare_write(&patched, &text)?;
        ctx.graph.declare_copy(&deployed_plist, &patched)?;
      }
      Err(e) => {
        warn!(path = %template_plist.display(), error = %e, "failed to update Info.plist, deploying it unchanged");
        ctx.graph.declare_copy(&deployed_plist, &template_plist)?;
      }
    }

    let project_out = build_dir
      .join(format!("{}.xcodeproj", XCODE_PROJECT_NAME))
      .join("project.pbxproj");
    ctx.graph.declare_write(&project_out, &project.serialize())?;

    ctx.graph.declare_write(&build_dir.join("Classes").join("pch-c.h"), "")?;
    ctx.graph.declare_write(&build_dir.join("Classes").join("pch-cpp.hpp"), "")?;

    debug!(project = %project_out.display(), "declared Xcode project");
    Ok(())
  }
}

fn read(path: &Path) -> Result<String, StepError> {
  fs::read_to_string(path).map_err(|source| StepError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn copy_trampoline(ctx: &mut StepContext<'_>, trampoline: &Path, build_dir: &Path) -> Result<(), StepError> {
  let plan = plan_deployments(trampoline, build_dir, &DeployRules::trampoline(XCODE_PROJECT_NAME))?;
  plan.declare(ctx.graph)?;

  ctx.graph.declare_copy(
    &build_dir.join("Libraries").join("libiPhone-lib.a"),
    &trampoline.join("Libraries").join("libiPhone-lib-il2cpp-dev.a"),
  )?;

  match &ctx.config.paths.tools_dir {
    Some(tools) => {
      ctx.graph.declare_copy(
        &build_dir.join("MapFileParser"),
        &tools.join("MapFileParser").join("MapFileParser"),
      )?;
    }
    None => debug!("no tools directory configured, skipping MapFileParser"),
  }
  Ok(())
}

fn add_dynamic_library(
  project: &mut PbxProject,
  target: &Guid,
  path: &str,
  link: bool,
  subfolder_spec: &str,
) -> Result<(), StepError> {
  let file = project.add_file(path, path)?;
  if link {
    project.add_file_to_build_phase(target, BuildPhaseKind::Frameworks, &file)?;
  }
  project.add_file_to_copy_files(target, &file, None, subfolder_spec)?;
  Ok(())
}

fn apply_signing(
  project: &mut PbxProject,
  main_target: &Guid,
  framework_target: &Guid,
  policy: &SigningPolicy,
) -> Result<(), StepError> {
  let both = [main_target.clone(), framework_target.clone()];
  match policy {
    SigningPolicy::Automatic { team_id } => {
      if let Some(team) = team_id {
        project.set_build_setting(&both, "DEVELOPMENT_TEAM", team)?;
      }
    }
    SigningPolicy::Manual {
      team_id,
      provisioning_profile,
    } => {
      project.set_build_setting(&both, "CODE_SIGN_STYLE", "Manual")?;
      if let Some(team) = team_id {
        project.set_build_setting(&both, "DEVELOPMENT_TEAM", team)?;
      }
      project.set_build_setting(
        &[main_target.clone()],
        "PROVISIONING_PROFILE_SPECIFIER",
        provisioning_profile,
      )?;
      project.set_target_attribute("ProvisioningStyle", "Manual");
    }
  }
  Ok(())
}

/// `.dll` files of the engine assemblies directory, sorted. A missing
/// directory has no assemblies.
fn engine_assemblies(dir: &Path) -> Result<Vec<PathBuf>, StepError> {
  if !dir.is_dir() {
    debug!(dir = %dir.display(), "no engine assemblies directory");
    return Ok(Vec::new());
  }

  let entries = fs::read_dir(dir).map_err(|source| StepError::Io {
    path: dir.to_path_buf(),
    source,
  })?;
  let mut dlls = Vec::new();
  for entry in entries {
    let path = entry
      .map_err(|source| StepError::Io {
        path: dir.to_path_buf(),
        source,
      })?
      .path();
    if path.is_file() && path.extension().is_some_and(|e| e == "dll") {
      dlls.push(path);
    }
  }
  dlls.sort();
  Ok(dlls)
}

fn file_name(path: &Path) -> &str {
  path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

fn declare_class_registration(
  ctx: &mut StepContext<'_>,
  assemblies: &[PathBuf],
  build_dir: &Path,
) -> Result<(), StepError> {
  let modules = module_names(assemblies.iter().map(|p| file_name(p)))?;
  let generated = ctx
    .state
    .artifacts_dir
    .join("iosclassregistration")
    .join("UnityClassRegistration.cpp");
  ctx.graph.declare_write(&generated, &class_registration_source(&modules))?;
  ctx.graph.declare_copy(&build_dir.join(CLASS_REGISTRATION), &generated)?;
  debug!(modules = modules.len(), "declared class registration");
  Ok(())
}

/// Declare the internal call registration tool. Returns whether it was
/// declared.
fn declare_icall_registration(
  ctx: &mut StepContext<'_>,
  assemblies: &[PathBuf],
  build_dir: &Path,
) -> Result<bool, StepError> {
  let inputs: Vec<PathBuf> = assemblies
    .iter()
    .filter(|p| {
      let name = file_name(p);
      name.ends_with("Module.dll") || name == "UnityEngine.dll"
    })
    .cloned()
    .collect();
  if inputs.is_empty() {
    return Ok(false);
  }

  let Some(tools) = &ctx.config.paths.tools_dir else {
    warn!("no tools directory configured, skipping internal call registration");
    return Ok(false);
  };

  let output = build_dir.join(ICALL_REGISTRATION);
  let assembly_list: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
  let opts = ExecOpts::new(tools.join("MonoBleedingEdge").join("bin").join("mono").to_string_lossy()).with_args([
    tools
      .join("InternalCallRegistrationWriter")
      .join("InternalCallRegistrationWriter.exe")
      .display()
      .to_string(),
    format!("-output={}", output.display()),
    format!("-summary={}", build_dir.join("ICallSummary.txt").display()),
    format!("-assembly={}", assembly_list.join(";")),
  ]);

  ctx.graph.declare_action(
    ActionSpec::exec("Generating Internal Call Registration", [output], inputs, opts).allowing_extra_outputs(),
  )?;
  Ok(true)
}
