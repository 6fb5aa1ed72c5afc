//! Schema of `iospack.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::platform::{Architecture, SdkKind};
use crate::plist::{InterfaceOrientation, StatusBarStyle};

/// Product identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralSettings {
  pub product_name: String,
  pub company_name: String,
  #[serde(default = "default_bundle_version")]
  pub bundle_version: String,
  #[serde(default = "default_build_number")]
  pub build_number: String,
  /// Engine version written to `UNITY_RUNTIME_VERSION`.
  #[serde(default)]
  pub engine_version: String,
}

fn default_bundle_version() -> String {
  "1.0".to_string()
}

fn default_build_number() -> String {
  "0".to_string()
}

impl GeneralSettings {
  /// Bundle identifier of the produced app.
  pub fn application_id(&self) -> String {
    format!("{}.{}", self.company_name, self.product_name)
  }
}

/// Build type selected by the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
  Debug,
  #[default]
  Develop,
  Release,
}

/// Xcode build configuration used for the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildConfig {
  Debug,
  Release,
  ReleaseForRunning,
}

impl BuildConfig {
  pub fn as_str(self) -> &'static str {
    match self {
      BuildConfig::Debug => "Debug",
      BuildConfig::Release => "Release",
      BuildConfig::ReleaseForRunning => "ReleaseForRunning",
    }
  }
}

impl From<BuildType> for BuildConfig {
  fn from(build_type: BuildType) -> Self {
    match build_type {
      BuildType::Debug => BuildConfig::Debug,
      BuildType::Develop | BuildType::Release => BuildConfig::ReleaseForRunning,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSettings {
  #[serde(default)]
  pub configuration: BuildType,
  /// Also build the player from source inside the playback engine directory.
  #[serde(default)]
  pub install_in_build_folder: bool,
  /// Name of this build configuration, used for per-configuration folders.
  #[serde(default = "default_configuration_name")]
  pub configuration_name: String,
}

fn default_configuration_name() -> String {
  "iOS".to_string()
}

impl Default for ProfileSettings {
  fn default() -> Self {
    Self {
      configuration: BuildType::default(),
      install_in_build_folder: false,
      configuration_name: default_configuration_name(),
    }
  }
}

/// Paths as written in the file. Relative paths are resolved by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
  /// Output directory of the build.
  pub build_dir: PathBuf,
  /// Player package with `Trampoline/` and `Variations/`.
  pub player_dir: PathBuf,
  /// Defaults to `player_dir`.
  #[serde(default)]
  pub playback_engine_dir: Option<PathBuf>,
  /// Directory with `MapFileParser` and the internal call registration tool.
  #[serde(default)]
  pub tools_dir: Option<PathBuf>,
  /// Root for intermediate files. Defaults to `{build_dir}/.iospack/artifacts`.
  #[serde(default)]
  pub artifacts_dir: Option<PathBuf>,
  /// Static library produced by the burst compiler. Defaults to
  /// `{artifacts_dir}/bcl/wholeprogram/wholeprogram.a`.
  #[serde(default)]
  pub burst_library: Option<PathBuf>,
}

/// Device or simulator build, resolved once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BuildTargetConfig {
  Device {
    #[serde(default = "default_device_arch")]
    architecture: Architecture,
  },
  Simulator {
    #[serde(default = "default_simulator_arch")]
    architecture: Architecture,
  },
}

fn default_device_arch() -> Architecture {
  Architecture::Arm64
}

fn default_simulator_arch() -> Architecture {
  Architecture::X86_64
}

impl Default for BuildTargetConfig {
  fn default() -> Self {
    BuildTargetConfig::Device {
      architecture: default_device_arch(),
    }
  }
}

impl BuildTargetConfig {
  pub fn architecture(self) -> Architecture {
    match self {
      BuildTargetConfig::Device { architecture } | BuildTargetConfig::Simulator { architecture } => architecture,
    }
  }

  pub fn sdk(self) -> SdkKind {
    match self {
      BuildTargetConfig::Device { .. } => SdkKind::IphoneOs,
      BuildTargetConfig::Simulator { .. } => SdkKind::IphoneSimulator,
    }
  }
}

/// Default screen orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOrientation {
  Portrait,
  PortraitUpsideDown,
  LandscapeLeft,
  LandscapeRight,
  #[default]
  AutoRotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenOrientations {
  #[serde(default)]
  pub default: DefaultOrientation,
  #[serde(default = "yes")]
  pub allow_portrait: bool,
  #[serde(default = "yes")]
  pub allow_portrait_upside_down: bool,
  #[serde(default = "yes")]
  pub allow_landscape_left: bool,
  #[serde(default = "yes")]
  pub allow_landscape_right: bool,
}

fn yes() -> bool {
  true
}

impl Default for ScreenOrientations {
  fn default() -> Self {
    Self {
      default: DefaultOrientation::AutoRotation,
      allow_portrait: true,
      allow_portrait_upside_down: true,
      allow_landscape_left: true,
      allow_landscape_right: true,
    }
  }
}

impl ScreenOrientations {
  /// Orientations the app supports. A fixed default orientation yields just
  /// that orientation; auto-rotation yields every allowed one.
  pub fn available_orientations(&self) -> Vec<InterfaceOrientation> {
    let auto = self.default == DefaultOrientation::AutoRotation;
    let candidates = [
      (DefaultOrientation::Portrait, self.allow_portrait, InterfaceOrientation::Portrait),
      (
        DefaultOrientation::PortraitUpsideDown,
        self.allow_portrait_upside_down,
        InterfaceOrientation::PortraitUpsideDown,
      ),
      (
        DefaultOrientation::LandscapeLeft,
        self.allow_landscape_left,
        InterfaceOrientation::LandscapeLeft,
      ),
      (
        DefaultOrientation::LandscapeRight,
        self.allow_landscape_right,
        InterfaceOrientation::LandscapeRight,
      ),
    ];

    candidates
      .into_iter()
      .filter(|(fixed, allowed, _)| self.default == *fixed || (auto && *allowed))
      .map(|(_, _, orientation)| orientation)
      .collect()
  }
}

/// How the Xcode project is signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum SigningPolicy {
  /// Xcode-managed signing with an optional team.
  Automatic {
    #[serde(default)]
    team_id: Option<String>,
  },
  /// Fixed team and provisioning profile.
  Manual {
    #[serde(default)]
    team_id: Option<String>,
    provisioning_profile: String,
  },
}

impl Default for SigningPolicy {
  fn default() -> Self {
    SigningPolicy::Automatic { team_id: None }
  }
}

/// Player settings written into `Info.plist`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlistSettings {
  pub display_name: Option<String>,
  pub prerendered_icon: bool,
  pub requires_persistent_wifi: bool,
  pub requires_full_screen: bool,
  pub status_bar_hidden: Option<bool>,
  pub status_bar_style: StatusBarStyle,
  pub camera_usage: Option<String>,
  pub location_usage: Option<String>,
  pub microphone_usage: Option<String>,
  pub allow_http: bool,
  pub url_schemes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativePlugin {
  pub path: PathBuf,
}

/// Fixed toolchain paths. When both paths are set, `xcrun` is not consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
  pub sdk_path: Option<PathBuf>,
  pub linker: Option<PathBuf>,
  pub min_os_version: Option<String>,
}

/// The file as deserialized, before path resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
  #[serde(default)]
  pub general: Option<GeneralSettings>,
  #[serde(default)]
  pub profile: ProfileSettings,
  pub paths: PathSettings,
  #[serde(default)]
  pub target: BuildTargetConfig,
  #[serde(default)]
  pub orientation: Option<ScreenOrientations>,
  #[serde(default)]
  pub signing: Option<SigningPolicy>,
  #[serde(default)]
  pub plist: Option<PlistSettings>,
  #[serde(default)]
  pub native_plugins: Vec<NativePlugin>,
  #[serde(default)]
  pub toolchain: ToolchainSettings,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn auto_rotation_lists_allowed_orientations() {
    let orientations = ScreenOrientations {
      allow_portrait_upside_down: false,
      ..Default::default()
    };
    assert_eq!(
      orientations.available_orientations(),
      vec![
        InterfaceOrientation::Portrait,
        InterfaceOrientation::LandscapeLeft,
        InterfaceOrientation::LandscapeRight,
      ]
    );
  }

  #[test]
  fn fixed_orientation_ignores_allow_flags() {
    let orientations = ScreenOrientations {
      default: DefaultOrientation::LandscapeLeft,
      allow_landscape_left: false,
      ..Default::default()
    };
    assert_eq!(
      orientations.available_orientations(),
      vec![InterfaceOrientation::LandscapeLeft]
    );
  }

  #[test]
  fn auto_rotation_with_nothing_allowed_is_empty() {
    let orientations = ScreenOrientations {
      default: DefaultOrientation::AutoRotation,
      allow_portrait: false,
      allow_portrait_upside_down: false,
      allow_landscape_left: false,
      allow_landscape_right: false,
    };
    assert!(orientations.available_orientations().is_empty());
  }

  #[test]
  fn debug_builds_use_debug_config() {
    assert_eq!(BuildConfig::from(BuildType::Debug), BuildConfig::Debug);
    assert_eq!(BuildConfig::from(BuildType::Release).as_str(), "ReleaseForRunning");
  }

  #[test]
  fn target_resolves_sdk() {
    let target: BuildTargetConfig = toml::from_str("kind = \"simulator\"").unwrap();
    assert_eq!(target.sdk(), SdkKind::IphoneSimulator);
    assert_eq!(target.architecture(), Architecture::X86_64);
  }
}
