//! Pipeline configuration.
//!
//! A build is described by an `iospack.toml` file. It is read once into a
//! [`PipelineConfig`] with every path made absolute; build steps only ever
//! see the typed configuration.
//!
//! # Sections
//!
//! | Section              | Component                  | Required |
//! |----------------------|----------------------------|----------|
//! | `[general]`          | [`ComponentKind::General`] | by steps that name the product |
//! | `[profile]`          | [`ComponentKind::Profile`] | no, defaults to a develop build |
//! | `[paths]`            | [`ComponentKind::Paths`]   | yes |
//! | `[target]`           | [`ComponentKind::Target`]  | no, defaults to an arm64 device |
//! | `[orientation]`      | [`ComponentKind::Orientation`] | by project generation |
//! | `[signing]`          | [`ComponentKind::Signing`] | no, defaults to automatic signing |
//! | `[plist]`            | [`ComponentKind::Plist`]   | no |
//! | `[[native_plugins]]` | [`ComponentKind::NativePlugins`] | no |
//! | `[toolchain]`        | [`ComponentKind::Toolchain`] | no, `xcrun` is used |
//!
//! # Environment Overrides
//!
//! `IOSPACK_BUILD_DIR` and `IOSPACK_PLAYER_DIR` replace `paths.build_dir` and
//! `paths.player_dir`.

mod schema;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::STATE_DIR;
use crate::plist::InfoPlistData;
use crate::relink::{ConfiguredProbe, DEFAULT_MIN_OS_VERSION, ToolchainProbe, XcrunProbe};

pub use schema::{
  BuildConfig, BuildTargetConfig, BuildType, DefaultOrientation, GeneralSettings, NativePlugin, PathSettings,
  PlistSettings, ProfileSettings, ScreenOrientations, SigningPolicy, ToolchainSettings,
};

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "iospack.toml";

/// Overrides `paths.build_dir`.
pub const BUILD_DIR_ENV: &str = "IOSPACK_BUILD_DIR";

/// Overrides `paths.player_dir`.
pub const PLAYER_DIR_ENV: &str = "IOSPACK_PLAYER_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse configuration: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

/// A configuration section a build step can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
  General,
  Profile,
  Paths,
  Target,
  Orientation,
  Signing,
  Plist,
  NativePlugins,
  Toolchain,
}

impl fmt::Display for ComponentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ComponentKind::General => "general",
      ComponentKind::Profile => "profile",
      ComponentKind::Paths => "paths",
      ComponentKind::Target => "target",
      ComponentKind::Orientation => "orientation",
      ComponentKind::Signing => "signing",
      ComponentKind::Plist => "plist",
      ComponentKind::NativePlugins => "native_plugins",
      ComponentKind::Toolchain => "toolchain",
    };
    f.write_str(name)
  }
}

/// Absolute paths used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
  pub build_dir: PathBuf,
  pub player_dir: PathBuf,
  pub playback_engine_dir: PathBuf,
  pub tools_dir: Option<PathBuf>,
  pub artifacts_dir: PathBuf,
  pub burst_library: PathBuf,
}

impl ResolvedPaths {
  /// Player trampoline: the template Xcode project.
  pub fn trampoline_dir(&self) -> PathBuf {
    self.player_dir.join("Trampoline")
  }

  /// Prebuilt player variation deployed into the build directory.
  pub fn variation_dir(&self) -> PathBuf {
    self
      .player_dir
      .join("Variations")
      .join("il2cpp")
      .join("Developmentarm64_managed")
  }

  /// Engine assemblies used for class registration.
  pub fn engine_assemblies_dir(&self) -> PathBuf {
    self.player_dir.join("Variations").join("il2cpp").join("Managed")
  }
}

/// Typed pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
  pub general: Option<GeneralSettings>,
  pub profile: ProfileSettings,
  pub paths: ResolvedPaths,
  pub target: BuildTargetConfig,
  pub orientation: Option<ScreenOrientations>,
  pub signing: Option<SigningPolicy>,
  pub plist: Option<PlistSettings>,
  /// Absolute plugin paths.
  pub native_plugins: Vec<PathBuf>,
  pub toolchain: ToolchainSettings,
}

impl PipelineConfig {
  /// Load `path`. Relative paths in the file are resolved against the
  /// directory containing it.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let base_dir = dunce::canonicalize(parent).map_err(|source| ConfigError::Read {
      path: parent.to_path_buf(),
      source,
    })?;

    let overrides = PathOverrides {
      build_dir: env_path(BUILD_DIR_ENV),
      player_dir: env_path(PLAYER_DIR_ENV),
    };
    let config = Self::resolve(&text, &base_dir, overrides)?;
    debug!(path = %path.display(), build_dir = %config.paths.build_dir.display(), "loaded configuration");
    Ok(config)
  }

  /// Parse configuration text, resolving relative paths against `base_dir`.
  /// Environment overrides are not applied.
  pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
    Self::resolve(text, base_dir, PathOverrides::default())
  }

  fn resolve(text: &str, base_dir: &Path, overrides: PathOverrides) -> Result<Self, ConfigError> {
    let raw: schema::RawConfig = toml::from_str(text)?;
    let resolve = |p: &Path| -> PathBuf {
      if p.is_absolute() {
        p.to_path_buf()
      } else {
        base_dir.join(p)
      }
    };

    let build_dir = resolve(&overrides.build_dir.unwrap_or(raw.paths.build_dir));
    let player_dir = resolve(&overrides.player_dir.unwrap_or(raw.paths.player_dir));
    let playback_engine_dir = raw
      .paths
      .playback_engine_dir
      .as_deref()
      .map(resolve)
      .unwrap_or_else(|| player_dir.clone());
    let artifacts_dir = raw
      .paths
      .artifacts_dir
      .as_deref()
      .map(resolve)
      .unwrap_or_else(|| build_dir.join(STATE_DIR).join("artifacts"));
    let burst_library = raw
      .paths
      .burst_library
      .as_deref()
      .map(resolve)
      .unwrap_or_else(|| artifacts_dir.join("bcl").join("wholeprogram").join("wholeprogram.a"));

    let paths = ResolvedPaths {
      tools_dir: raw.paths.tools_dir.as_deref().map(resolve),
      build_dir,
      player_dir,
      playback_engine_dir,
      artifacts_dir,
      burst_library,
    };

    let config = Self {
      general: raw.general,
      profile: raw.profile,
      paths,
      target: raw.target,
      orientation: raw.orientation,
      signing: raw.signing,
      plist: raw.plist,
      native_plugins: raw.native_plugins.iter().map(|p| resolve(&p.path)).collect(),
      toolchain: raw.toolchain,
    };
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if let Some(general) = &self.general {
      if general.product_name.trim().is_empty() {
        return Err(ConfigError::Invalid("general.product_name must not be empty".to_string()));
      }
      if general.company_name.trim().is_empty() {
        return Err(ConfigError::Invalid("general.company_name must not be empty".to_string()));
      }
    }
    if let Some(SigningPolicy::Manual {
      provisioning_profile, ..
    }) = &self.signing
      && provisioning_profile.is_empty()
    {
      return Err(ConfigError::Invalid(
        "signing.provisioning_profile must not be empty for manual signing".to_string(),
      ));
    }
    Ok(())
  }

  /// Whether the section for `kind` is present.
  pub fn has_component(&self, kind: ComponentKind) -> bool {
    match kind {
      ComponentKind::General => self.general.is_some(),
      ComponentKind::Orientation => self.orientation.is_some(),
      ComponentKind::Signing => self.signing.is_some(),
      ComponentKind::Plist => self.plist.is_some(),
      ComponentKind::Profile
      | ComponentKind::Paths
      | ComponentKind::Target
      | ComponentKind::NativePlugins
      | ComponentKind::Toolchain => true,
    }
  }

  pub fn build_config(&self) -> BuildConfig {
    BuildConfig::from(self.profile.configuration)
  }

  pub fn signing_policy(&self) -> SigningPolicy {
    self.signing.clone().unwrap_or_default()
  }

  /// Path of the built `.app` under the derived data directory.
  pub fn app_bundle_path(&self, product_name: &str) -> PathBuf {
    self
      .paths
      .build_dir
      .join(crate::consts::DERIVED_DATA_DIR)
      .join("Build")
      .join("Products")
      .join(format!("{}-{}", self.build_config().as_str(), self.target.sdk().as_str()))
      .join(format!("{}.app", product_name))
  }

  /// The toolchain probe selected by `[toolchain]`.
  pub fn toolchain_probe(&self) -> Box<dyn ToolchainProbe> {
    let min_os_version = self
      .toolchain
      .min_os_version
      .clone()
      .unwrap_or_else(|| DEFAULT_MIN_OS_VERSION.to_string());

    match (&self.toolchain.sdk_path, &self.toolchain.linker) {
      (Some(sdk_path), Some(linker)) => Box::new(ConfiguredProbe {
        sdk_path: sdk_path.clone(),
        linker: linker.clone(),
        min_os_version,
      }),
      _ => Box::new(XcrunProbe::new(min_os_version)),
    }
  }

  /// `Info.plist` values for this configuration.
  pub fn info_plist_data(&self) -> InfoPlistData {
    let mut data = InfoPlistData::default();
    if let Some(general) = &self.general {
      data.bundle_version = general.bundle_version.clone();
      data.build_number = general.build_number.clone();
    }
    if let Some(orientation) = &self.orientation {
      data.orientations = orientation.available_orientations();
    }
    if let Some(plist) = &self.plist {
      data.display_name = plist.display_name.clone().filter(|n| !n.is_empty());
      data.prerendered_icon = plist.prerendered_icon;
      data.requires_persistent_wifi = plist.requires_persistent_wifi;
      data.requires_full_screen = plist.requires_full_screen;
      if let Some(hidden) = plist.status_bar_hidden {
        data.status_bar_hidden = hidden;
      }
      data.status_bar_style = plist.status_bar_style;
      data.camera_usage = plist.camera_usage.clone();
      data.location_usage = plist.location_usage.clone();
      data.microphone_usage = plist.microphone_usage.clone();
      data.allow_http = plist.allow_http;
      data.url_schemes = plist.url_schemes.clone();
    }
    data
  }
}

#[derive(Debug, Default)]
struct PathOverrides {
  build_dir: Option<PathBuf>,
  player_dir: Option<PathBuf>,
}

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}
