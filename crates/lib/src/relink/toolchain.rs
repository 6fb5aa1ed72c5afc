//! Toolchain discovery.
//!
//! A [`Toolchain`] describes the linker and SDK used to build for one
//! [`Platform`]. Toolchains are resolved through a [`ToolchainProbe`] and
//! memoized by [`ToolchainRegistry`], which is created per invocation and
//! passed explicitly to the code that needs it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use super::RelinkError;
use crate::platform::{Architecture, Platform, SdkKind};

/// Extension Apple toolchains give loadable bundles.
pub const DYNAMIC_LIBRARY_EXTENSION: &str = "bundle";

/// Minimum deployment target when none is configured.
pub const DEFAULT_MIN_OS_VERSION: &str = "12.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  pub platform: Platform,
  pub sdk_path: PathBuf,
  /// Driver used for linking, usually `clang`.
  pub linker: PathBuf,
  pub dynamic_library_extension: String,
  pub min_os_version: String,
}

impl Toolchain {
  pub fn target_triple(&self) -> String {
    self.platform.triple(&self.min_os_version)
  }
}

/// Resolves a toolchain for a platform.
pub trait ToolchainProbe {
  fn probe(&self, platform: Platform) -> Result<Toolchain, RelinkError>;
}

/// Finds the SDK and linker through `xcrun`.
#[derive(Debug, Clone)]
pub struct XcrunProbe {
  min_os_version: String,
}

impl XcrunProbe {
  pub fn new(min_os_version: impl Into<String>) -> Self {
    Self {
      min_os_version: min_os_version.into(),
    }
  }

  fn xcrun(&self, platform: Platform, args: &[&str]) -> Result<String, RelinkError> {
    let output = Command::new("xcrun")
      .arg("--sdk")
      .arg(platform.sdk.as_str())
      .args(args)
      .output()
      .map_err(|e| RelinkError::Probe {
        platform,
        message: format!("failed to run xcrun: {}", e),
      })?;

    if !output.status.success() {
      return Err(RelinkError::Probe {
        platform,
        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

impl ToolchainProbe for XcrunProbe {
  fn probe(&self, platform: Platform) -> Result<Toolchain, RelinkError> {
    let sdk_path = self.xcrun(platform, &["--show-sdk-path"])?;
    let linker = self.xcrun(platform, &["--find", "clang"])?;
    debug!(%platform, sdk = %sdk_path, linker = %linker, "probed toolchain");

    Ok(Toolchain {
      platform,
      sdk_path: PathBuf::from(sdk_path),
      linker: PathBuf::from(linker),
      dynamic_library_extension: DYNAMIC_LIBRARY_EXTENSION.to_string(),
      min_os_version: self.min_os_version.clone(),
    })
  }
}

/// Uses fixed paths for every platform. Lets the pipeline be planned on hosts
/// without Xcode.
#[derive(Debug, Clone)]
pub struct ConfiguredProbe {
  pub sdk_path: PathBuf,
  pub linker: PathBuf,
  pub min_os_version: String,
}

impl ToolchainProbe for ConfiguredProbe {
  fn probe(&self, platform: Platform) -> Result<Toolchain, RelinkError> {
    Ok(Toolchain {
      platform,
      sdk_path: self.sdk_path.clone(),
      linker: self.linker.clone(),
      dynamic_library_extension: DYNAMIC_LIBRARY_EXTENSION.to_string(),
      min_os_version: self.min_os_version.clone(),
    })
  }
}

/// Memoizes probed toolchains by architecture and SDK.
pub struct ToolchainRegistry {
  probe: Box<dyn ToolchainProbe>,
  toolchains: HashMap<(Architecture, SdkKind), Toolchain>,
}

impl ToolchainRegistry {
  pub fn new(probe: Box<dyn ToolchainProbe>) -> Self {
    Self {
      probe,
      toolchains: HashMap::new(),
    }
  }

  /// The toolchain for `arch` and `sdk`, probing it on first use.
  pub fn get(&mut self, arch: Architecture, sdk: SdkKind) -> Result<&Toolchain, RelinkError> {
    match self.toolchains.entry((arch, sdk)) {
      Entry::Occupied(entry) => Ok(entry.into_mut()),
      Entry::Vacant(entry) => {
        let toolchain = self.probe.probe(Platform::new(arch, sdk))?;
        Ok(entry.insert(toolchain))
      }
    }
  }

  pub fn len(&self) -> usize {
    self.toolchains.len()
  }

  pub fn is_empty(&self) -> bool {
    self.toolchains.is_empty()
  }
}

impl std::fmt::Debug for ToolchainRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ToolchainRegistry")
      .field("toolchains", &self.toolchains)
      .finish_non_exhaustive()
  }
}
