pub mod arch;
pub mod sdk;

use std::fmt;

pub use arch::Architecture;
pub use sdk::SdkKind;

/// Target identifier combining architecture and SDK (e.g., "arm64-apple-ios12.0").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Architecture,
  pub sdk: SdkKind,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Architecture, sdk: SdkKind) -> Self {
    Self { arch, sdk }
  }

  /// Returns the clang target triple for the given minimum OS version.
  pub fn triple(&self, min_os: &str) -> String {
    format!("{}-apple-ios{}{}", self.arch, min_os, self.sdk.target_suffix())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.arch, self.sdk)
  }
}
