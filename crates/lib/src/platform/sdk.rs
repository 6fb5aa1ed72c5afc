use std::fmt;

use serde::{Deserialize, Serialize};

/// Apple SDK a build is compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkKind {
  /// Physical devices.
  IphoneOs,
  /// The iOS simulator.
  IphoneSimulator,
}

impl SdkKind {
  /// Returns the SDK name used by `xcrun --sdk` and in derived data product folders.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::IphoneOs => "iphoneos",
      Self::IphoneSimulator => "iphonesimulator",
    }
  }

  /// Returns the clang target environment suffix for this SDK.
  pub fn target_suffix(&self) -> &'static str {
    match self {
      Self::IphoneOs => "",
      Self::IphoneSimulator => "-simulator",
    }
  }
}

impl fmt::Display for SdkKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
