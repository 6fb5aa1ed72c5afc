use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU architectures a native artifact can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
  Arm64,
  Armv7,
  X86_64,
}

impl Architecture {
  /// Returns the identifier Apple toolchains use for this architecture (`-arch`).
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arm64 => "arm64",
      Self::Armv7 => "armv7",
      Self::X86_64 => "x86_64",
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Architecture {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "arm64" | "aarch64" => Ok(Self::Arm64),
      "armv7" => Ok(Self::Armv7),
      "x86_64" => Ok(Self::X86_64),
      other => Err(format!("unsupported architecture: {}", other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_aliases() {
    assert_eq!("aarch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
    assert_eq!("arm64".parse::<Architecture>().unwrap(), Architecture::Arm64);
    assert!("mips".parse::<Architecture>().is_err());
  }

  #[test]
  fn serde_uses_lowercase() {
    let json = serde_json::to_string(&Architecture::X86_64).unwrap();
    assert_eq!(json, "\"x86_64\"");
  }
}
