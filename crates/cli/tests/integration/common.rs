//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

const PROJECT: &str = include_str!("../../../lib/src/project/testdata/project.pbxproj");

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleExecutable</key>
	<string>${EXECUTABLE_NAME}</string>
</dict>
</plist>
"#;

/// Files of a minimal player package, relative to the player directory.
const PLAYER_FILES: &[(&str, &str)] = &[
  ("Trampoline/Unity-iPhone.xcodeproj/project.pbxproj", PROJECT),
  ("Trampoline/Info.plist", INFO_PLIST),
  ("Trampoline/Classes/Preprocessor.h", "#define UNITY_USES_GLES 1\n"),
  ("Trampoline/Classes/main.mm", "int main() { return 0; }\n"),
  ("Trampoline/Libraries/libiPhone-lib-il2cpp-dev.a", "archive"),
  ("Trampoline/Data/unity default resources", "resources"),
  ("Variations/il2cpp/Developmentarm64_managed/Data/level0", "level"),
  ("Variations/il2cpp/Managed/UnityEngine.CoreModule.dll", "dll"),
];

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding a player package, a
/// build directory and an `iospack.toml` pointing at both.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// A player package with a configuration using a fixed toolchain.
  pub fn with_player() -> Self {
    Self::with_player_and_config("")
  }

  /// Like [`TestEnv::with_player`], appending `extra` to the configuration.
  pub fn with_player_and_config(extra: &str) -> Self {
    let env = Self::empty();
    for (path, content) in PLAYER_FILES {
      env.write_file(&format!("player/{}", path), content);
    }
    let config = format!(
      r#"
[general]
product_name = "Game"
company_name = "com.example"
engine_version = "2020.1.0f1"

[paths]
build_dir = "build"
player_dir = "player"

[orientation]
default = "portrait"

[toolchain]
sdk_path = "/sdk/iPhoneOS.sdk"
linker = "/usr/bin/clang"

{}
"#,
      extra
    );
    std::fs::write(&env.config_path, config).unwrap();
    env
  }

  /// An empty test environment without a configuration file.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("iospack.toml");
    Self { temp, config_path }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Build directory named by the configuration.
  pub fn build_path(&self) -> PathBuf {
    let root = dunce::canonicalize(self.temp.path()).unwrap();
    root.join("build")
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Get a pre-configured Command for the iospack binary.
  ///
  /// Runs from the temp directory with the path override variables cleared.
  pub fn iospack_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("iospack");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("IOSPACK_BUILD_DIR");
    cmd.env_remove("IOSPACK_PLAYER_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
