//! Scratch player packages for pipeline tests.

use std::path::Path;

use tempfile::TempDir;

use crate::config::PipelineConfig;
use crate::relink::{ConfiguredProbe, ToolchainRegistry};
use crate::util::testutil::write_tree;

pub const PROJECT: &str = include_str!("../project/testdata/project.pbxproj");

pub const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleExecutable</key>
	<string>${EXECUTABLE_NAME}</string>
	<key>CFBundleVersion</key>
	<string>0</string>
</dict>
</plist>
"#;

pub const PREPROCESSOR_H: &str = "#pragma once\n#define PLATFORM_IOS 0\n#define UNITY_USES_GLES 1\n#define UNITY_DEVELOPER_BUILD 0\n";

/// Write a player package under `root`.
pub fn write_player(root: &Path) {
  write_tree(
    root,
    &[
      ("Trampoline/Unity-iPhone.xcodeproj/project.pbxproj", PROJECT),
      ("Trampoline/Info.plist", INFO_PLIST),
      ("Trampoline/Classes/Preprocessor.h", PREPROCESSOR_H),
      ("Trampoline/Classes/main.mm", "int main() { return 0; }\n"),
      ("Trampoline/Classes/.DS_Store", ""),
      ("Trampoline/UnityFramework/Info.plist", INFO_PLIST),
      ("Trampoline/Libraries/libiPhone-lib-il2cpp-dev.a", "archive"),
      ("Trampoline/Libraries/libil2cpp.a", "archive"),
      ("Trampoline/Data/unity default resources", "resources"),
      ("Variations/il2cpp/Developmentarm64_managed/Data/level0", "level"),
      ("Variations/il2cpp/Developmentarm64_managed/Data/Managed/Assembly-CSharp.dll", "dll"),
      ("Variations/il2cpp/Developmentarm64_managed/Data/Resources/unity_builtin_extra", "extra"),
      ("Variations/il2cpp/Managed/UnityEngine.CoreModule.dll", "dll"),
      ("Variations/il2cpp/Managed/UnityEngine.AudioModule.dll", "dll"),
      ("Variations/il2cpp/Managed/UnityEngine.dll", "dll"),
    ],
  );
}

/// Config text for a player at `player`, building into `build`.
pub fn config_text(player: &Path, build: &Path) -> String {
  format!(
    r#"
[general]
product_name = "Game"
company_name = "com.example"
engine_version = "2020.1.0f1"

[paths]
build_dir = "{build}"
player_dir = "{player}"

[orientation]
default = "auto_rotation"

[toolchain]
sdk_path = "/sdk/iPhoneOS.sdk"
linker = "/usr/bin/clang"
"#,
    build = build.display(),
    player = player.display(),
  )
}

/// A player package and its configuration.
pub struct Fixture {
  pub temp: TempDir,
  pub config: PipelineConfig,
}

impl Fixture {
  pub fn new() -> Self {
    Self::with_extra("")
  }

  /// Appends `extra` to the configuration text.
  pub fn with_extra(extra: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let player = temp.path().join("player");
    write_player(&player);
    let text = format!("{}\n{}", config_text(&player, &temp.path().join("build")), extra);
    let config = PipelineConfig::from_toml_str(&text, temp.path()).unwrap();
    Self { temp, config }
  }

  pub fn build_dir(&self) -> &Path {
    &self.config.paths.build_dir
  }

  pub fn player_dir(&self) -> &Path {
    &self.config.paths.player_dir
  }

  pub fn toolchains(&self) -> ToolchainRegistry {
    ToolchainRegistry::new(Box::new(ConfiguredProbe {
      sdk_path: "/sdk/iPhoneOS.sdk".into(),
      linker: "/usr/bin/clang".into(),
      min_os_version: "12.0".into(),
    }))
  }
}
