use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_materializes_files_and_reports_failed_tools() {
  let env = TestEnv::with_player();

  // Neither the burst library nor xcodebuild exist here, so those actions fail.
  env
    .iospack_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("action(s) failed"));

  let build = env.build_path();
  assert!(build.join("Unity-iPhone.xcodeproj/project.pbxproj").is_file());
  assert!(build.join("Classes/main.mm").is_file());
  assert!(build.join("Game.app/Contents/Resources/Data/level0").is_file());
  assert!(build.join("Data/unity default resources").is_file());
  assert!(build.join("Classes/Native/UnityClassRegistration.cpp").is_file());

  let header = std::fs::read_to_string(build.join("Classes/Preprocessor.h")).unwrap();
  assert!(header.contains("#define UNITY_USES_GLES 0"));
}

#[test]
fn second_build_reuses_unchanged_actions() {
  let env = TestEnv::with_player();

  env.iospack_cmd().arg("build").assert().failure();

  let output = env
    .iospack_cmd()
    .args(["--output", "json", "build"])
    .output()
    .unwrap();
  assert!(!output.status.success());

  let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert!(summary["up_to_date"].as_u64().unwrap() > 0);
  assert!(summary["executed"].as_array().unwrap().is_empty());
  assert!(!summary["failed"].as_array().unwrap().is_empty());
}

#[test]
fn build_nonexistent_config_fails() {
  let env = TestEnv::empty();

  env
    .iospack_cmd()
    .arg("build")
    .arg("missing.toml")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load config"));
}
