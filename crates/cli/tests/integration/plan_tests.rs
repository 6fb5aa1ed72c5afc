use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_lists_declared_actions() {
  let env = TestEnv::with_player();

  env
    .iospack_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("Plan:"))
    .stdout(predicate::str::contains("generate-xcode-project"))
    .stdout(predicate::str::contains("Build Game.app"));
}

#[test]
fn plan_does_not_touch_the_build_directory() {
  let env = TestEnv::with_player();

  env.iospack_cmd().arg("plan").assert().success();

  assert!(!env.build_path().exists());
}

#[test]
fn plan_json_includes_relink_and_project_outputs() {
  let env = TestEnv::with_player();

  let output = env
    .iospack_cmd()
    .args(["--output", "json", "plan"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let steps: Vec<&str> = plan["steps"].as_array().unwrap().iter().filter_map(|s| s.as_str()).collect();
  assert_eq!(
    steps,
    [
      "copy-default-resources",
      "setup-native-plugins",
      "setup-player-files",
      "generate-xcode-project",
      "build-xcode-project"
    ]
  );

  let actions = plan["actions"].as_array().unwrap();
  let project = env.build_path().join("Unity-iPhone.xcodeproj/project.pbxproj");
  assert!(actions.iter().any(|a| {
    a["outputs"]
      .as_array()
      .unwrap()
      .iter()
      .any(|o| o.as_str() == Some(project.to_str().unwrap()))
  }));
  assert!(actions.iter().any(|a| a["kind"] == "exec" && a["label"].as_str().unwrap().starts_with("Relink")));
}

#[test]
fn plan_fails_when_orientation_section_missing() {
  let env = TestEnv::with_player();
  env.write_file(
    "iospack.toml",
    r#"
[general]
product_name = "Game"
company_name = "com.example"
engine_version = "2020.1.0f1"

[paths]
build_dir = "build"
player_dir = "player"
"#,
  );

  env
    .iospack_cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("generate-xcode-project"));
}

#[test]
fn plan_rejects_manual_signing_without_profile() {
  let env = TestEnv::with_player_and_config("[signing]\nstyle = \"manual\"\nprovisioning_profile = \"\"\n");

  env
    .iospack_cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("provisioning_profile"));
}
