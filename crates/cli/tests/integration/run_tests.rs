use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn run_without_built_app_fails_before_device_discovery() {
  let env = TestEnv::with_player();

  env
    .iospack_cmd()
    .arg("run")
    .assert()
    .failure()
    .stderr(predicate::str::contains("app bundle not found"));
}
