use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn clean_removes_build_directory() {
  let env = TestEnv::with_player();
  env.write_file("build/Data/level0", "level");

  env
    .iospack_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Clean complete"));

  assert!(!env.path().join("build").exists());
  assert!(env.path().join("player").exists());
}

#[test]
fn clean_without_output_is_a_no_op() {
  let env = TestEnv::with_player();

  env
    .iospack_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to clean"));
}
