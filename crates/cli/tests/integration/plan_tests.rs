//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_lists_behaviors() {
  let env = TestEnv::site();
  env.build();

  env
    .stratus_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("/api/hello"))
    .stdout(predicate::str::contains("/_assets/*"))
    .stdout(predicate::str::contains("(default)"));
}

#[test]
fn plan_honors_assets_prefix() {
  let env = TestEnv::site();
  env.write_file("stratus.toml", "assets_prefix = \"/static-files\"\n");
  env.build();

  env
    .stratus_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("/static-files/*"));
}

#[test]
fn plan_omits_disabled_functions() {
  let env = TestEnv::site();
  env.write_file("stratus.toml", "[executors.fn-hello]\ntarget = \"disabled\"\n");
  env.build();

  env
    .stratus_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("/api/hello").not())
    .stdout(predicate::str::contains("fn-hello is disabled"));
}

#[test]
fn plan_json_output() {
  let env = TestEnv::site();
  env.build();

  let output = env
    .stratus_cmd()
    .args(["plan", "--format", "json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
  assert_eq!(json["executors"].as_array().unwrap().len(), 1);
  assert!(json["plan"]["default_behavior"].is_object());
}

#[test]
fn plan_without_build_fails() {
  let env = TestEnv::site();

  env
    .stratus_cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("stratus build"));
}
