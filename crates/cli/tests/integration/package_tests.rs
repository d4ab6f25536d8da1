//! Package and synth command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

/// Point the bundler at a shell script that copies the entry to the outfile.
#[cfg(unix)]
fn with_fake_bundler(env: &TestEnv, extra: &str) {
  let script = env.root().join("fake-esbuild.sh");
  env.write_file(
    "stratus.toml",
    &format!("[bundler]\ncommand = \"sh {}\"\nparallelism = 2\n{extra}", script.display()),
  );
}

#[cfg(unix)]
#[test]
fn package_bundles_each_function() {
  let env = TestEnv::site();
  with_fake_bundler(&env, "");
  env.build();

  env
    .stratus_cmd()
    .arg("package")
    .assert()
    .success()
    .stdout(predicate::str::contains("Packaged 1 function(s)"));

  let dir = env.out_dir().join("functions/fn-hello");
  assert!(dir.join("index.js").is_file());
  assert!(dir.join("package.json").is_file());
  assert!(!dir.join("handler.js").exists());
}

#[cfg(unix)]
#[test]
fn package_writes_dockerfile_for_container_functions() {
  let env = TestEnv::site();
  with_fake_bundler(&env, "\n[executors.fn-hello]\ntarget = \"container\"\nport = 3000\n");
  env.build();

  env.stratus_cmd().arg("package").assert().success();

  let dockerfile = std::fs::read_to_string(env.out_dir().join("functions/fn-hello/Dockerfile")).unwrap();
  assert!(dockerfile.contains("EXPOSE 3000"));
}

#[cfg(unix)]
#[test]
fn package_skips_disabled_functions() {
  let env = TestEnv::site();
  with_fake_bundler(&env, "\n[executors.fn-hello]\ntarget = \"disabled\"\n");
  env.build();

  env
    .stratus_cmd()
    .arg("package")
    .assert()
    .success()
    .stdout(predicate::str::contains("Skipped fn-hello"));

  assert!(!env.out_dir().join("functions/fn-hello").exists());
}

#[test]
fn package_reports_bundler_failure() {
  let env = TestEnv::site();
  env.write_file("stratus.toml", "[bundler]\ncommand = \"stratus-missing-bundler\"\n");
  env.build();

  env
    .stratus_cmd()
    .arg("package")
    .assert()
    .failure()
    .stderr(predicate::str::contains("fn-hello"));

  assert!(!env.out_dir().join("functions/fn-hello").exists());
}

#[cfg(unix)]
#[test]
fn synth_writes_stack_after_packaging() {
  let env = TestEnv::site();
  with_fake_bundler(&env, "");
  env.build();
  env.stratus_cmd().arg("package").assert().success();

  env
    .stratus_cmd()
    .arg("synth")
    .assert()
    .success()
    .stdout(predicate::str::contains("Synthesized"));

  let stack = env.read_json(".stratus/stack.json");
  let kinds: Vec<&str> = stack["resources"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["type"].as_str().unwrap())
    .collect();
  assert!(kinds.contains(&"bucket"));
  assert!(kinds.contains(&"lambda-function"));
  assert!(kinds.contains(&"distribution"));
}

#[test]
fn synth_requires_packaged_functions() {
  let env = TestEnv::site();
  env.build();

  env
    .stratus_cmd()
    .arg("synth")
    .assert()
    .failure()
    .stderr(predicate::str::contains("has not been packaged"));
}
