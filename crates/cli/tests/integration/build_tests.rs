//! Build command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_writes_manifest_and_asset_groups() {
  let env = TestEnv::site();

  env
    .stratus_cmd()
    .args(["build", "--input", "generator.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Routes: 7"))
    .stdout(predicate::str::contains("Functions: 1"));

  let manifest = env.read_json(".stratus/manifest.json");
  assert_eq!(manifest["version"], 1);
  assert_eq!(manifest["routes"].as_array().unwrap().len(), 7);

  let groups = manifest["assetGroups"].as_array().unwrap();
  let script = groups
    .iter()
    .find(|g| g["assets"].as_array().unwrap().iter().any(|a| a["destinationKey"] == "app-1a2b3c.js"))
    .expect("script group");
  assert_eq!(script["cacheControl"], "public, max-age=31536000, immutable");

  let hash = script["hash"].as_str().unwrap();
  assert!(env.out_dir().join("assets").join(hash).join("app-1a2b3c.js").is_file());
}

#[test]
fn build_strips_security_headers() {
  let env = TestEnv::site();
  env.build();

  let manifest = env.read_json(".stratus/manifest.json");
  let index = manifest["routes"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["path"] == "/")
    .unwrap();
  let keys: Vec<&str> = index["headers"]
    .as_array()
    .unwrap()
    .iter()
    .map(|h| h["key"].as_str().unwrap())
    .collect();
  assert_eq!(keys, vec!["cache-control"]);
}

#[test]
fn build_applies_user_cache_rules() {
  let env = TestEnv::site();
  env.write_file(
    "stratus.toml",
    r#"
[[cache_control]]
pattern = "/*.css"
policy = "no-cache"
"#,
  );
  env.build();

  let manifest = env.read_json(".stratus/manifest.json");
  let css = manifest["routes"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["path"] == "/styles.css")
    .unwrap();
  assert_eq!(css["headers"][0]["value"], "public, max-age=0, must-revalidate");
}

#[test]
fn build_warns_about_missing_files() {
  let env = TestEnv::site();
  std::fs::remove_file(env.root().join("public/styles.css")).unwrap();

  env
    .stratus_cmd()
    .args(["build", "--input", "generator.json"])
    .assert()
    .success()
    .stderr(predicate::str::contains("public/styles.css"));
}

#[test]
fn build_rejects_dangling_function_reference() {
  let env = TestEnv::site();
  env.write_file(
    "broken.json",
    r#"{ "routes": [{ "type": "function", "path": "/api/x", "functionId": "missing" }], "functions": [] }"#,
  );

  env
    .stratus_cmd()
    .args(["build", "--input", "broken.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing"));
}

#[test]
fn build_json_output() {
  let env = TestEnv::site();

  let output = env
    .stratus_cmd()
    .args(["--format", "json", "build", "--input", "generator.json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
  assert_eq!(json["functions"], 1);
  assert_eq!(json["assets"]["files_written"], 5);
}
