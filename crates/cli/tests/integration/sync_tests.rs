//! Sync command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn sync_uploads_assets_then_skips_unchanged() {
  let env = TestEnv::site();
  env.build();

  env
    .stratus_cmd()
    .arg("sync")
    .arg("--store")
    .arg(env.store_dir())
    .assert()
    .success()
    .stdout(predicate::str::contains("Uploaded: 5"));

  assert!(env.store_dir().join("objects/app-1a2b3c.js").is_file());
  assert!(env.store_dir().join("objects/page-data/app-data.json").is_file());

  env
    .stratus_cmd()
    .arg("sync")
    .arg("--store")
    .arg(env.store_dir())
    .assert()
    .success()
    .stdout(predicate::str::contains("Unchanged: 5"));
}

#[test]
fn sync_deletes_stale_objects() {
  let env = TestEnv::site();
  env.build();
  env.stratus_cmd().arg("sync").arg("--store").arg(env.store_dir()).assert().success();

  env.write_file(
    "smaller.json",
    r#"{ "routes": [{ "type": "static", "path": "/styles.css", "filePath": "public/styles.css" }] }"#,
  );
  env
    .stratus_cmd()
    .args(["build", "--input", "smaller.json"])
    .assert()
    .success();

  env
    .stratus_cmd()
    .arg("sync")
    .arg("--store")
    .arg(env.store_dir())
    .assert()
    .success()
    .stdout(predicate::str::contains("Deleted: 4"));

  assert!(!env.store_dir().join("objects/app-1a2b3c.js").exists());
  assert!(env.store_dir().join("objects/styles.css").is_file());
}
