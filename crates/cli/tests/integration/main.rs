//! CLI integration tests.

mod build_tests;
mod common;
mod package_tests;
mod plan_tests;
mod sync_tests;
