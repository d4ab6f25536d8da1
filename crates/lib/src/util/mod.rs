//! Shared utilities.
//!
//! Hashing, glob matching, content-type lookup, and filesystem helpers used
//! across the crate.

pub mod fs;
pub mod glob;
pub mod hash;
pub mod mime;

#[cfg(test)]
pub mod testutil;
