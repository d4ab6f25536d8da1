//! Generator input: routes and function definitions.
//!
//! The generator hands over one immutable snapshot per build, read from a JSON
//! document of the form `{ "routes": [...], "functions": [...] }`.

mod types;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use types::*;

#[derive(Debug, Error)]
pub enum InputError {
  #[error("failed to read generator output {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse generator output {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Everything the generator produced for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput {
  #[serde(default)]
  pub routes: Vec<Route>,
  #[serde(default)]
  pub functions: Vec<FunctionDefinition>,
}

impl GeneratorOutput {
  pub fn load(path: &Path) -> Result<Self, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Read {
      path: path.display().to_string(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| InputError::Parse {
      path: path.display().to_string(),
      source,
    })
  }
}
