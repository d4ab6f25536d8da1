//! Three-tier configuration merge.
//!
//! Every layered setting in stratus is produced by the same merge with named
//! precedence:
//!
//! | Tier        | Source                                   | Wins over      |
//! |-------------|------------------------------------------|----------------|
//! | `base`      | built-in defaults for the setting        | nothing        |
//! | `user`      | the configuration file                   | `base`         |
//! | `protected` | values derived by stratus itself         | `user`, `base` |
//!
//! Objects merge key by key, recursively. Any other value in a higher tier
//! replaces the lower one wholesale (arrays included). `null` never
//! overrides, so an unset `Option` in a higher tier leaves the lower value in
//! place.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("failed to serialize {tier} tier: {source}")]
  Serialize {
    tier: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("merged settings are invalid: {0}")]
  Deserialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layers {
  pub base: Value,
  pub user: Value,
  pub protected: Value,
}

impl Layers {
  pub fn new<B: Serialize>(base: &B) -> Result<Self, MergeError> {
    Ok(Self {
      base: to_value("base", base)?,
      user: Value::Null,
      protected: Value::Null,
    })
  }

  pub fn user<U: Serialize>(mut self, user: Option<&U>) -> Result<Self, MergeError> {
    if let Some(user) = user {
      self.user = to_value("user", user)?;
    }
    Ok(self)
  }

  pub fn protected<P: Serialize>(mut self, protected: &P) -> Result<Self, MergeError> {
    self.protected = to_value("protected", protected)?;
    Ok(self)
  }

  /// Merge `base`, then `user`, then `protected`.
  pub fn merge(self) -> Value {
    let mut merged = self.base;
    overlay(&mut merged, self.user);
    overlay(&mut merged, self.protected);
    merged
  }

  pub fn resolve<T: DeserializeOwned>(self) -> Result<T, MergeError> {
    serde_json::from_value(self.merge()).map_err(MergeError::Deserialize)
  }
}

fn to_value<T: Serialize>(tier: &'static str, value: &T) -> Result<Value, MergeError> {
  serde_json::to_value(value).map_err(|source| MergeError::Serialize { tier, source })
}

/// Apply `top` over `target` in place.
pub fn overlay(target: &mut Value, top: Value) {
  match (target, top) {
    (_, Value::Null) => {}
    (Value::Object(target), Value::Object(top)) => {
      for (key, value) in top {
        match target.get_mut(&key) {
          Some(existing) => overlay(existing, value),
          None if value.is_null() => {}
          None => {
            target.insert(key, value);
          }
        }
      }
    }
    (target, top) => *target = top,
  }
}

/// Shorthand for the full three-tier merge of typed values.
pub fn merge_layers<T, U, P>(base: &T, user: Option<&U>, protected: &P) -> Result<T, MergeError>
where
  T: Serialize + DeserializeOwned,
  U: Serialize,
  P: Serialize,
{
  Layers::new(base)?.user(user)?.protected(protected)?.resolve()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use serde_json::json;

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Settings {
    timeout: u32,
    memory: u32,
    handler: String,
    tags: Vec<String>,
  }

  #[derive(Serialize)]
  struct UserSettings {
    timeout: Option<u32>,
    memory: Option<u32>,
    handler: Option<String>,
    tags: Option<Vec<String>>,
  }

  fn base() -> Settings {
    Settings {
      timeout: 10,
      memory: 1024,
      handler: "index.handle".to_string(),
      tags: vec!["base".to_string()],
    }
  }

  #[test]
  fn base_tier_applies_when_nothing_overrides() {
    let merged: Settings = merge_layers(&base(), None::<&UserSettings>, &json!({})).unwrap();
    assert_eq!(merged, base());
  }

  #[test]
  fn user_tier_wins_over_base() {
    let user = UserSettings {
      timeout: Some(60),
      memory: None,
      handler: None,
      tags: Some(vec!["user".to_string()]),
    };
    let merged: Settings = merge_layers(&base(), Some(&user), &json!({})).unwrap();

    assert_eq!(merged.timeout, 60);
    assert_eq!(merged.memory, 1024);
    assert_eq!(merged.tags, vec!["user".to_string()]);
  }

  #[test]
  fn protected_tier_wins_over_user() {
    let user = UserSettings {
      timeout: None,
      memory: None,
      handler: Some("evil.handle".to_string()),
      tags: None,
    };
    let merged: Settings = merge_layers(&base(), Some(&user), &json!({ "handler": "index.handle" })).unwrap();
    assert_eq!(merged.handler, "index.handle");
  }

  #[test]
  fn nested_objects_merge_per_key() {
    let mut target = json!({ "env": { "A": "1", "B": "2" } });
    overlay(&mut target, json!({ "env": { "B": "3", "C": null } }));
    assert_eq!(target, json!({ "env": { "A": "1", "B": "3" } }));
  }

  #[test]
  fn invalid_merge_result_is_reported() {
    let err = merge_layers::<Settings, _, _>(&base(), Some(&json!({ "timeout": "soon" })), &json!({})).unwrap_err();
    assert!(matches!(err, MergeError::Deserialize(_)));
  }
}
