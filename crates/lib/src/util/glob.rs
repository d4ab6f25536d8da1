//! Glob patterns matched against URL paths.
//!
//! Patterns are compiled once into anchored regular expressions:
//!
//! | Syntax   | Matches                                             |
//! |----------|-----------------------------------------------------|
//! | `*`      | any run of characters except `/`                    |
//! | `**`     | any run of characters, `/` included                 |
//! | `**/`    | zero or more whole directories                      |
//! | `?`      | exactly one character other than `/`                |
//! | `{a,b}`  | either alternative (no nesting)                     |
//! | `[a-z]`  | a character class; `[!a-z]` negates                 |
//! | `\c`     | the literal character `c`                           |
//!
//! A pattern must match the whole path, so `/*.js` matches `/main.js` but not
//! `/dir/main.js`.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlobError {
  #[error("unclosed '{{' in glob pattern {0:?}")]
  UnclosedBrace(String),

  #[error("nested '{{' is not supported in glob pattern {0:?}")]
  NestedBrace(String),

  #[error("unclosed '[' in glob pattern {0:?}")]
  UnclosedClass(String),

  #[error("glob pattern {pattern:?} compiled to an invalid expression: {source}")]
  Regex {
    pattern: String,
    #[source]
    source: regex::Error,
  },
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
  pattern: String,
  regex: Regex,
}

impl Glob {
  pub fn new(pattern: &str) -> Result<Self, GlobError> {
    let source = translate(pattern)?;
    let regex = Regex::new(&source).map_err(|source| GlobError::Regex {
      pattern: pattern.to_string(),
      source,
    })?;
    Ok(Self {
      pattern: pattern.to_string(),
      regex,
    })
  }

  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  pub fn is_match(&self, path: &str) -> bool {
    self.regex.is_match(path)
  }
}

impl PartialEq for Glob {
  fn eq(&self, other: &Self) -> bool {
    self.pattern == other.pattern
  }
}

/// Compiles a set of patterns; a path matches the set if any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
  globs: Vec<Glob>,
}

impl GlobSet {
  pub fn new<I, S>(patterns: I) -> Result<Self, GlobError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let globs = patterns
      .into_iter()
      .map(|p| Glob::new(p.as_ref()))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { globs })
  }

  pub fn is_match(&self, path: &str) -> bool {
    self.globs.iter().any(|g| g.is_match(path))
  }

  pub fn is_empty(&self) -> bool {
    self.globs.is_empty()
  }
}

fn translate(pattern: &str) -> Result<String, GlobError> {
  let mut out = String::with_capacity(pattern.len() * 2 + 2);
  out.push('^');

  let mut chars = pattern.chars().peekable();
  let mut in_alternation = false;

  while let Some(c) = chars.next() {
    match c {
      '*' => {
        if chars.peek() == Some(&'*') {
          chars.next();
          if chars.peek() == Some(&'/') {
            chars.next();
            out.push_str("(?:.*/)?");
          } else {
            out.push_str(".*");
          }
        } else {
          out.push_str("[^/]*");
        }
      }
      '?' => out.push_str("[^/]"),
      '{' => {
        if in_alternation {
          return Err(GlobError::NestedBrace(pattern.to_string()));
        }
        in_alternation = true;
        out.push_str("(?:");
      }
      ',' if in_alternation => out.push('|'),
      '}' if in_alternation => {
        in_alternation = false;
        out.push(')');
      }
      '[' => {
        out.push('[');
        if chars.peek() == Some(&'!') {
          chars.next();
          out.push('^');
        }
        let mut closed = false;
        for class_char in chars.by_ref() {
          if class_char == ']' {
            closed = true;
            break;
          }
          if class_char == '\\' || class_char == '[' {
            out.push('\\');
          }
          out.push(class_char);
        }
        if !closed {
          return Err(GlobError::UnclosedClass(pattern.to_string()));
        }
        out.push(']');
      }
      '\\' => {
        if let Some(escaped) = chars.next() {
          out.push_str(&regex::escape(&escaped.to_string()));
        }
      }
      other => out.push_str(&regex::escape(&other.to_string())),
    }
  }

  if in_alternation {
    return Err(GlobError::UnclosedBrace(pattern.to_string()));
  }

  out.push('$');
  Ok(out)
}
