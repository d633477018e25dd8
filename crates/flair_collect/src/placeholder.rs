use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Name of the style variable standing in for one dynamic interpolation.
///
/// Renders as `--<file>--<sequence:05>-<call site>-<block>-<interpolation>`. Every component is
/// derived from the position of the interpolation in the source, so unchanged input always
/// yields the same tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderToken {
  pub file_id: String,
  pub sequence_id: usize,
  pub call_site_index: usize,
  pub block_name: String,
  pub interpolation_index: usize,
}

impl PlaceholderToken {
  /// `var(<token>)`, the text spliced into the style template.
  pub fn var_reference(&self) -> String {
    format!("var({self})")
  }
}

impl fmt::Display for PlaceholderToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "--{}--{:05}-{}-{}-{}",
      self.file_id,
      self.sequence_id,
      self.call_site_index,
      self.block_name,
      self.interpolation_index
    )
  }
}

/// File component of every token issued for `path`: the file stem with anything outside
/// `[A-Za-z0-9_-]` replaced by `_`.
pub fn file_id(path: &Path) -> String {
  let stem = path
    .file_stem()
    .map(|stem| stem.to_string_lossy())
    .unwrap_or_default();

  if stem.is_empty() {
    return "_".to_string();
  }

  stem
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("placeholder token {0} was already issued")]
pub struct TokenCollision(pub String);

/// Issues the tokens of one file during one compile pass.
#[derive(Debug)]
pub struct PlaceholderGenerator {
  file_id: String,
  issued: HashSet<String>,
}

impl PlaceholderGenerator {
  pub fn new(path: &Path) -> Self {
    PlaceholderGenerator {
      file_id: file_id(path),
      issued: HashSet::new(),
    }
  }

  pub fn issue(
    &mut self,
    sequence_id: usize,
    call_site_index: usize,
    block_name: &str,
    interpolation_index: usize,
  ) -> Result<PlaceholderToken, TokenCollision> {
    let token = PlaceholderToken {
      file_id: self.file_id.clone(),
      sequence_id,
      call_site_index,
      block_name: block_name.to_string(),
      interpolation_index,
    };

    let rendered = token.to_string();
    if !self.issued.insert(rendered.clone()) {
      return Err(TokenCollision(rendered));
    }

    Ok(token)
  }

  #[cfg(test)]
  fn issued_count(&self) -> usize {
    self.issued.len()
  }
}
