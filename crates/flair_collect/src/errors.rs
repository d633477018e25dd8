use std::path::PathBuf;

use flair_swc_runner::RunWithTransformationError;
use serde::Serialize;
use swc_core::common::{SourceMap, Span};

/// The theme source could not be turned into a [`crate::ThemeEnvironment`].
///
/// No style definition can be compiled without the environment, so this aborts the whole
/// batch.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
  #[error("Theme path must be absolute, got {0}")]
  ThemePathNotAbsolute(PathBuf),
  #[error("Theme source {0} does not exist")]
  ThemeNotFound(PathBuf),
  #[error("Failed to read theme source {path}: {source}")]
  ThemeRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse theme source {path}: {source}")]
  ThemeParse {
    path: PathBuf,
    #[source]
    source: serde_json5::Error,
  },
  #[error("Theme source {0} must contain an object")]
  ThemeNotAnObject(PathBuf),
  #[error("Theme source {path} has an invalid `$accessors` entry: {message}")]
  InvalidAccessors { path: PathBuf, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
  #[error("Failed to compile {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: RunWithTransformationError,
  },
  /// Two dynamic interpolations of one file received the same token. This is a defect of the
  /// generator, never of the input.
  #[error("Placeholder token {token} was issued twice while compiling {path}")]
  IdentifierCollision { path: PathBuf, token: String },
}

impl CompileError {
  /// Whether every other file of the batch is doomed as well.
  pub fn is_batch_fatal(&self) -> bool {
    matches!(self, CompileError::Configuration(_))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticCode {
  UnsupportedStyleDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
  /// 1-based
  pub line: usize,
  /// 1-based, in characters
  pub column: usize,
}

impl SourceLocation {
  pub(crate) fn from_span(source_map: &SourceMap, span: Span) -> Option<Self> {
    if span.is_dummy() {
      return None;
    }

    let loc = source_map.lookup_char_pos(span.lo);
    Some(SourceLocation {
      line: loc.line,
      column: loc.col.0 + 1,
    })
  }
}

/// A recoverable problem found while compiling one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
  pub code: DiagnosticCode,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub loc: Option<SourceLocation>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub hints: Vec<String>,
}

impl Diagnostic {
  pub fn unsupported_style_definition(message: impl Into<String>) -> Self {
    Diagnostic {
      code: DiagnosticCode::UnsupportedStyleDefinition,
      message: message.into(),
      loc: None,
      hints: Vec::new(),
    }
  }

  pub fn with_loc(mut self, loc: Option<SourceLocation>) -> Self {
    self.loc = loc;
    self
  }

  pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
    self.hints.push(hint.into());
    self
  }
}
