use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flair_filesystem::FileSystemRef;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::ConfigurationError;

/// Root key listing the callable accessors of the theme (`"down"`, `"breakpoints.up"`).
pub const ACCESSORS_KEY: &str = "$accessors";

/// The static evaluation environment of one theme source.
///
/// Holds every accessor path reachable from the theme data. An access chain rooted at
/// the `theme` binding is build-time-invariant only if its path is in this set.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeEnvironment {
  path: PathBuf,
  accessor_paths: BTreeSet<String>,
}

impl ThemeEnvironment {
  pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self, ConfigurationError> {
    let path = path.into();
    let Value::Object(mut root) = value else {
      return Err(ConfigurationError::ThemeNotAnObject(path));
    };

    // `module.exports = { default: theme }` style sources
    if matches!(root.get("default"), Some(Value::Object(_))) {
      if let Some(Value::Object(inner)) = root.remove("default") {
        root = inner;
      }
    }

    let accessors = root.remove(ACCESSORS_KEY);
    let mut accessor_paths = BTreeSet::new();
    let theme = Value::Object(root);
    collect_paths(&theme, &mut String::new(), &mut accessor_paths);

    match accessors {
      None => {}
      Some(Value::Array(entries)) => {
        for entry in entries {
          match entry {
            Value::String(accessor) if !accessor.is_empty() => {
              accessor_paths.insert(accessor);
            }
            other => {
              return Err(ConfigurationError::InvalidAccessors {
                path,
                message: format!("expected a non-empty string, got {other}"),
              })
            }
          }
        }
      }
      Some(other) => {
        return Err(ConfigurationError::InvalidAccessors {
          path,
          message: format!("expected an array of accessor paths, got {other}"),
        })
      }
    }

    Ok(ThemeEnvironment {
      path,
      accessor_paths,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  #[cfg(test)]
  fn accessor_paths(&self) -> impl Iterator<Item = &str> {
    self.accessor_paths.iter().map(String::as_str)
  }

  /// Whether `theme.<segments...>` is a known accessor path. The bare theme is always known.
  pub fn has_accessor_path<S: AsRef<str>>(&self, segments: &[S]) -> bool {
    if segments.is_empty() {
      return true;
    }

    let path = segments
      .iter()
      .map(|segment| segment.as_ref())
      .collect::<Vec<_>>()
      .join(".");
    self.accessor_paths.contains(&path)
  }
}

fn collect_paths(value: &Value, prefix: &mut String, paths: &mut BTreeSet<String>) {
  let mut visit = |key: &str, child: &Value, paths: &mut BTreeSet<String>| {
    let previous_len = prefix.len();
    if !prefix.is_empty() {
      prefix.push('.');
    }
    prefix.push_str(key);
    paths.insert(prefix.clone());
    collect_paths(child, prefix, paths);
    prefix.truncate(previous_len);
  };

  match value {
    Value::Object(map) => {
      for (key, child) in map {
        visit(key, child, paths);
      }
    }
    Value::Array(items) => {
      for (index, child) in items.iter().enumerate() {
        visit(&index.to_string(), child, paths);
      }
    }
    _ => {}
  }
}

/// Loads theme sources, once per distinct path for the lifetime of the loader.
///
/// A batch owns one loader; the cached environments are immutable and shared between
/// concurrent compile passes.
#[derive(Debug)]
pub struct ThemeLoader {
  fs: FileSystemRef,
  cache: Mutex<HashMap<PathBuf, Arc<ThemeEnvironment>>>,
}

impl ThemeLoader {
  pub fn new(fs: FileSystemRef) -> Self {
    ThemeLoader {
      fs,
      cache: Mutex::new(HashMap::new()),
    }
  }

  #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
  pub fn load(&self, path: &Path) -> Result<Arc<ThemeEnvironment>, ConfigurationError> {
    if !path.is_absolute() {
      return Err(ConfigurationError::ThemePathNotAbsolute(path.to_path_buf()));
    }
    let canonical = self
      .fs
      .canonicalize(path)
      .map_err(|_| ConfigurationError::ThemeNotFound(path.to_path_buf()))?;
    let path = canonical.as_path();

    let mut cache = self.cache.lock();
    if let Some(environment) = cache.get(path) {
      return Ok(environment.clone());
    }

    if !self.fs.is_file(path) {
      return Err(ConfigurationError::ThemeNotFound(path.to_path_buf()));
    }

    let contents =
      self
        .fs
        .read_to_string(path)
        .map_err(|source| ConfigurationError::ThemeRead {
          path: path.to_path_buf(),
          source,
        })?;
    let value: Value =
      serde_json5::from_str(&contents).map_err(|source| ConfigurationError::ThemeParse {
        path: path.to_path_buf(),
        source,
      })?;

    let environment = Arc::new(ThemeEnvironment::from_value(path, value)?);
    tracing::info!(
      accessor_paths = environment.accessor_paths.len(),
      "Loaded theme environment"
    );

    cache.insert(path.to_path_buf(), environment.clone());
    Ok(environment)
  }

  /// Number of distinct theme sources loaded so far.
  pub fn loaded_count(&self) -> usize {
    self.cache.lock().len()
  }
}
