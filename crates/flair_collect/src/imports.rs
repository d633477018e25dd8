use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use flair_filesystem::FileSystemRef;
use flair_swc_runner::parse_resolved_module;
use swc_core::atoms::Atom;
use swc_core::common::sync::Lrc;
use swc_core::common::{Mark, SourceMap};

use crate::bindings::{BindingTable, ExportTable, ExportTarget, ImportKind};
use crate::classifier::Classifier;
use crate::config::is_module_or_subpath;

/// Extensions tried, in order, when a relative specifier names no existing file.
const EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

/// A sibling module parsed for inspection.
struct InspectedModule {
  bindings: BindingTable,
  exports: ExportTable,
  unresolved_mark: Mark,
}

/// Decides whether imported values are build-time-invariant.
///
/// Pure modules are trusted. Relative modules are read through the file system, parsed and
/// their exports classified like local bindings. Everything else is a runtime value.
/// Verdicts live for one compile pass.
pub struct ImportResolver {
  fs: FileSystemRef,
  source_map: Lrc<SourceMap>,
  pure_modules: Vec<String>,
  modules: HashMap<PathBuf, Option<Rc<InspectedModule>>>,
  verdicts: HashMap<(PathBuf, Atom), bool>,
  in_progress: HashSet<(PathBuf, Atom)>,
}

impl ImportResolver {
  pub fn new(fs: FileSystemRef, source_map: Lrc<SourceMap>, pure_modules: Vec<String>) -> Self {
    ImportResolver {
      fs,
      source_map,
      pure_modules,
      modules: HashMap::new(),
      verdicts: HashMap::new(),
      in_progress: HashSet::new(),
    }
  }

  fn is_pure_module(&self, source: &str) -> bool {
    is_module_or_subpath(&self.pure_modules, source)
  }

  /// Whether the value `importer` imports from `source` is static.
  pub fn verdict(&mut self, importer: &Path, source: &str, kind: &ImportKind) -> bool {
    if self.is_pure_module(source) {
      return true;
    }
    if !is_relative(source) {
      tracing::debug!(source, "Import from an unknown module is dynamic");
      return false;
    }

    let Some(name) = kind.export_name() else {
      tracing::debug!(source, "Namespace import of a relative module is dynamic");
      return false;
    };
    let Some(path) = self.resolve(importer, source) else {
      tracing::debug!(source, importer = %importer.display(), "Unresolvable import is dynamic");
      return false;
    };

    self.export_verdict(&path, &name).unwrap_or(false)
  }

  /// `None` when `path` does not export `name`.
  fn export_verdict(&mut self, path: &Path, name: &Atom) -> Option<bool> {
    let key = (path.to_path_buf(), name.clone());
    if let Some(verdict) = self.verdicts.get(&key) {
      return Some(*verdict);
    }
    if !self.in_progress.insert(key.clone()) {
      tracing::debug!(path = %path.display(), %name, "Import cycle is dynamic");
      return Some(false);
    }

    let verdict = self.compute_export_verdict(path, name);
    self.in_progress.remove(&key);

    if let Some(verdict) = verdict {
      self.verdicts.insert(key, verdict);
    }
    verdict
  }

  fn compute_export_verdict(&mut self, path: &Path, name: &Atom) -> Option<bool> {
    let Some(module) = self.module(path) else {
      return Some(false);
    };

    match module.exports.get(name) {
      Some(ExportTarget::Local(id)) => {
        let mut classifier = Classifier::new(&module.bindings, module.unresolved_mark, path, self);
        Some(classifier.classify_binding(id).is_static())
      }
      Some(ExportTarget::Expr(expr)) => {
        let mut classifier = Classifier::new(&module.bindings, module.unresolved_mark, path, self);
        Some(classifier.classify(expr, None).is_static())
      }
      Some(ExportTarget::ReExport { source, kind }) => Some(self.verdict(path, source, kind)),
      Some(ExportTarget::Opaque) => Some(false),
      None if &**name == "default" => None,
      None => {
        for source in module.exports.star_sources() {
          if self.is_pure_module(source) {
            return Some(true);
          }
          let Some(target) = self.resolve(path, source) else {
            continue;
          };
          if let Some(verdict) = self.export_verdict(&target, name) {
            return Some(verdict);
          }
        }
        None
      }
    }
  }

  fn module(&mut self, path: &Path) -> Option<Rc<InspectedModule>> {
    if let Some(module) = self.modules.get(path) {
      return module.clone();
    }

    let module = self.inspect(path).map(Rc::new);
    self.modules.insert(path.to_path_buf(), module.clone());
    module
  }

  #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
  fn inspect(&self, path: &Path) -> Option<InspectedModule> {
    let code = match self.fs.read_to_string(path) {
      Ok(code) => code,
      Err(error) => {
        tracing::debug!(%error, "Failed to read imported module");
        return None;
      }
    };

    let resolved = match parse_resolved_module(&self.source_map, path, code) {
      Ok(resolved) => resolved,
      Err(error) => {
        tracing::debug!(%error, "Failed to parse imported module");
        return None;
      }
    };

    Some(InspectedModule {
      bindings: BindingTable::collect(&resolved.module),
      exports: ExportTable::collect(&resolved.module),
      unresolved_mark: resolved.unresolved_mark,
    })
  }

  /// Resolve a relative specifier: the exact file, then known extensions, then `index` files.
  fn resolve(&self, importer: &Path, source: &str) -> Option<PathBuf> {
    if !is_relative(source) {
      return None;
    }

    let base = normalize(&importer.parent()?.join(source));
    if self.fs.is_file(&base) {
      return Some(base);
    }

    for extension in EXTENSIONS {
      let mut candidate = base.clone().into_os_string();
      candidate.push(".");
      candidate.push(extension);
      let candidate = PathBuf::from(candidate);
      if self.fs.is_file(&candidate) {
        return Some(candidate);
      }
    }

    if !self.fs.is_dir(&base) {
      return None;
    }
    EXTENSIONS
      .iter()
      .map(|extension| base.join(format!("index.{extension}")))
      .find(|candidate| self.fs.is_file(candidate))
  }
}

fn is_relative(source: &str) -> bool {
  source.starts_with("./") || source.starts_with("../") || source == "." || source == ".."
}

/// Lexically fold `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
  let mut result = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        result.pop();
      }
      other => result.push(other.as_os_str()),
    }
  }
  result
}
