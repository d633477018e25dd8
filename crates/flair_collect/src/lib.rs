//! Build-time extraction of static styles from `createStyles` modules.
//!
//! Every interpolation of a style template is classified as build-time-static or
//! runtime-dynamic. Static ones are kept inline, dynamic ones are replaced by `var(--token)`
//! style-variable references whose original expressions are reported off-band.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use flair_collect::{Batch, CollectConfig};
//! use flair_filesystem::os_file_system::OsFileSystem;
//!
//! let config = CollectConfig::new("/usr/theme/exampleTheme.json");
//! let batch = Batch::new(config, Arc::new(OsFileSystem)).unwrap();
//! let compiled = batch
//!   .compile(Path::new("/src/Example.js"), "export const a = 1;")
//!   .unwrap();
//! println!("{}", compiled.code);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flair_filesystem::FileSystemRef;
use flair_swc_runner::{run_file_transformation, RunContext, RunVisitResult};
use rayon::prelude::*;
use swc_core::ecma::ast::Module;
use swc_core::ecma::visit::VisitMutWith;

mod bindings;
mod classifier;
mod config;
mod errors;
mod imports;
mod placeholder;
mod rewriter;
mod scanner;
mod shim;
mod theme;

pub use crate::bindings::{Binding, BindingTable, ExportTable, ImportKind};
pub use crate::classifier::{Classification, Classifier, ThemeScope};
pub use crate::config::CollectConfig;
pub use crate::errors::{
  CompileError, ConfigurationError, Diagnostic, DiagnosticCode, SourceLocation,
};
pub use crate::imports::ImportResolver;
pub use crate::placeholder::{PlaceholderGenerator, PlaceholderToken};
pub use crate::rewriter::{ExtractionMetadata, HookDefinition, PlaceholderEntry};
pub use crate::theme::{ThemeEnvironment, ThemeLoader};

use crate::rewriter::{RewriteOutput, Rewriter, RewriterOptions};

/// Result of compiling one module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
  /// The input itself when no call site was rewritten. Otherwise the whole module is
  /// reprinted, so untouched code (unsupported calls included) keeps its meaning but may
  /// change formatting.
  pub code: String,
  pub source_map: Vec<u8>,
  /// One entry per rewritten call site, in source order
  pub hooks: Vec<(HookDefinition, ExtractionMetadata)>,
  /// Token to the source text of the expression it replaced
  pub placeholders: BTreeMap<String, String>,
  pub diagnostics: Vec<Diagnostic>,
}

impl CompiledModule {
  pub fn is_extractable(&self) -> bool {
    !self.hooks.is_empty()
  }
}

/// A set of modules compiled against one theme.
///
/// The theme is loaded once when the batch is created. Compiling is synchronous and every
/// call owns its parse state, so `compile` may run on many threads at once.
#[derive(Debug)]
pub struct Batch {
  config: CollectConfig,
  fs: FileSystemRef,
  themes: ThemeLoader,
}

impl Batch {
  pub fn new(config: CollectConfig, fs: FileSystemRef) -> Result<Self, ConfigurationError> {
    let themes = ThemeLoader::new(fs.clone());
    themes.load(&config.theme_path)?;

    Ok(Batch { config, fs, themes })
  }

  pub fn config(&self) -> &CollectConfig {
    &self.config
  }

  pub fn theme(&self) -> Result<Arc<ThemeEnvironment>, ConfigurationError> {
    self.themes.load(&self.config.theme_path)
  }

  #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
  pub fn compile(&self, path: &Path, code: &str) -> Result<CompiledModule, CompileError> {
    let environment = self.theme()?;

    let RunVisitResult {
      output_code,
      visitor: output,
      source_map,
    } = run_file_transformation(path, code, |context: RunContext, module: &mut Module| {
      self.rewrite(path, &environment, context, module)
    })
    .map_err(|source| CompileError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    if let Some(collision) = output.collision {
      return Err(CompileError::IdentifierCollision {
        path: path.to_path_buf(),
        token: collision.0,
      });
    }

    tracing::debug!(
      hooks = output.hooks.len(),
      placeholders = output.placeholders.len(),
      diagnostics = output.diagnostics.len(),
      "Compiled module"
    );

    // Nothing was rewritten, so the module is handed back exactly as written
    let code = if output.hooks.is_empty() {
      code.to_string()
    } else {
      output_code
    };

    Ok(CompiledModule {
      code,
      source_map,
      hooks: output.hooks,
      placeholders: output.placeholders,
      diagnostics: output.diagnostics,
    })
  }

  /// Compile every `(path, code)` pair in parallel. Results keep the order of `inputs`.
  pub fn compile_many(
    &self,
    inputs: &[(PathBuf, String)],
  ) -> Vec<Result<CompiledModule, CompileError>> {
    tracing::info!(modules = inputs.len(), "Compiling modules");

    inputs
      .par_iter()
      .map(|(path, code)| self.compile(path, code))
      .collect()
  }

  fn rewrite(
    &self,
    path: &Path,
    environment: &ThemeEnvironment,
    context: RunContext,
    module: &mut Module,
  ) -> RewriteOutput {
    let bindings = BindingTable::collect(module);
    let exports = ExportTable::collect(module);
    let style_callees =
      bindings.imported_ids(&self.config.import_sources, &self.config.create_styles_name);

    let mut imports = ImportResolver::new(
      self.fs.clone(),
      context.source_map.clone(),
      self.config.pure_modules.clone(),
    );
    let classifier = Classifier::new(&bindings, context.unresolved_mark, path, &mut imports);

    let mut rewriter = Rewriter::new(
      RewriterOptions {
        config: &self.config,
        environment,
        source_map: context.source_map.clone(),
        style_callees,
        local_exports: exports.local_exports(),
        generator: PlaceholderGenerator::new(path),
      },
      classifier,
    );
    module.visit_mut_with(&mut rewriter);
    rewriter.finish()
  }
}

#[cfg(test)]
mod tests {
  use flair_filesystem::in_memory_file_system::InMemoryFileSystem;
  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use tracing_test::traced_test;

  use super::*;

  const THEME_PATH: &str = "/usr/theme/exampleTheme.json5";

  fn batch() -> Batch {
    let fs = Arc::new(InMemoryFileSystem::default());
    fs.write_file(
      Path::new(THEME_PATH),
      r#"{ tablet: 768, "$accessors": ["down"] }"#,
    );
    Batch::new(CollectConfig::new(THEME_PATH), fs).unwrap()
  }

  #[test]
  fn test_missing_theme_fails_the_batch() {
    let result = Batch::new(
      CollectConfig::new(THEME_PATH),
      Arc::new(InMemoryFileSystem::default()),
    );

    assert!(matches!(result, Err(ConfigurationError::ThemeNotFound(_))));
  }

  #[test]
  fn test_configuration_errors_are_batch_fatal() {
    let error = CompileError::from(ConfigurationError::ThemeNotFound(THEME_PATH.into()));
    assert!(error.is_batch_fatal());
  }

  #[test]
  fn test_parse_errors_only_fail_the_file() {
    let batch = batch();
    let error = batch
      .compile(Path::new("/src/Broken.js"), "const = ;")
      .unwrap_err();

    assert!(matches!(error, CompileError::Parse { .. }));
    assert!(!error.is_batch_fatal());
    assert!(batch
      .compile(Path::new("/src/Fine.js"), "const a = 1;")
      .is_ok());
  }

  #[test]
  #[traced_test]
  fn test_unsupported_definitions_are_reported() {
    let code = indoc! {r#"
      import { createStyles } from 'react-style-system';

      const useStyles = createStyles({ root: css`width: 100%;` });
    "#};
    let compiled = batch()
      .compile(Path::new("/src/Example.js"), code)
      .unwrap();

    assert_eq!(compiled.diagnostics.len(), 1);
    let diagnostic = &compiled.diagnostics[0];
    assert_eq!(diagnostic.code, DiagnosticCode::UnsupportedStyleDefinition);
    assert_eq!(
      diagnostic.message,
      "expected a style function as the first argument, found an object literal"
    );
    assert_eq!(
      diagnostic.loc.map(|loc| (loc.line, loc.column)),
      Some((3, 32))
    );
    assert!(compiled.hooks.is_empty());
    assert!(!compiled.is_extractable());
    assert_eq!(compiled.code, code);
    assert!(logs_contain("Unsupported style definition left untransformed"));
  }

  #[test]
  fn test_theme_is_loaded_once() {
    let batch = batch();
    for _ in 0..3 {
      batch
        .compile(Path::new("/src/Example.js"), "export {};")
        .unwrap();
    }

    assert_eq!(batch.themes.loaded_count(), 1);
  }

  #[test]
  fn test_diagnostics_serialize_camel_case() {
    let diagnostic = Diagnostic::unsupported_style_definition("nope").with_loc(Some(
      SourceLocation {
        line: 3,
        column: 31,
      },
    ));

    assert_eq!(
      serde_json::to_value(&diagnostic).unwrap(),
      serde_json::json!({
        "code": "UnsupportedStyleDefinition",
        "message": "nope",
        "loc": { "line": 3, "column": 31 }
      })
    );
  }
}
