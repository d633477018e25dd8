use std::path::PathBuf;

use serde::Deserialize;

fn default_import_sources() -> Vec<String> {
  vec!["react-style-system".to_string(), "flair".to_string()]
}

fn default_pure_modules() -> Vec<String> {
  vec!["color2k".to_string(), "polished".to_string()]
}

fn default_create_styles_name() -> String {
  "createStyles".to_string()
}

fn default_style_tag() -> String {
  "css".to_string()
}

fn default_true() -> bool {
  true
}

/// Options for the collect transform.
///
/// Only `theme_path` is required. It must be an absolute path to a JSON5 theme source.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectConfig {
  pub theme_path: PathBuf,
  ///
  /// Module the emitted shim `require`s for the runtime theme, whose accessors are real
  /// functions. `themePath` is only the static schema of that theme.
  ///
  /// Defaults to `themePath` without its extension, so `exampleTheme.json5` pairs with the
  /// `exampleTheme` module next to it
  ///
  #[serde(default)]
  pub theme_module: Option<PathBuf>,
  ///
  /// Modules whose `createStyles` export marks a style-definition call.
  ///
  /// Defaults to `["react-style-system", "flair"]`
  ///
  #[serde(default = "default_import_sources")]
  pub import_sources: Vec<String>,
  ///
  /// Modules (and their subpaths) whose exports only compute on their arguments, so calling
  /// them with static values yields a static value.
  ///
  /// Defaults to `["color2k", "polished"]`
  ///
  #[serde(default = "default_pure_modules")]
  pub pure_modules: Vec<String>,
  #[serde(default = "default_create_styles_name")]
  pub create_styles_name: String,
  /// Tag identifier of the style templates. Defaults to `css`
  #[serde(default = "default_style_tag")]
  pub style_tag: String,
  ///
  /// Emit `hook.__cssExtractable = true;` after each top-level hook declaration.
  ///
  /// Defaults to `true`
  ///
  #[serde(default = "default_true")]
  pub emit_extractable_flag: bool,
}

impl CollectConfig {
  pub fn new(theme_path: impl Into<PathBuf>) -> Self {
    CollectConfig {
      theme_path: theme_path.into(),
      theme_module: None,
      import_sources: default_import_sources(),
      pure_modules: default_pure_modules(),
      create_styles_name: default_create_styles_name(),
      style_tag: default_style_tag(),
      emit_extractable_flag: true,
    }
  }

  /// Specifier of the runtime theme module the shim loads.
  pub fn runtime_theme_module(&self) -> String {
    let module = match &self.theme_module {
      Some(module) => module.clone(),
      None => self.theme_path.with_extension(""),
    };
    module.to_string_lossy().into_owned()
  }
}

/// Whether `source` is one of `modules` or a subpath of one (`polished/lib/color`).
pub(crate) fn is_module_or_subpath(modules: &[String], source: &str) -> bool {
  modules.iter().any(|module| {
    source == module
      || source
        .strip_prefix(module.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
  })
}
