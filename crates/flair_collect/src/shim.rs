use std::collections::HashSet;

use swc_core::atoms::Atom;
use swc_core::common::{SyntaxContext, DUMMY_SP};
use swc_core::ecma::ast::{Expr, Ident, Lit, Module, ModuleDecl, ModuleItem, Stmt, Str};
use swc_core::ecma::visit::{Visit, VisitWith};
use swc_core::quote;

const MARKER_NAME: &str = "staticVar";
const SHIM_NAME: &str = "createExtractableStyles";

/// Names of the helpers inserted into a rewritten module, fresh with respect to every
/// identifier the module already mentions.
#[derive(Debug, Clone)]
pub struct ShimNames {
  pub marker: Ident,
  pub shim: Ident,
}

impl ShimNames {
  pub fn for_module(module: &Module) -> Self {
    let mut collector = SymbolCollector::default();
    module.visit_with(&mut collector);

    let mut used = collector.used;
    let marker = fresh_ident(&mut used, MARKER_NAME);
    let shim = fresh_ident(&mut used, SHIM_NAME);
    ShimNames { marker, shim }
  }
}

#[derive(Default)]
struct SymbolCollector {
  used: HashSet<Atom>,
}

impl Visit for SymbolCollector {
  fn visit_ident(&mut self, ident: &Ident) {
    self.used.insert(ident.sym.clone());
  }
}

fn fresh_ident(used: &mut HashSet<Atom>, base: &str) -> Ident {
  let mut index = 0usize;
  loop {
    let candidate: Atom = match index {
      0 => base.into(),
      1 => format!("_{base}").into(),
      _ => format!("_{base}{index}").into(),
    };
    if used.insert(candidate.clone()) {
      return Ident::new(candidate, DUMMY_SP, SyntaxContext::empty());
    }
    index += 1;
  }
}

/// `const staticVar = (t) => t;`
pub fn marker_declaration(names: &ShimNames) -> Stmt {
  quote!(
    "const $marker = (t) => t;" as Stmt,
    marker: Ident = names.marker.clone()
  )
}

/// The runtime stand-in for `createStyles`.
///
/// Loads the theme once when the module is evaluated and hands the style function a minimal
/// `css` tag plus fixed `color`/`surface` values, so the hook can run outside a component tree.
pub fn shim_declaration(names: &ShimNames, theme_module: &str) -> Stmt {
  let theme_module = Expr::Lit(Lit::Str(Str::from(theme_module)));

  quote!(
    r##"
    const $shim = ((theme) => {
      const css = (strings, ...values) =>
        strings.reduce((text, chunk, index) => text + chunk + (values[index] ?? ""), "");
      const color = {
        original: "#000",
        decorative: "#000",
        readable: "#000",
        aa: "#000",
        aaa: "#000"
      };
      const surface = "#fff";
      return (styleFn) => (props) => styleFn({ color, surface, ...props, css, theme });
    })(((themeModule) => themeModule.default || themeModule)(require($theme_module)));
    "## as Stmt,
    shim: Ident = names.shim.clone(),
    theme_module: Expr = theme_module
  )
}

/// `<hook>.__cssExtractable = true;`
pub fn extractable_flag(hook: &Ident) -> Stmt {
  quote!(
    "$hook.__cssExtractable = true;" as Stmt,
    hook: Ident = hook.clone()
  )
}

/// Insert the marker and the shim right after the last import of `items`.
pub fn insert_helpers(items: &mut Vec<ModuleItem>, names: &ShimNames, theme_module: &str) {
  let position = items
    .iter()
    .rposition(|item| matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(_))))
    .map_or(0, |index| index + 1);

  items.splice(
    position..position,
    [
      ModuleItem::Stmt(marker_declaration(names)),
      ModuleItem::Stmt(shim_declaration(names, theme_module)),
    ],
  );
}

#[cfg(test)]
mod tests {
  use flair_swc_runner::test_utils::{run_test_visit, RunVisitResult};
  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use swc_core::ecma::visit::VisitMut;

  use super::*;

  struct InsertHelpers;

  impl VisitMut for InsertHelpers {
    fn visit_mut_module(&mut self, module: &mut Module) {
      let names = ShimNames::for_module(module);
      insert_helpers(&mut module.body, &names, "/usr/theme/exampleTheme");
    }
  }

  fn names_for(code: &str) -> (String, String) {
    struct Names(Option<ShimNames>);
    impl Visit for Names {
      fn visit_module(&mut self, module: &Module) {
        self.0 = Some(ShimNames::for_module(module));
      }
    }

    let RunVisitResult { visitor, .. } =
      flair_swc_runner::test_utils::run_test_visit_const(code, |_| Names(None));
    let names = visitor.0.unwrap();
    (names.marker.sym.to_string(), names.shim.sym.to_string())
  }

  #[test]
  fn test_names_avoid_module_symbols() {
    assert_eq!(
      names_for("const a = 1;"),
      ("staticVar".to_string(), "createExtractableStyles".to_string())
    );
    assert_eq!(
      names_for("const staticVar = 1; const _staticVar = 2; createExtractableStyles();"),
      (
        "_staticVar2".to_string(),
        "_createExtractableStyles".to_string()
      )
    );
  }

  #[test]
  fn test_helpers_follow_the_last_import() {
    let RunVisitResult { output_code, .. } = run_test_visit(
      indoc! {r#"
        import a from 'a';
        import { b } from 'b';
        const c = a + b;
      "#},
      |_| InsertHelpers,
    );

    let lines = output_code.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "import a from 'a';");
    assert_eq!(lines[1], "import { b } from 'b';");
    assert_eq!(lines[2], "const staticVar = (t)=>t;");
    assert!(lines[3].starts_with("const createExtractableStyles = "));
    assert!(output_code.contains(r#"require("/usr/theme/exampleTheme")"#));
    assert!(output_code.contains("themeModule.default || themeModule"));
    assert!(output_code.contains("surface = \"#fff\""));
    assert!(output_code.contains("styleFn({"));
    assert!(output_code.trim_end().ends_with("const c = a + b;"));
  }

  #[test]
  fn test_helpers_lead_modules_without_imports() {
    let RunVisitResult { output_code, .. } = run_test_visit("const c = 1;", |_| InsertHelpers);

    assert!(output_code.starts_with("const staticVar = (t)=>t;\n"));
  }

  #[test]
  fn test_extractable_flag() {
    struct Flag;
    impl VisitMut for Flag {
      fn visit_mut_module(&mut self, module: &mut Module) {
        let hook = Ident::new("useStyles".into(), DUMMY_SP, SyntaxContext::empty());
        module.body.push(ModuleItem::Stmt(extractable_flag(&hook)));
      }
    }

    let RunVisitResult { output_code, .. } = run_test_visit("", |_| Flag);
    assert_eq!(output_code, "useStyles.__cssExtractable = true;\n");
  }
}
