use std::collections::{HashMap, HashSet};

use swc_core::atoms::Atom;
use swc_core::ecma::ast::{
  AssignExpr, AssignTarget, ClassDecl, ClassExpr, Decl, DefaultDecl, ExportSpecifier, Expr,
  FnDecl, FnExpr, ForHead, ForInStmt, ForOfStmt, Id, ImportDecl, ImportSpecifier, Module,
  ModuleDecl, ModuleExportName, ModuleItem, ObjectPatProp, Pat, SimpleAssignTarget, UnaryExpr,
  UnaryOp, UpdateExpr, VarDecl, VarDeclKind,
};
use swc_core::ecma::utils::find_pat_ids;
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::scanner::prop_name;

/// Every identifier bound by `pat`, defaults and computed keys excluded.
pub fn pattern_ids(pat: &Pat) -> Vec<Id> {
  find_pat_ids(pat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
  Named(Atom),
  Default,
  Namespace,
}

impl ImportKind {
  /// The export this import reads, if it reads a single one.
  pub fn export_name(&self) -> Option<Atom> {
    match self {
      ImportKind::Named(name) => Some(name.clone()),
      ImportKind::Default => Some("default".into()),
      ImportKind::Namespace => None,
    }
  }
}

/// What a binding was initialised with, as far as can be told without running anything.
#[derive(Debug, Clone)]
pub enum Binding {
  /// `const x = <expr>` or a function declaration
  Expr(Box<Expr>),
  /// `const { a: { b } } = <source>` binds `b` to `source.a.b`
  Projection { source: Box<Expr>, path: Vec<Atom> },
  Import { source: Atom, kind: ImportKind },
  /// Parameters, `let`/`var`, classes, catch clauses, defaults and rest elements.
  Opaque,
}

/// Scope-resolved bindings of one module.
#[derive(Debug, Default)]
pub struct BindingTable {
  bindings: HashMap<Id, Binding>,
}

impl BindingTable {
  pub fn collect(module: &Module) -> Self {
    let mut collector = BindingCollector::default();
    module.visit_with(&mut collector);

    // A binding written anywhere in the module no longer holds its initialiser
    let mut bindings = collector.bindings;
    for id in collector.written {
      if let Some(binding) = bindings.get_mut(&id) {
        *binding = Binding::Opaque;
      }
    }

    BindingTable { bindings }
  }

  pub fn get(&self, id: &Id) -> Option<&Binding> {
    self.bindings.get(id)
  }

  /// Local bindings of `name` imported from any of `sources`.
  pub fn imported_ids(&self, sources: &[String], name: &str) -> HashSet<Id> {
    self
      .bindings
      .iter()
      .filter_map(|(id, binding)| match binding {
        Binding::Import {
          source,
          kind: ImportKind::Named(imported),
        } if &**imported == name && sources.iter().any(|s| s.as_str() == &**source) => {
          Some(id.clone())
        }
        _ => None,
      })
      .collect()
  }
}

#[derive(Default)]
struct BindingCollector {
  bindings: HashMap<Id, Binding>,
  /// Roots of every assignment, update, `delete` and `for` head target
  written: HashSet<Id>,
}

impl BindingCollector {
  fn define(&mut self, id: Id, binding: Binding) {
    self.bindings.insert(id, binding);
  }

  fn written_pattern(&mut self, pat: &Pat) {
    self.written.extend(pattern_ids(pat));

    let mut members = MemberTargets::default();
    pat.visit_with(&mut members);
    self.written.extend(members.roots);
  }

  fn define_opaque(&mut self, pat: &Pat) {
    for id in pattern_ids(pat) {
      self.define(id, Binding::Opaque);
    }
  }

  fn define_pattern(&mut self, pat: &Pat, source: &Expr, path: &mut Vec<Atom>) {
    match pat {
      Pat::Ident(binding) => {
        let definition = if path.is_empty() {
          Binding::Expr(Box::new(source.clone()))
        } else {
          Binding::Projection {
            source: Box::new(source.clone()),
            path: path.clone(),
          }
        };
        self.define(binding.id.to_id(), definition);
      }
      Pat::Object(object) => {
        for prop in &object.props {
          match prop {
            ObjectPatProp::KeyValue(key_value) => match prop_name(&key_value.key) {
              Some(key) => {
                path.push(key);
                self.define_pattern(&key_value.value, source, path);
                path.pop();
              }
              None => self.define_opaque(&key_value.value),
            },
            ObjectPatProp::Assign(assign) if assign.value.is_none() => {
              path.push(assign.key.id.sym.clone());
              self.define_pattern(&Pat::Ident(assign.key.clone()), source, path);
              path.pop();
            }
            ObjectPatProp::Assign(assign) => self.define(assign.key.id.to_id(), Binding::Opaque),
            ObjectPatProp::Rest(rest) => self.define_opaque(&rest.arg),
          }
        }
      }
      Pat::Array(array) => {
        for (index, element) in array.elems.iter().enumerate() {
          match element {
            Some(Pat::Rest(rest)) => self.define_opaque(&rest.arg),
            Some(element) => {
              path.push(index.to_string().into());
              self.define_pattern(element, source, path);
              path.pop();
            }
            None => {}
          }
        }
      }
      other => self.define_opaque(other),
    }
  }
}

impl Visit for BindingCollector {
  fn visit_import_decl(&mut self, import: &ImportDecl) {
    for specifier in &import.specifiers {
      let (local, kind) = match specifier {
        ImportSpecifier::Named(named) => {
          let imported = match &named.imported {
            Some(ModuleExportName::Ident(ident)) => ident.sym.clone(),
            Some(ModuleExportName::Str(string)) => string.value.clone(),
            None => named.local.sym.clone(),
          };
          let kind = if &*imported == "default" {
            ImportKind::Default
          } else {
            ImportKind::Named(imported)
          };
          (&named.local, kind)
        }
        ImportSpecifier::Default(default) => (&default.local, ImportKind::Default),
        ImportSpecifier::Namespace(namespace) => (&namespace.local, ImportKind::Namespace),
      };

      self.define(
        local.to_id(),
        Binding::Import {
          source: import.src.value.clone(),
          kind,
        },
      );
    }
  }

  fn visit_var_decl(&mut self, var_decl: &VarDecl) {
    for declarator in &var_decl.decls {
      match (&var_decl.kind, &declarator.init) {
        (VarDeclKind::Const, Some(init)) => {
          self.define_pattern(&declarator.name, init, &mut Vec::new())
        }
        _ => self.define_opaque(&declarator.name),
      }
    }

    var_decl.visit_children_with(self);
  }

  fn visit_fn_decl(&mut self, fn_decl: &FnDecl) {
    self.define(
      fn_decl.ident.to_id(),
      Binding::Expr(Box::new(Expr::Fn(FnExpr {
        ident: Some(fn_decl.ident.clone()),
        function: fn_decl.function.clone(),
      }))),
    );

    fn_decl.visit_children_with(self);
  }

  fn visit_fn_expr(&mut self, fn_expr: &FnExpr) {
    if let Some(ident) = &fn_expr.ident {
      self.bindings.entry(ident.to_id()).or_insert(Binding::Opaque);
    }

    fn_expr.visit_children_with(self);
  }

  fn visit_class_decl(&mut self, class_decl: &ClassDecl) {
    self.define(class_decl.ident.to_id(), Binding::Opaque);
    class_decl.visit_children_with(self);
  }

  fn visit_class_expr(&mut self, class_expr: &ClassExpr) {
    if let Some(ident) = &class_expr.ident {
      self.bindings.entry(ident.to_id()).or_insert(Binding::Opaque);
    }

    class_expr.visit_children_with(self);
  }

  fn visit_assign_expr(&mut self, assign: &AssignExpr) {
    match &assign.left {
      AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
        self.written.insert(binding.id.to_id());
      }
      AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
        self.written.extend(target_root(&member.obj));
      }
      AssignTarget::Simple(SimpleAssignTarget::Paren(paren)) => {
        self.written.extend(target_root(&paren.expr));
      }
      AssignTarget::Simple(_) => {}
      AssignTarget::Pat(pat) => {
        self.written.extend(find_pat_ids::<_, Id>(pat));
        let mut members = MemberTargets::default();
        pat.visit_with(&mut members);
        self.written.extend(members.roots);
      }
    }

    assign.visit_children_with(self);
  }

  fn visit_update_expr(&mut self, update: &UpdateExpr) {
    self.written.extend(target_root(&update.arg));
    update.visit_children_with(self);
  }

  fn visit_unary_expr(&mut self, unary: &UnaryExpr) {
    if unary.op == UnaryOp::Delete {
      self.written.extend(target_root(&unary.arg));
    }
    unary.visit_children_with(self);
  }

  fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
    if let ForHead::Pat(pat) = &stmt.left {
      self.written_pattern(pat);
    }
    stmt.visit_children_with(self);
  }

  fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
    if let ForHead::Pat(pat) = &stmt.left {
      self.written_pattern(pat);
    }
    stmt.visit_children_with(self);
  }

  // Parameters, catch clauses and anything bound without an explicit definition above.
  fn visit_binding_ident(&mut self, binding: &swc_core::ecma::ast::BindingIdent) {
    self.bindings.entry(binding.id.to_id()).or_insert(Binding::Opaque);
  }
}

/// Identifier a write to `expr` lands on: `a` for `a`, `a.b[c]` and `(a).b`.
fn target_root(expr: &Expr) -> Option<Id> {
  match expr {
    Expr::Ident(ident) => Some(ident.to_id()),
    Expr::Member(member) => target_root(&member.obj),
    Expr::Paren(paren) => target_root(&paren.expr),
    _ => None,
  }
}

/// Member expressions used as targets inside a destructuring assignment, `[a.b] = ...`.
#[derive(Default)]
struct MemberTargets {
  roots: Vec<Id>,
}

impl Visit for MemberTargets {
  fn visit_pat(&mut self, pat: &Pat) {
    match pat {
      Pat::Expr(expr) => self.roots.extend(target_root(expr)),
      other => other.visit_children_with(self),
    }
  }
}

/// What a module export refers to.
#[derive(Debug, Clone)]
pub enum ExportTarget {
  Local(Id),
  /// `export default <expr>` and default function declarations
  Expr(Box<Expr>),
  ReExport { source: Atom, kind: ImportKind },
  Opaque,
}

/// Exports of one module, keyed by exported name.
#[derive(Debug, Default)]
pub struct ExportTable {
  exports: HashMap<Atom, ExportTarget>,
  /// Sources of `export * from '...'`, in source order
  star_sources: Vec<Atom>,
}

impl ExportTable {
  pub fn collect(module: &Module) -> Self {
    let mut table = ExportTable::default();

    for item in &module.body {
      let ModuleItem::ModuleDecl(decl) = item else {
        continue;
      };

      match decl {
        ModuleDecl::ExportDecl(export) => match &export.decl {
          Decl::Var(var_decl) => {
            for declarator in &var_decl.decls {
              for id in pattern_ids(&declarator.name) {
                table.exports.insert(id.0.clone(), ExportTarget::Local(id));
              }
            }
          }
          Decl::Fn(fn_decl) => {
            table.exports.insert(
              fn_decl.ident.sym.clone(),
              ExportTarget::Local(fn_decl.ident.to_id()),
            );
          }
          Decl::Class(class_decl) => {
            table
              .exports
              .insert(class_decl.ident.sym.clone(), ExportTarget::Opaque);
          }
          _ => {}
        },
        ModuleDecl::ExportNamed(named) => {
          for specifier in &named.specifiers {
            match specifier {
              ExportSpecifier::Named(specifier) => {
                let orig = export_name(&specifier.orig);
                let exported = specifier
                  .exported
                  .as_ref()
                  .map(export_name)
                  .unwrap_or_else(|| orig.clone());

                let target = match (&named.src, &specifier.orig) {
                  (Some(src), _) => ExportTarget::ReExport {
                    source: src.value.clone(),
                    kind: if &*orig == "default" {
                      ImportKind::Default
                    } else {
                      ImportKind::Named(orig)
                    },
                  },
                  (None, ModuleExportName::Ident(ident)) => ExportTarget::Local(ident.to_id()),
                  (None, ModuleExportName::Str(_)) => ExportTarget::Opaque,
                };
                table.exports.insert(exported, target);
              }
              ExportSpecifier::Namespace(namespace) => {
                let target = match &named.src {
                  Some(src) => ExportTarget::ReExport {
                    source: src.value.clone(),
                    kind: ImportKind::Namespace,
                  },
                  None => ExportTarget::Opaque,
                };
                table.exports.insert(export_name(&namespace.name), target);
              }
              ExportSpecifier::Default(default) => {
                table
                  .exports
                  .insert(default.exported.sym.clone(), ExportTarget::Opaque);
              }
            }
          }
        }
        ModuleDecl::ExportDefaultDecl(default) => {
          let target = match &default.decl {
            DefaultDecl::Fn(fn_expr) => ExportTarget::Expr(Box::new(Expr::Fn(fn_expr.clone()))),
            _ => ExportTarget::Opaque,
          };
          table.exports.insert("default".into(), target);
        }
        ModuleDecl::ExportDefaultExpr(default) => {
          table
            .exports
            .insert("default".into(), ExportTarget::Expr(default.expr.clone()));
        }
        ModuleDecl::ExportAll(all) => table.star_sources.push(all.src.value.clone()),
        _ => {}
      }
    }

    table
  }

  pub fn get(&self, name: &Atom) -> Option<&ExportTarget> {
    self.exports.get(name)
  }

  /// Exported names of module-level bindings, keyed by binding.
  pub fn local_exports(&self) -> HashMap<Id, Atom> {
    self
      .exports
      .iter()
      .filter_map(|(name, target)| match target {
        ExportTarget::Local(id) => Some((id.clone(), name.clone())),
        _ => None,
      })
      .collect()
  }

  pub fn star_sources(&self) -> &[Atom] {
    &self.star_sources
  }
}

fn export_name(name: &ModuleExportName) -> Atom {
  match name {
    ModuleExportName::Ident(ident) => ident.sym.clone(),
    ModuleExportName::Str(string) => string.value.clone(),
  }
}

#[cfg(test)]
mod tests {
  use flair_swc_runner::test_utils::{run_test_visit_const, RunVisitResult};
  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use swc_core::ecma::visit::Visit;

  use super::*;

  /// Collects tables from the whole module, keyed by plain symbol for easy assertions.
  #[derive(Default)]
  struct Collect {
    bindings: Vec<(String, String)>,
    exports: Vec<(String, String)>,
    star_sources: Vec<String>,
  }

  impl Visit for Collect {
    fn visit_module(&mut self, module: &Module) {
      let table = BindingTable::collect(module);
      let mut bindings = table
        .bindings
        .iter()
        .map(|(id, binding)| (id.0.to_string(), describe(binding)))
        .collect::<Vec<_>>();
      bindings.sort();
      self.bindings = bindings;

      let exports = ExportTable::collect(module);
      let mut described = exports
        .exports
        .iter()
        .map(|(name, target)| {
          let target = match target {
            ExportTarget::Local(id) => format!("local {}", id.0),
            ExportTarget::Expr(_) => "expr".to_string(),
            ExportTarget::ReExport { source, kind } => format!("{source} {kind:?}"),
            ExportTarget::Opaque => "opaque".to_string(),
          };
          (name.to_string(), target)
        })
        .collect::<Vec<_>>();
      described.sort();
      self.exports = described;
      self.star_sources = exports
        .star_sources()
        .iter()
        .map(|source| source.to_string())
        .collect();
    }
  }

  fn describe(binding: &Binding) -> String {
    match binding {
      Binding::Expr(_) => "expr".to_string(),
      Binding::Projection { path, .. } => format!(
        "projection {}",
        path.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(".")
      ),
      Binding::Import { source, kind } => format!("import {source} {kind:?}"),
      Binding::Opaque => "opaque".to_string(),
    }
  }

  fn collect(code: &str) -> Collect {
    let RunVisitResult { visitor, .. } = run_test_visit_const(code, |_| Collect::default());
    visitor
  }

  fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
      .iter()
      .map(|(a, b)| (a.to_string(), b.to_string()))
      .collect()
  }

  #[test]
  fn test_collects_definitions() {
    let result = collect(indoc! {r#"
      import { createStyles } from 'react-style-system';
      import { darken as dark } from 'polished';
      import theme2, * as all from './theme';

      const width = 100;
      const { colors: { brand }, space } = palette;
      const [first, , third] = list;
      let mutable = 1;
      function helper(arg) { return arg; }
      class Widget {}
      const { fallback = 1, ...rest } = palette;
    "#});

    assert_eq!(
      result.bindings,
      pairs(&[
        ("Widget", "opaque"),
        ("all", "import ./theme Namespace"),
        ("arg", "opaque"),
        ("brand", "projection colors.brand"),
        ("createStyles", "import react-style-system Named(\"createStyles\")"),
        ("dark", "import polished Named(\"darken\")"),
        ("fallback", "opaque"),
        ("first", "projection 0"),
        ("helper", "expr"),
        ("mutable", "opaque"),
        ("rest", "opaque"),
        ("space", "projection space"),
        ("theme2", "import ./theme Default"),
        ("third", "projection 2"),
        ("width", "expr"),
      ])
    );
  }

  #[test]
  fn test_written_bindings_become_opaque() {
    let result = collect(indoc! {r#"
      early = 2;
      const early = 1;
      const sizes = { w: 1 };
      sizes.w = 3;
      const counter = { n: 0 };
      counter.n++;
      const list = [1];
      delete list[0];
      const a = 1, b = 2;
      [a, b] = [b, a];
      const holder = { x: 1 };
      ({ y: holder.x } = { y: 2 });
      function item() {}
      for (item of []) {}
      const untouched = 4;
    "#});

    assert_eq!(
      result.bindings,
      pairs(&[
        ("a", "opaque"),
        ("b", "opaque"),
        ("counter", "opaque"),
        ("early", "opaque"),
        ("holder", "opaque"),
        ("item", "opaque"),
        ("list", "opaque"),
        ("sizes", "opaque"),
        ("untouched", "expr"),
      ])
    );
  }

  #[test]
  fn test_collects_exports() {
    let result = collect(indoc! {r#"
      export const gap = 4, [a] = list;
      export function scale(n) { return n * gap; }
      export class Widget {}
      const local = 1;
      export { local as renamed };
      export { tone as default } from './tones';
      export * as everything from './everything';
      export * from './more';
    "#});

    assert_eq!(
      result.exports,
      pairs(&[
        ("Widget", "opaque"),
        ("a", "local a"),
        ("default", "./tones Named(\"tone\")"),
        ("everything", "./everything Namespace"),
        ("gap", "local gap"),
        ("renamed", "local local"),
        ("scale", "local scale"),
      ])
    );
    assert_eq!(result.star_sources, vec!["./more".to_string()]);
  }

  #[test]
  fn test_collects_default_exports() {
    let expr = collect("export default { brand: '#00f' };");
    assert_eq!(expr.exports, pairs(&[("default", "expr")]));

    let function = collect("export default function () { return 1; }");
    assert_eq!(function.exports, pairs(&[("default", "expr")]));
  }
}
