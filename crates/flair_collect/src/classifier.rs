use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use swc_core::atoms::Atom;
use swc_core::common::Mark;
use swc_core::ecma::ast::{
  ArrowExpr, AssignExpr, AssignTarget, AwaitExpr, CatchClause, ClassDecl, ClassExpr, Expr,
  FnDecl, FnExpr, Id, Ident, Lit, MemberExpr, MemberProp, MetaPropExpr, Param, Pat,
  SimpleAssignTarget, ThisExpr, TsType, TsTypeParamDecl, TsTypeParamInstantiation, UpdateExpr,
  VarDeclarator, YieldExpr,
};
use swc_core::ecma::utils::find_pat_ids;
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::bindings::{Binding, BindingTable};
use crate::imports::ImportResolver;
use crate::scanner::unwrap_parens;
use crate::theme::ThemeEnvironment;

/// Globals whose members only compute on their arguments.
const PURE_GLOBALS: &[&str] = &[
  "Math",
  "Number",
  "String",
  "Boolean",
  "JSON",
  "parseInt",
  "parseFloat",
  "isNaN",
  "isFinite",
  "undefined",
  "NaN",
  "Infinity",
];

/// Members of pure globals that still differ between calls.
const IMPURE_GLOBAL_MEMBERS: &[(&str, &str)] = &[("Math", "random")];

/// Alias chains deeper than this are not followed.
const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
  Static,
  Dynamic,
}

impl Classification {
  pub fn is_static(&self) -> bool {
    matches!(self, Classification::Static)
  }
}

/// The theme binding of one style function.
#[derive(Debug)]
pub struct ThemeScope<'a> {
  pub environment: &'a ThemeEnvironment,
  pub ids: HashSet<Id>,
}

/// Free references of one expression, and whether the expression is dynamic on its own.
#[derive(Debug, Clone, Default)]
struct Scan {
  references: Vec<Id>,
  dynamic_reason: Option<String>,
}

/// How a binding contributes to the reference graph.
#[derive(Debug, Clone)]
enum Dependency {
  /// A dynamic root
  Dynamic(String),
  /// Static if everything it references is
  References(Vec<Id>),
}

/// Decides whether expressions of one module are build-time-invariant.
///
/// Never evaluates anything: an expression is static when it is not dynamic on its own and no
/// binding it transitively references is a dynamic root.
pub struct Classifier<'a> {
  bindings: &'a BindingTable,
  unresolved_mark: Mark,
  file: &'a Path,
  imports: &'a mut ImportResolver,
  dependencies: HashMap<Id, Dependency>,
}

impl<'a> Classifier<'a> {
  pub fn new(
    bindings: &'a BindingTable,
    unresolved_mark: Mark,
    file: &'a Path,
    imports: &'a mut ImportResolver,
  ) -> Self {
    Classifier {
      bindings,
      unresolved_mark,
      file,
      imports,
      dependencies: HashMap::new(),
    }
  }

  pub fn classify(&mut self, expr: &Expr, theme: Option<&ThemeScope>) -> Classification {
    let scan = self.scan(expr, theme);
    if let Some(reason) = scan.dynamic_reason {
      tracing::debug!(file = %self.file.display(), %reason, "Dynamic interpolation");
      return Classification::Dynamic;
    }

    self.classify_references(scan.references, theme)
  }

  /// Classify the value of a single binding, as when an export is read.
  pub fn classify_binding(&mut self, id: &Id) -> Classification {
    self.classify_references(vec![id.clone()], None)
  }

  fn classify_references(
    &mut self,
    references: Vec<Id>,
    theme: Option<&ThemeScope>,
  ) -> Classification {
    if references.is_empty() {
      return Classification::Static;
    }

    let mut graph = DiGraph::<Id, ()>::new();
    let mut nodes: HashMap<Id, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut roots = Vec::new();

    let mut starts = Vec::with_capacity(references.len());
    for id in references {
      let node = *nodes.entry(id.clone()).or_insert_with(|| {
        queue.push_back(id.clone());
        graph.add_node(id.clone())
      });
      starts.push(node);
    }

    while let Some(id) = queue.pop_front() {
      let node = nodes[&id];
      match self.dependency(&id, theme) {
        Dependency::Dynamic(reason) => roots.push((node, reason)),
        Dependency::References(references) => {
          for reference in references {
            let target = *nodes.entry(reference.clone()).or_insert_with(|| {
              queue.push_back(reference.clone());
              graph.add_node(reference.clone())
            });
            graph.add_edge(node, target, ());
          }
        }
      }
    }

    let mut tainted = HashSet::new();
    let reversed = Reversed(&graph);
    for (root, reason) in &roots {
      let mut dfs = Dfs::new(reversed, *root);
      while let Some(node) = dfs.next(reversed) {
        if tainted.insert(node) && starts.contains(&node) {
          tracing::debug!(
            file = %self.file.display(),
            binding = %graph[node].0,
            root = %graph[*root].0,
            %reason,
            "Dynamic reference"
          );
        }
      }
    }

    if starts.iter().any(|node| tainted.contains(node)) {
      Classification::Dynamic
    } else {
      Classification::Static
    }
  }

  fn dependency(&mut self, id: &Id, theme: Option<&ThemeScope>) -> Dependency {
    if let Some(dependency) = self.dependencies.get(id) {
      return dependency.clone();
    }

    let dependency = match self.bindings.get(id) {
      None => Dependency::Dynamic(format!("`{}` is not a known binding", id.0)),
      Some(Binding::Opaque) => Dependency::Dynamic(format!("`{}` is a runtime value", id.0)),
      Some(Binding::Import { source, kind }) => {
        if self.imports.verdict(self.file, source, kind) {
          Dependency::References(Vec::new())
        } else {
          Dependency::Dynamic(format!("`{}` is imported from `{source}`", id.0))
        }
      }
      Some(Binding::Expr(expr)) => self.scan(expr, theme).into_dependency(),
      Some(Binding::Projection { source, path }) => {
        let mut scan = self.scan(source, theme);
        if let Some(mut theme_path) = self.theme_path_of_expr(source, theme, 0) {
          theme_path.extend(path.iter().cloned());
          if let Some(reason) = check_theme_path(theme, &theme_path) {
            scan.dynamic_reason.get_or_insert(reason);
          }
        }
        scan.into_dependency()
      }
    };

    self.dependencies.insert(id.clone(), dependency.clone());
    dependency
  }

  fn scan(&self, expr: &Expr, theme: Option<&ThemeScope>) -> Scan {
    let mut locals = LocalCollector::default();
    expr.visit_with(&mut locals);

    let mut scan = ReferenceScan {
      classifier: self,
      theme,
      locals: locals.ids,
      seen: HashSet::new(),
      scan: Scan::default(),
    };
    expr.visit_with(&mut scan);
    scan.scan
  }

  fn is_theme_id(&self, id: &Id, theme: Option<&ThemeScope>) -> bool {
    theme.is_some_and(|theme| theme.ids.contains(id))
  }

  /// Theme path an identifier stands for, following `const` aliases and projections.
  fn theme_path_of_id(
    &self,
    id: &Id,
    theme: Option<&ThemeScope>,
    depth: usize,
  ) -> Option<Vec<Atom>> {
    if theme.is_none() || depth > MAX_ALIAS_DEPTH {
      return None;
    }
    if self.is_theme_id(id, theme) {
      return Some(Vec::new());
    }

    match self.bindings.get(id)? {
      Binding::Expr(expr) => self.theme_path_of_expr(expr, theme, depth + 1),
      Binding::Projection { source, path } => {
        let mut theme_path = self.theme_path_of_expr(source, theme, depth + 1)?;
        theme_path.extend(path.iter().cloned());
        Some(theme_path)
      }
      _ => None,
    }
  }

  fn theme_path_of_expr(
    &self,
    expr: &Expr,
    theme: Option<&ThemeScope>,
    depth: usize,
  ) -> Option<Vec<Atom>> {
    match unwrap_parens(expr) {
      Expr::Ident(ident) => self.theme_path_of_id(&ident.to_id(), theme, depth),
      Expr::Member(member) => {
        let chain = MemberChain::of(member);
        if chain.has_computed_steps() {
          return None;
        }
        let mut theme_path = self.theme_path_of_id(&chain.root?.to_id(), theme, depth)?;
        theme_path.extend(chain.static_prefix());
        Some(theme_path)
      }
      _ => None,
    }
  }
}

impl Scan {
  fn into_dependency(self) -> Dependency {
    match self.dynamic_reason {
      Some(reason) => Dependency::Dynamic(reason),
      None => Dependency::References(self.references),
    }
  }
}

fn check_theme_path(theme: Option<&ThemeScope>, path: &[Atom]) -> Option<String> {
  let theme = theme?;
  if theme.environment.has_accessor_path(path) {
    return None;
  }

  Some(format!(
    "`theme.{}` is not part of the theme",
    path.iter().map(|segment| segment.as_str()).collect::<Vec<_>>().join(".")
  ))
}

enum ChainStep<'e> {
  Name(Atom),
  Computed(&'e Expr),
}

/// `root.a["b"][c]` flattened to its root identifier and steps.
struct MemberChain<'e> {
  root: Option<&'e Ident>,
  steps: Vec<ChainStep<'e>>,
}

impl<'e> MemberChain<'e> {
  fn of(member: &'e MemberExpr) -> Self {
    let mut steps = Vec::new();
    let mut current = member;
    let root = loop {
      steps.push(match &current.prop {
        MemberProp::Ident(name) => ChainStep::Name(name.sym.clone()),
        MemberProp::Computed(computed) => match unwrap_parens(&computed.expr) {
          Expr::Lit(Lit::Str(string)) => ChainStep::Name(string.value.clone()),
          Expr::Lit(Lit::Num(number)) if number.value >= 0.0 && number.value.fract() == 0.0 => {
            ChainStep::Name((number.value as u64).to_string().into())
          }
          other => ChainStep::Computed(other),
        },
        MemberProp::PrivateName(name) => ChainStep::Name(format!("#{}", name.name).into()),
      });

      match unwrap_parens(&current.obj) {
        Expr::Member(inner) => current = inner,
        Expr::Ident(ident) => break Some(ident),
        _ => break None,
      }
    };

    steps.reverse();
    MemberChain { root, steps }
  }

  fn has_computed_steps(&self) -> bool {
    self
      .steps
      .iter()
      .any(|step| matches!(step, ChainStep::Computed(_)))
  }

  /// Named steps up to the first computed one.
  fn static_prefix(&self) -> impl Iterator<Item = Atom> + '_ {
    self.steps.iter().map_while(|step| match step {
      ChainStep::Name(name) => Some(name.clone()),
      ChainStep::Computed(_) => None,
    })
  }

  fn computed_exprs(&self) -> impl Iterator<Item = &'e Expr> + '_ {
    self.steps.iter().filter_map(|step| match step {
      ChainStep::Computed(expr) => Some(*expr),
      ChainStep::Name(_) => None,
    })
  }
}

/// Identifiers declared inside the scanned expression.
#[derive(Default)]
struct LocalCollector {
  ids: HashSet<Id>,
}

impl LocalCollector {
  fn declare(&mut self, pat: &Pat) {
    self.ids.extend(find_pat_ids::<_, Id>(pat));
  }
}

// Only declarations introduce locals. Assignment targets are writes to existing bindings.
impl Visit for LocalCollector {
  fn visit_param(&mut self, param: &Param) {
    self.declare(&param.pat);
    param.visit_children_with(self);
  }

  fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
    for param in &arrow.params {
      self.declare(param);
    }
    arrow.visit_children_with(self);
  }

  fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
    self.declare(&declarator.name);
    declarator.visit_children_with(self);
  }

  fn visit_catch_clause(&mut self, clause: &CatchClause) {
    if let Some(param) = &clause.param {
      self.declare(param);
    }
    clause.visit_children_with(self);
  }

  fn visit_fn_decl(&mut self, fn_decl: &FnDecl) {
    self.ids.insert(fn_decl.ident.to_id());
    fn_decl.visit_children_with(self);
  }

  fn visit_fn_expr(&mut self, fn_expr: &FnExpr) {
    if let Some(ident) = &fn_expr.ident {
      self.ids.insert(ident.to_id());
    }
    fn_expr.visit_children_with(self);
  }

  fn visit_class_decl(&mut self, class_decl: &ClassDecl) {
    self.ids.insert(class_decl.ident.to_id());
    class_decl.visit_children_with(self);
  }

  fn visit_class_expr(&mut self, class_expr: &ClassExpr) {
    if let Some(ident) = &class_expr.ident {
      self.ids.insert(ident.to_id());
    }
    class_expr.visit_children_with(self);
  }
}

struct ReferenceScan<'c, 'a, 't> {
  classifier: &'c Classifier<'a>,
  theme: Option<&'t ThemeScope<'t>>,
  locals: HashSet<Id>,
  seen: HashSet<Id>,
  scan: Scan,
}

impl ReferenceScan<'_, '_, '_> {
  fn mark_dynamic(&mut self, reason: impl Into<String>) {
    self.scan.dynamic_reason.get_or_insert_with(|| reason.into());
  }

  fn reference(&mut self, id: Id) {
    if self.seen.insert(id.clone()) {
      self.scan.references.push(id);
    }
  }

  fn is_global(&self, ident: &Ident) -> bool {
    ident.ctxt.outer() == self.classifier.unresolved_mark
  }

  /// Assignments and updates are only allowed on bindings declared inside the expression.
  fn check_write_target(&mut self, root: Option<&Ident>) {
    match root {
      Some(ident) if self.locals.contains(&ident.to_id()) => {}
      Some(ident) => self.mark_dynamic(format!("writes to `{}`", ident.sym)),
      None => self.mark_dynamic("writes to a non-local target"),
    }
  }
}

fn write_root(expr: &Expr) -> Option<&Ident> {
  match unwrap_parens(expr) {
    Expr::Ident(ident) => Some(ident),
    Expr::Member(member) => MemberChain::of(member).root,
    _ => None,
  }
}

impl Visit for ReferenceScan<'_, '_, '_> {
  fn visit_ident(&mut self, ident: &Ident) {
    let id = ident.to_id();
    if self.locals.contains(&id) || self.classifier.is_theme_id(&id, self.theme) {
      return;
    }

    if self.is_global(ident) {
      if !PURE_GLOBALS.contains(&&*ident.sym) {
        self.mark_dynamic(format!("references global `{}`", ident.sym));
      }
      return;
    }

    self.reference(id);
  }

  fn visit_member_expr(&mut self, member: &MemberExpr) {
    let chain = MemberChain::of(member);

    if let Some(root) = chain.root {
      let root_id = root.to_id();
      let theme_path = if self.locals.contains(&root_id) {
        None
      } else {
        self
          .classifier
          .theme_path_of_id(&root_id, self.theme, 0)
      };

      if let Some(mut theme_path) = theme_path {
        theme_path.extend(chain.static_prefix());
        if let Some(reason) = check_theme_path(self.theme, &theme_path) {
          self.mark_dynamic(reason);
        }
        if !self.classifier.is_theme_id(&root_id, self.theme) {
          self.reference(root_id);
        }
        for expr in chain.computed_exprs() {
          expr.visit_with(self);
        }
        return;
      }

      if self.is_global(root) {
        if let Some(ChainStep::Name(first)) = chain.steps.first() {
          if IMPURE_GLOBAL_MEMBERS
            .iter()
            .any(|(global, member)| &*root.sym == *global && &**first == *member)
          {
            self.mark_dynamic(format!("calls `{}.{}`", root.sym, first));
          }
        }
      }
    }

    member.visit_children_with(self);
  }

  fn visit_assign_expr(&mut self, assign: &AssignExpr) {
    match &assign.left {
      AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
        self.check_write_target(Some(&binding.id))
      }
      AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
        self.check_write_target(MemberChain::of(member).root)
      }
      AssignTarget::Simple(_) => self.check_write_target(None),
      AssignTarget::Pat(pat) => {
        let ids: Vec<Id> = find_pat_ids(pat);
        if ids.iter().any(|id| !self.locals.contains(id)) {
          self.mark_dynamic("destructuring assignment to non-local targets");
        }
      }
    }

    assign.visit_children_with(self);
  }

  fn visit_update_expr(&mut self, update: &UpdateExpr) {
    self.check_write_target(write_root(&update.arg));
    update.visit_children_with(self);
  }

  fn visit_this_expr(&mut self, _: &ThisExpr) {
    self.mark_dynamic("uses `this`");
  }

  fn visit_await_expr(&mut self, _: &AwaitExpr) {
    self.mark_dynamic("uses `await`");
  }

  fn visit_yield_expr(&mut self, _: &YieldExpr) {
    self.mark_dynamic("uses `yield`");
  }

  fn visit_meta_prop_expr(&mut self, _: &MetaPropExpr) {
    self.mark_dynamic("uses a meta property");
  }

  // Types never hold values
  fn visit_ts_type(&mut self, _: &TsType) {}

  fn visit_ts_type_param_decl(&mut self, _: &TsTypeParamDecl) {}

  fn visit_ts_type_param_instantiation(&mut self, _: &TsTypeParamInstantiation) {}
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use flair_filesystem::in_memory_file_system::InMemoryFileSystem;
  use flair_filesystem::FileSystemRef;
  use flair_swc_runner::run_file_transformation;
  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use swc_core::ecma::ast::{CallExpr, Callee, Module};

  use super::*;
  use crate::scanner::scan;

  fn environment() -> ThemeEnvironment {
    ThemeEnvironment::from_value(
      "/usr/theme/exampleTheme.json",
      json!({
        "tablet": 768,
        "colors": { "brand": "#00f", "danger": "#f00" },
        "$accessors": ["down", "up", "space", "block"]
      }),
    )
    .unwrap()
  }

  /// Classifies every interpolation of every `createStyles` call in `code`, in order.
  fn classify_with_fs(fs: FileSystemRef, path: &str, code: &str) -> Vec<Classification> {
    let environment = environment();
    let path = Path::new(path);

    run_file_transformation(path, code, |context, module: &mut Module| {
      let bindings = BindingTable::collect(module);
      let mut imports = ImportResolver::new(
        fs,
        context.source_map.clone(),
        vec!["color2k".to_string(), "polished".to_string()],
      );
      let mut classifier = Classifier::new(&bindings, context.unresolved_mark, path, &mut imports);

      let mut calls = CallCollector::default();
      module.visit_with(&mut calls);

      let mut result = Vec::new();
      for call in &calls.calls {
        let definition = scan(call, "css").unwrap();
        let theme = ThemeScope {
          environment: &environment,
          ids: definition.params.theme.iter().cloned().collect(),
        };
        for block in &definition.blocks {
          for interpolation in &block.interpolations {
            result.push(classifier.classify(&interpolation.expr, Some(&theme)));
          }
        }
      }
      result
    })
    .unwrap()
    .visitor
  }

  fn classify_all(code: &str) -> Vec<Classification> {
    classify_with_fs(
      Arc::new(InMemoryFileSystem::default()),
      "/src/Example.js",
      code,
    )
  }

  #[derive(Default)]
  struct CallCollector {
    calls: Vec<CallExpr>,
  }

  impl Visit for CallCollector {
    fn visit_call_expr(&mut self, call: &CallExpr) {
      if let Callee::Expr(callee) = &call.callee {
        if matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "createStyles") {
          self.calls.push(call.clone());
        }
      }
      call.visit_children_with(self);
    }
  }

  use Classification::{Dynamic, Static};

  #[test]
  fn test_theme_accessors_are_static() {
    let result = classify_all(indoc! {r#"
      const useStyles = createStyles(({ css, theme }) => ({
        root: css`
          width: ${theme.down(theme.tablet)};
          color: ${theme.colors.brand};
          margin: ${theme["space"](2)};
          padding: ${theme.block(Math.max(1, 2))};
        `,
      }));
    "#});

    assert_eq!(result, vec![Static, Static, Static, Static]);
  }

  #[test]
  fn test_unknown_theme_paths_are_dynamic() {
    let result = classify_all(indoc! {r#"
      const useStyles = createStyles(({ css, theme }) => ({
        root: css`
          color: ${theme.colors.missing};
          width: ${theme.sideways(1)};
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Dynamic]);
  }

  #[test]
  fn test_props_and_runtime_stand_ins_are_dynamic() {
    let result = classify_all(indoc! {r#"
      const useStyles = createStyles(({ css, theme, color, surface, width }) => ({
        root: css`
          color: ${color.readable};
          background: ${surface};
          width: ${width}px;
          height: ${theme.tablet};
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Dynamic, Dynamic, Static]);
  }

  #[test]
  fn test_module_constants_and_functions() {
    let result = classify_all(indoc! {r#"
      const gap = 4;
      const double = (n) => n * 2;
      function half(n) { return n / 2; }
      let counter = 0;
      function next() { return counter++; }

      const useStyles = createStyles(({ css, theme }) => ({
        root: css`
          margin: ${double(gap)}px;
          padding: ${half(theme.tablet)}px;
          order: ${counter};
          z-index: ${next()};
        `,
      }));
    "#});

    assert_eq!(result, vec![Static, Static, Dynamic, Dynamic]);
  }

  #[test]
  fn test_taint_propagates_through_aliases() {
    let result = classify_all(indoc! {r#"
      let runtime = window.innerWidth;
      const a = runtime;
      const b = a + 1;
      const c = 10;

      const useStyles = createStyles(({ css }) => ({
        root: css`
          width: ${b}px;
          height: ${c}px;
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Static]);
  }

  #[test]
  fn test_theme_aliases_are_checked() {
    let result = classify_all(indoc! {r#"
      const useStyles = createStyles(({ css, theme }) => {
        const colors = theme.colors;
        const { tablet } = theme;
        const { colors: { danger, unknown } } = theme;

        return {
          root: css`
            color: ${colors.brand};
            width: ${tablet}px;
            border-color: ${danger};
            outline-color: ${unknown};
            background: ${colors.nope};
          `,
        };
      });
    "#});

    assert_eq!(result, vec![Static, Static, Static, Dynamic, Dynamic]);
  }

  #[test]
  fn test_intrinsically_dynamic_expressions() {
    let result = classify_all(indoc! {r#"
      let total = 0;
      const useStyles = createStyles(({ css }) => ({
        root: css`
          a: ${Math.random()};
          b: ${document.title};
          c: ${(total = 3)};
          d: ${[1, 2].map((x) => { let y = x; y += 1; return y; }).join(",")};
          e: ${parseInt("12", 10)};
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Dynamic, Dynamic, Static, Static]);
  }

  #[test]
  fn test_bindings_written_elsewhere_are_dynamic() {
    let result = classify_all(indoc! {r#"
      const sizes = { w: 1 };
      sizes.w = window.innerWidth;
      function pick() { return 1; }
      pick = () => window.innerHeight;
      const list = [1, 2];
      delete list[0];
      const fixed = 4;

      const useStyles = createStyles(({ css }) => ({
        root: css`
          width: ${sizes.w}px;
          height: ${pick()}px;
          order: ${list[1]};
          margin: ${fixed}px;
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Dynamic, Dynamic, Static]);
  }

  #[test]
  fn test_assignments_inside_interpolations_are_not_declarations() {
    let result = classify_all(indoc! {r#"
      const useStyles = createStyles(({ css, width }) => ({
        root: css`
          a: ${(width = width * 2)}px;
          b: ${(() => { let step = 2; step = step * 2; return step; })()}px;
        `,
      }));
    "#});

    assert_eq!(result, vec![Dynamic, Static]);
  }

  #[test]
  fn test_pure_module_imports_are_static() {
    let result = classify_all(indoc! {r#"
      import { createStyles } from 'react-style-system';
      import { darken } from 'polished';
      import { transparentize } from 'color2k/dist/transparentize';
      import { useThing } from 'some-runtime-lib';

      const useStyles = createStyles(({ css, theme }) => ({
        root: css`
          color: ${darken(0.2, theme.colors.brand)};
          background: ${transparentize(theme.colors.danger, 0.5)};
          width: ${useThing()};
        `,
      }));
    "#});

    assert_eq!(result, vec![Static, Static, Dynamic]);
  }

  #[test]
  fn test_relative_imports_are_inspected() {
    let fs = Arc::new(InMemoryFileSystem::default());
    fs.write_file(
      Path::new("/src/tokens/index.ts"),
      indoc! {r#"
        import { darken } from 'polished';
        export const gutter: number = 8;
        export const shade = darken(0.1, '#fff');
        export { live } from './live';
        export default { radius: 4 };
      "#},
    );
    fs.write_file(
      Path::new("/src/tokens/live.js"),
      "export let live = window.devicePixelRatio;",
    );

    let result = classify_with_fs(
      fs,
      "/src/Example.js",
      indoc! {r#"
        import tokens, { gutter, shade, live } from './tokens';
        import * as everything from './tokens';
        import { nothing } from './missing';

        const useStyles = createStyles(({ css }) => ({
          root: css`
            a: ${gutter};
            b: ${shade};
            c: ${tokens.radius};
            d: ${live};
            e: ${everything.gutter};
            f: ${nothing};
          `,
        }));
      "#},
    );

    assert_eq!(
      result,
      vec![Static, Static, Static, Dynamic, Dynamic, Dynamic]
    );
  }

  #[test]
  fn test_import_cycles_are_dynamic() {
    let fs = Arc::new(InMemoryFileSystem::default());
    fs.write_file(
      Path::new("/src/a.js"),
      "import { b } from './b'; export const a = b;",
    );
    fs.write_file(
      Path::new("/src/b.js"),
      "import { a } from './a'; export const b = a;",
    );

    let result = classify_with_fs(
      fs,
      "/src/Example.js",
      indoc! {r#"
        import { a } from './a';
        const useStyles = createStyles(({ css }) => ({ root: css`width: ${a};` }));
      "#},
    );

    assert_eq!(result, vec![Dynamic]);
  }
}
