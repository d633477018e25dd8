use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use swc_core::atoms::Atom;
use swc_core::common::sync::Lrc;
use swc_core::common::util::take::Take;
use swc_core::common::{SourceMap, SourceMapper, Span, SyntaxContext, DUMMY_SP};
use swc_core::ecma::ast::{
  CallExpr, Callee, Decl, ExportDefaultExpr, Expr, Id, Ident, Module, ModuleDecl, ModuleItem,
  Pat, Prop, PropOrSpread, Stmt, Tpl, TplElement, VarDecl, VarDeclarator,
};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::classifier::{Classification, Classifier, ThemeScope};
use crate::config::CollectConfig;
use crate::errors::{Diagnostic, SourceLocation};
use crate::placeholder::{PlaceholderGenerator, PlaceholderToken, TokenCollision};
use crate::scanner::{returned_object_mut, scan, unwrap_parens, unwrap_parens_mut, StyleDefinition};
use crate::shim::{extractable_flag, insert_helpers, ShimNames};
use crate::theme::ThemeEnvironment;

/// A rewritten style-definition call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDefinition {
  /// Binding the call initialises, when there is one
  pub binding: Option<String>,
  pub export_name: Option<String>,
  pub sequence_id: usize,
  pub call_site_index: usize,
  pub blocks: Vec<String>,
}

/// What a consumer needs to render the extracted styles of one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
  pub extractable: bool,
  /// One entry per dynamic interpolation, in source order
  pub placeholders: Vec<PlaceholderEntry>,
  pub static_interpolations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderEntry {
  pub token: String,
  pub block: String,
  pub interpolation_index: usize,
  /// Source text of the expression the token replaced
  pub source: String,
}

/// Everything a rewrite pass learned about its module.
#[derive(Debug, Default)]
pub struct RewriteOutput {
  pub hooks: Vec<(HookDefinition, ExtractionMetadata)>,
  pub placeholders: BTreeMap<String, String>,
  pub diagnostics: Vec<Diagnostic>,
  pub collision: Option<TokenCollision>,
}

/// Rewrites every supported `createStyles` call of one module.
///
/// Static interpolations stay in place wrapped in the marker, dynamic ones become `var()`
/// references into the off-band placeholder map, and the callee is swapped for the shim.
pub struct Rewriter<'a> {
  config: &'a CollectConfig,
  environment: &'a ThemeEnvironment,
  classifier: Classifier<'a>,
  source_map: Lrc<SourceMap>,
  style_callees: HashSet<Id>,
  local_exports: HashMap<Id, Atom>,
  generator: PlaceholderGenerator,
  names: Option<ShimNames>,
  next_sequence_id: usize,
  next_call_site_index: usize,
  current_binding: Option<Ident>,
  current_export: Option<Atom>,
  /// Binding of each entry of `output.hooks`
  hook_bindings: Vec<Option<Ident>>,
  output: RewriteOutput,
}

pub struct RewriterOptions<'a> {
  pub config: &'a CollectConfig,
  pub environment: &'a ThemeEnvironment,
  pub source_map: Lrc<SourceMap>,
  pub style_callees: HashSet<Id>,
  pub local_exports: HashMap<Id, Atom>,
  pub generator: PlaceholderGenerator,
}

impl<'a> Rewriter<'a> {
  pub fn new(options: RewriterOptions<'a>, classifier: Classifier<'a>) -> Self {
    Rewriter {
      config: options.config,
      environment: options.environment,
      classifier,
      source_map: options.source_map,
      style_callees: options.style_callees,
      local_exports: options.local_exports,
      generator: options.generator,
      names: None,
      next_sequence_id: 0,
      next_call_site_index: 0,
      current_binding: None,
      current_export: None,
      hook_bindings: Vec::new(),
      output: RewriteOutput::default(),
    }
  }

  pub fn finish(self) -> RewriteOutput {
    self.output
  }

  fn is_style_call(&self, call: &CallExpr) -> bool {
    match &call.callee {
      Callee::Expr(callee) => match unwrap_parens(callee) {
        Expr::Ident(ident) => self.style_callees.contains(&ident.to_id()),
        _ => false,
      },
      _ => false,
    }
  }

  fn is_style_call_expr(&self, expr: &Expr) -> bool {
    matches!(unwrap_parens(expr), Expr::Call(call) if self.is_style_call(call))
  }

  fn rewrite_call(&mut self, call: &mut CallExpr) {
    let sequence_id = self.next_sequence_id;
    self.next_sequence_id += 1;
    let binding = self.current_binding.take();
    let export_name = self.current_export.take().or_else(|| {
      binding
        .as_ref()
        .and_then(|ident| self.local_exports.get(&ident.to_id()).cloned())
    });

    let definition = match scan(call, &self.config.style_tag) {
      Ok(definition) => definition,
      Err(unsupported) => {
        let loc = SourceLocation::from_span(&self.source_map, unsupported.span);
        tracing::warn!(
          sequence_id,
          line = loc.map(|loc| loc.line),
          reason = %unsupported.reason,
          "Unsupported style definition left untransformed"
        );
        self.output.diagnostics.push(
          Diagnostic::unsupported_style_definition(unsupported.reason)
            .with_loc(loc)
            .with_hint(format!(
              "Pass a function returning an object of `name: {}`...`` blocks",
              self.config.style_tag
            )),
        );
        return;
      }
    };

    let call_site_index = self.next_call_site_index;
    self.next_call_site_index += 1;

    let Some(names) = self.names.clone() else {
      return;
    };

    let decisions = match self.classify(&definition, sequence_id, call_site_index) {
      Ok(decisions) => decisions,
      Err(collision) => {
        self.output.collision.get_or_insert(collision);
        return;
      }
    };

    let mut metadata = ExtractionMetadata {
      extractable: true,
      placeholders: Vec::new(),
      static_interpolations: 0,
    };
    for (block, tokens) in definition.blocks.iter().zip(&decisions) {
      for (interpolation, token) in block.interpolations.iter().zip(tokens) {
        let Some(token) = token else {
          metadata.static_interpolations += 1;
          continue;
        };
        let source = self
          .source_map
          .span_to_snippet(interpolation.span())
          .unwrap_or_default();
        self
          .output
          .placeholders
          .insert(token.to_string(), source.clone());
        metadata.placeholders.push(PlaceholderEntry {
          token: token.to_string(),
          block: block.name.to_string(),
          interpolation_index: interpolation.index,
          source,
        });
      }
    }

    if let Some(object) = returned_object_mut(call) {
      for (prop, tokens) in object.props.iter_mut().zip(&decisions) {
        let PropOrSpread::Prop(prop) = prop else {
          continue;
        };
        let Prop::KeyValue(key_value) = &mut **prop else {
          continue;
        };
        if let Expr::TaggedTpl(tagged) = unwrap_parens_mut(&mut key_value.value) {
          rewrite_template(&mut tagged.tpl, tokens, &names.marker);
        }
      }
    }
    call.callee = Callee::Expr(Box::new(Expr::Ident(names.shim.clone())));

    tracing::debug!(
      sequence_id,
      call_site_index,
      placeholders = metadata.placeholders.len(),
      static_interpolations = metadata.static_interpolations,
      "Rewrote style definition"
    );

    let hook = HookDefinition {
      binding: binding.as_ref().map(|ident| ident.sym.to_string()),
      export_name: export_name.map(|name| name.to_string()),
      sequence_id,
      call_site_index,
      blocks: definition
        .blocks
        .iter()
        .map(|block| block.name.to_string())
        .collect(),
    };
    self.output.hooks.push((hook, metadata));
    self.hook_bindings.push(binding);
  }

  /// A token for every dynamic interpolation, `None` for static ones, per block.
  fn classify(
    &mut self,
    definition: &StyleDefinition,
    sequence_id: usize,
    call_site_index: usize,
  ) -> Result<Vec<Vec<Option<PlaceholderToken>>>, TokenCollision> {
    let theme = ThemeScope {
      environment: self.environment,
      ids: definition.params.theme.iter().cloned().collect(),
    };

    let mut decisions = Vec::with_capacity(definition.blocks.len());
    for block in &definition.blocks {
      let mut tokens = Vec::with_capacity(block.interpolations.len());
      for interpolation in &block.interpolations {
        let token = match self.classifier.classify(&interpolation.expr, Some(&theme)) {
          Classification::Static => None,
          Classification::Dynamic => Some(self.generator.issue(
            sequence_id,
            call_site_index,
            &block.name,
            interpolation.index,
          )?),
        };
        tokens.push(token);
      }
      decisions.push(tokens);
    }

    Ok(decisions)
  }
}

/// Splice `var(<token>)` into the literal text in place of every dynamic interpolation and wrap
/// the static ones in the marker.
fn rewrite_template(tpl: &mut Tpl, tokens: &[Option<PlaceholderToken>], marker: &Ident) {
  let exprs = std::mem::take(&mut tpl.exprs);
  let mut quasis = std::mem::take(&mut tpl.quasis).into_iter();
  let Some(first) = quasis.next() else {
    return;
  };

  let mut pending = PendingQuasi::from(first);
  let mut new_quasis = Vec::with_capacity(exprs.len() + 1);
  let mut new_exprs = Vec::with_capacity(exprs.len());

  for (expr, token) in exprs.into_iter().zip(tokens) {
    let Some(next) = quasis.next() else {
      break;
    };

    match token {
      Some(token) => {
        pending.push_str(&token.var_reference());
        pending.append(next);
      }
      None => {
        new_quasis.push(pending.finish(false));
        new_exprs.push(Box::new(Expr::Call(CallExpr {
          span: DUMMY_SP,
          ctxt: SyntaxContext::empty(),
          callee: Callee::Expr(Box::new(Expr::Ident(marker.clone()))),
          args: vec![expr.into()],
          type_args: None,
        })));
        pending = PendingQuasi::from(next);
      }
    }
  }

  new_quasis.push(pending.finish(true));
  tpl.quasis = new_quasis;
  tpl.exprs = new_exprs;
}

/// Literal text being accumulated across removed interpolations.
struct PendingQuasi {
  span: Span,
  raw: String,
  cooked: Option<String>,
}

impl From<TplElement> for PendingQuasi {
  fn from(element: TplElement) -> Self {
    PendingQuasi {
      span: element.span,
      raw: element.raw.to_string(),
      cooked: element.cooked.map(|cooked| cooked.to_string()),
    }
  }
}

impl PendingQuasi {
  fn push_str(&mut self, text: &str) {
    self.raw.push_str(text);
    if let Some(cooked) = &mut self.cooked {
      cooked.push_str(text);
    }
  }

  fn append(&mut self, element: TplElement) {
    self.raw.push_str(&element.raw);
    self.cooked = match (self.cooked.take(), element.cooked) {
      (Some(mut cooked), Some(next)) => {
        cooked.push_str(&next);
        Some(cooked)
      }
      _ => None,
    };
  }

  fn finish(&mut self, tail: bool) -> TplElement {
    TplElement {
      span: self.span,
      tail,
      cooked: self.cooked.take().map(Atom::from),
      raw: std::mem::take(&mut self.raw).into(),
    }
  }
}

/// Names a statement declares at module level.
fn declared_ids(item: &ModuleItem) -> Vec<Id> {
  let var_decl: Option<&VarDecl> = match item {
    ModuleItem::Stmt(Stmt::Decl(Decl::Var(var_decl))) => Some(var_decl),
    ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => match &export.decl {
      Decl::Var(var_decl) => Some(var_decl),
      _ => None,
    },
    _ => None,
  };

  var_decl
    .map(|var_decl| {
      var_decl
        .decls
        .iter()
        .filter_map(|declarator| match &declarator.name {
          Pat::Ident(binding) => Some(binding.id.to_id()),
          _ => None,
        })
        .collect()
    })
    .unwrap_or_default()
}

impl VisitMut for Rewriter<'_> {
  fn visit_mut_module(&mut self, module: &mut Module) {
    self.names = Some(ShimNames::for_module(module));
    module.visit_mut_children_with(self);

    if self.output.hooks.is_empty() {
      return;
    }
    if let Some(names) = &self.names {
      insert_helpers(
        &mut module.body,
        names,
        &self.config.runtime_theme_module(),
      );
    }
  }

  fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
    let mut output = Vec::with_capacity(items.len());

    for mut item in items.take() {
      let hooks_before = self.hook_bindings.len();
      item.visit_mut_with(self);

      let declared = declared_ids(&item);
      output.push(item);

      if !self.config.emit_extractable_flag {
        continue;
      }
      for binding in self.hook_bindings[hooks_before..].iter().flatten() {
        if declared.contains(&binding.to_id()) {
          output.push(ModuleItem::Stmt(extractable_flag(binding)));
        }
      }
    }

    *items = output;
  }

  fn visit_mut_var_declarator(&mut self, declarator: &mut VarDeclarator) {
    let previous = self.current_binding.take();
    if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
      if self.is_style_call_expr(init) {
        self.current_binding = Some(binding.id.clone());
      }
    }

    declarator.visit_mut_children_with(self);
    self.current_binding = previous;
  }

  fn visit_mut_export_default_expr(&mut self, export: &mut ExportDefaultExpr) {
    if self.is_style_call_expr(&export.expr) {
      self.current_export = Some("default".into());
    }
    export.visit_mut_children_with(self);
    self.current_export = None;
  }

  fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
    if self.is_style_call(call) {
      self.rewrite_call(call);
      return;
    }

    call.visit_mut_children_with(self);
  }
}
