use std::collections::HashSet;

use swc_core::atoms::Atom;
use swc_core::common::{Span, Spanned};
use swc_core::ecma::ast::{
  ArrowExpr, BlockStmt, BlockStmtOrExpr, CallExpr, Class, Expr, Function, Id, ObjectLit,
  ObjectPatProp, Pat, Prop, PropName, PropOrSpread, ReturnStmt, Stmt, TaggedTpl,
};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::bindings::pattern_ids;

/// A `createStyles(styleFn)` call whose shape is fully understood.
#[derive(Debug)]
pub struct StyleDefinition {
  pub span: Span,
  pub params: StyleParams,
  pub blocks: Vec<StyleBlock>,
}

/// Bindings introduced by the style function's parameters.
#[derive(Debug, Default, PartialEq)]
pub struct StyleParams {
  pub theme: Option<Id>,
  pub tag: Option<Id>,
  /// Every other parameter binding (`color`, `surface`, destructured props...)
  pub dynamic: Vec<Id>,
}

/// One `name: css\`...\`` property of the returned object.
#[derive(Debug)]
pub struct StyleBlock {
  pub name: Atom,
  pub interpolations: Vec<Interpolation>,
}

#[derive(Debug)]
pub struct Interpolation {
  /// Position within the owning block's template
  pub index: usize,
  pub expr: Box<Expr>,
}

impl Interpolation {
  pub fn span(&self) -> Span {
    self.expr.span()
  }
}

/// Why a call site was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedStyleDefinition {
  pub span: Span,
  pub reason: String,
}

impl UnsupportedStyleDefinition {
  fn new(span: Span, reason: impl Into<String>) -> Self {
    UnsupportedStyleDefinition {
      span,
      reason: reason.into(),
    }
  }
}

/// Extract the style blocks of a style-definition call.
///
/// The first argument must be a function literal returning an object literal whose every
/// property is a template tagged with `style_tag`.
pub fn scan(call: &CallExpr, style_tag: &str) -> Result<StyleDefinition, UnsupportedStyleDefinition> {
  let Some(first) = call.args.first() else {
    return Err(UnsupportedStyleDefinition::new(
      call.span,
      "expected a style function as the first argument, found no arguments",
    ));
  };
  if first.spread.is_some() {
    return Err(UnsupportedStyleDefinition::new(
      first.expr.span(),
      "expected a style function as the first argument, found a spread argument",
    ));
  }

  let (params, object) = match unwrap_parens(&first.expr) {
    Expr::Arrow(arrow) => (
      arrow.params.iter().collect::<Vec<_>>(),
      returned_object(&arrow.body, arrow.span)?,
    ),
    Expr::Fn(fn_expr) => {
      let Some(body) = &fn_expr.function.body else {
        return Err(UnsupportedStyleDefinition::new(
          fn_expr.function.span,
          "the style function has no body",
        ));
      };
      (
        fn_expr.function.params.iter().map(|param| &param.pat).collect(),
        returned_object_from_block(body)?,
      )
    }
    other => {
      return Err(UnsupportedStyleDefinition::new(
        other.span(),
        format!(
          "expected a style function as the first argument, found {}",
          describe_expr(other)
        ),
      ))
    }
  };

  let params = scan_params(&params, style_tag);
  let blocks = scan_blocks(object, &params, style_tag)?;

  Ok(StyleDefinition {
    span: call.span,
    params,
    blocks,
  })
}

/// Mutable access to the object literal returned by an already scanned call.
pub(crate) fn returned_object_mut(call: &mut CallExpr) -> Option<&mut ObjectLit> {
  let first = call.args.first_mut()?;
  match unwrap_parens_mut(&mut first.expr) {
    Expr::Arrow(arrow) => match &mut *arrow.body {
      BlockStmtOrExpr::Expr(expr) => match unwrap_parens_mut(expr) {
        Expr::Object(object) => Some(object),
        _ => None,
      },
      BlockStmtOrExpr::BlockStmt(block) => returned_object_from_block_mut(block),
    },
    Expr::Fn(fn_expr) => returned_object_from_block_mut(fn_expr.function.body.as_mut()?),
    _ => None,
  }
}

fn returned_object_from_block_mut(block: &mut BlockStmt) -> Option<&mut ObjectLit> {
  let return_stmt = block.stmts.iter_mut().find_map(|stmt| match stmt {
    Stmt::Return(return_stmt) => Some(return_stmt),
    _ => None,
  })?;
  match unwrap_parens_mut(return_stmt.arg.as_mut()?) {
    Expr::Object(object) => Some(object),
    _ => None,
  }
}

pub(crate) fn unwrap_parens(expr: &Expr) -> &Expr {
  match expr {
    Expr::Paren(paren) => unwrap_parens(&paren.expr),
    other => other,
  }
}

pub(crate) fn unwrap_parens_mut(expr: &mut Expr) -> &mut Expr {
  match expr {
    Expr::Paren(paren) => unwrap_parens_mut(&mut paren.expr),
    other => other,
  }
}

fn returned_object(
  body: &BlockStmtOrExpr,
  span: Span,
) -> Result<&ObjectLit, UnsupportedStyleDefinition> {
  match body {
    BlockStmtOrExpr::Expr(expr) => match unwrap_parens(expr) {
      Expr::Object(object) => Ok(object),
      other => Err(UnsupportedStyleDefinition::new(
        span,
        format!(
          "the style function must return an object literal, found {}",
          describe_expr(other)
        ),
      )),
    },
    BlockStmtOrExpr::BlockStmt(block) => returned_object_from_block(block),
  }
}

fn returned_object_from_block(block: &BlockStmt) -> Result<&ObjectLit, UnsupportedStyleDefinition> {
  let mut counter = ReturnCounter::default();
  block.visit_children_with(&mut counter);
  let top_level = block.stmts.iter().find_map(|stmt| match stmt {
    Stmt::Return(return_stmt) => Some(return_stmt),
    _ => None,
  });

  let (Some(return_stmt), 1) = (top_level, counter.returns) else {
    return Err(UnsupportedStyleDefinition::new(
      block.span,
      "the style function must have exactly one return statement, at its top level",
    ));
  };

  match return_stmt.arg.as_deref().map(unwrap_parens) {
    Some(Expr::Object(object)) => Ok(object),
    Some(other) => Err(UnsupportedStyleDefinition::new(
      return_stmt.span,
      format!(
        "the style function must return an object literal, found {}",
        describe_expr(other)
      ),
    )),
    None => Err(UnsupportedStyleDefinition::new(
      return_stmt.span,
      "the style function must return an object literal, found an empty return",
    )),
  }
}

/// Counts the `return` statements of one function body, nested functions excluded.
#[derive(Default)]
struct ReturnCounter {
  returns: usize,
}

impl Visit for ReturnCounter {
  fn visit_return_stmt(&mut self, _: &ReturnStmt) {
    self.returns += 1;
  }

  fn visit_function(&mut self, _: &Function) {}

  fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}

  fn visit_class(&mut self, _: &Class) {}
}

fn scan_params(params: &[&Pat], style_tag: &str) -> StyleParams {
  let mut result = StyleParams::default();

  for (position, param) in params.iter().enumerate() {
    let Pat::Object(object_pat) = param else {
      result.dynamic.extend(pattern_ids(param));
      continue;
    };
    if position > 0 {
      result.dynamic.extend(pattern_ids(param));
      continue;
    }

    for prop in &object_pat.props {
      match prop {
        // { theme }
        ObjectPatProp::Assign(assign) if assign.value.is_none() => {
          let id = assign.key.id.to_id();
          if &*assign.key.id.sym == "theme" {
            result.theme = Some(id);
          } else if &*assign.key.id.sym == style_tag {
            result.tag = Some(id);
          } else {
            result.dynamic.push(id);
          }
        }
        // { theme: t }
        ObjectPatProp::KeyValue(key_value) => match (prop_name(&key_value.key), &*key_value.value) {
          (Some(key), Pat::Ident(binding)) if &*key == "theme" => {
            result.theme = Some(binding.id.to_id());
          }
          (Some(key), Pat::Ident(binding)) if &*key == style_tag => {
            result.tag = Some(binding.id.to_id());
          }
          (_, value) => result.dynamic.extend(pattern_ids(value)),
        },
        // defaults and rest elements may carry anything
        ObjectPatProp::Assign(assign) => result.dynamic.push(assign.key.id.to_id()),
        ObjectPatProp::Rest(rest) => result.dynamic.extend(pattern_ids(&rest.arg)),
      }
    }
  }

  result
}

fn scan_blocks(
  object: &ObjectLit,
  params: &StyleParams,
  style_tag: &str,
) -> Result<Vec<StyleBlock>, UnsupportedStyleDefinition> {
  let mut blocks = Vec::with_capacity(object.props.len());
  let mut seen = HashSet::new();

  for prop in &object.props {
    let PropOrSpread::Prop(prop) = prop else {
      return Err(UnsupportedStyleDefinition::new(
        prop.span(),
        "spread elements are not supported in the returned style object",
      ));
    };
    let Prop::KeyValue(key_value) = &**prop else {
      return Err(UnsupportedStyleDefinition::new(
        prop.span(),
        "every property of the returned style object must be `name: css`...``",
      ));
    };
    let Some(name) = prop_name(&key_value.key) else {
      return Err(UnsupportedStyleDefinition::new(
        key_value.key.span(),
        "style block names must be identifiers or string literals",
      ));
    };
    if !is_block_name(&name) {
      return Err(UnsupportedStyleDefinition::new(
        key_value.key.span(),
        format!("style block name `{name}` must only contain letters, digits, `-` or `_`"),
      ));
    }
    if !seen.insert(name.clone()) {
      return Err(UnsupportedStyleDefinition::new(
        key_value.key.span(),
        format!("style block `{name}` is declared more than once"),
      ));
    }

    let tagged = match unwrap_parens(&key_value.value) {
      Expr::TaggedTpl(tagged) if is_style_tag(tagged, params, style_tag) => tagged,
      other => {
        return Err(UnsupportedStyleDefinition::new(
          other.span(),
          format!(
            "style block `{name}` must be a `{style_tag}` tagged template, found {}",
            describe_expr(other)
          ),
        ))
      }
    };

    blocks.push(StyleBlock {
      name,
      interpolations: tagged
        .tpl
        .exprs
        .iter()
        .enumerate()
        .map(|(index, expr)| Interpolation {
          index,
          expr: expr.clone(),
        })
        .collect(),
    });
  }

  Ok(blocks)
}

fn is_style_tag(tagged: &TaggedTpl, params: &StyleParams, style_tag: &str) -> bool {
  let Expr::Ident(tag) = unwrap_parens(&tagged.tag) else {
    return false;
  };
  match &params.tag {
    Some(tag_id) => tag.to_id() == *tag_id,
    None => &*tag.sym == style_tag,
  }
}

pub(crate) fn prop_name(key: &PropName) -> Option<Atom> {
  match key {
    PropName::Ident(ident) => Some(ident.sym.clone()),
    PropName::Str(string) => Some(string.value.clone()),
    _ => None,
  }
}

fn is_block_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn describe_expr(expr: &Expr) -> &'static str {
  match expr {
    Expr::Object(_) => "an object literal",
    Expr::Array(_) => "an array literal",
    Expr::Ident(_) => "an identifier",
    Expr::Call(_) => "a call expression",
    Expr::Member(_) => "a member expression",
    Expr::Lit(_) => "a literal",
    Expr::Tpl(_) => "an untagged template literal",
    Expr::TaggedTpl(_) => "a template with a different tag",
    Expr::Cond(_) => "a conditional expression",
    _ => "an unsupported expression",
  }
}
