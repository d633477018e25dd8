use std::path::Path;
use std::path::PathBuf;
use std::string::FromUtf8Error;

use swc_core::common::input::StringInput;
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, Globals, Mark, SourceMap, GLOBALS};
use swc_core::ecma::ast::{EsVersion, Module};
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{EsSyntax, Parser, Syntax, TsSyntax};
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::visit::{Visit, VisitMut, VisitMutWith, VisitWith};

pub struct RunContext {
  /// Source-map in use
  pub source_map: Lrc<SourceMap>,
  /// Global mark from SWC resolver
  pub global_mark: Mark,
  /// Unresolved mark from SWC resolver
  pub unresolved_mark: Mark,
}

pub struct RunVisitResult<V> {
  pub output_code: String,
  #[allow(unused)]
  pub visitor: V,
  pub source_map: Vec<u8>,
}

/// A module parsed and scope-resolved inside an already running transformation.
pub struct ResolvedModule {
  pub module: Module,
  pub unresolved_mark: Mark,
}

/// Runner of SWC transformations
///
/// * Parse `code` with SWC
/// * Run a visitor over it
/// * Return the result
///
pub fn run_visit<V: VisitMut>(
  code: &str,
  make_visit: impl FnOnce(RunContext) -> V,
) -> Result<RunVisitResult<V>, RunWithTransformationError> {
  let (output_code, visitor, source_map) =
    run_with_transformation(code, None, |run_test_context: RunContext, module: &mut Module| {
      let mut visit = make_visit(run_test_context);
      module.visit_mut_with(&mut visit);
      visit
    })?;
  Ok(RunVisitResult {
    output_code,
    visitor,
    source_map,
  })
}

/// Same as `run_visit` but for `Visit` instead of `VisitMut`
pub fn run_visit_const<V: Visit>(
  code: &str,
  make_visit: impl FnOnce(RunContext) -> V,
) -> Result<RunVisitResult<V>, RunWithTransformationError> {
  let (output_code, visitor, source_map) =
    run_with_transformation(code, None, |run_test_context: RunContext, module: &mut Module| {
      let mut visit = make_visit(run_test_context);
      module.visit_with(&mut visit);
      visit
    })?;
  Ok(RunVisitResult {
    output_code,
    visitor,
    source_map,
  })
}

/// Run an arbitrary transformation over a module read from `path`.
///
/// The syntax is picked from the file extension and the source map carries the real file
/// name. `transform` runs inside the SWC globals of this run, so it may call
/// [`parse_resolved_module`] to inspect further modules.
pub fn run_file_transformation<R>(
  path: &Path,
  code: &str,
  transform: impl FnOnce(RunContext, &mut Module) -> R,
) -> Result<RunVisitResult<R>, RunWithTransformationError> {
  let (output_code, visitor, source_map) =
    run_with_transformation(code, Some(path), transform)?;
  Ok(RunVisitResult {
    output_code,
    visitor,
    source_map,
  })
}

#[derive(Debug, thiserror::Error)]
pub enum RunWithTransformationError {
  #[error("Failed to parse module")]
  SwcParse(swc_core::ecma::parser::error::Error),
  #[error("IO Error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Invalid utf-8 output: {0}")]
  InvalidUtf8Output(#[from] FromUtf8Error),
  #[error("Failed to generate source map")]
  SourceMap(#[from] sourcemap::Error),
}

type RunWithTransformationOutput<R> = (String, R, Vec<u8>);

/// Pick the parser syntax for a file. TypeScript for `.ts`/`.tsx`, ECMAScript with JSX otherwise.
pub fn syntax_for_path(path: Option<&Path>) -> Syntax {
  match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
    Some("ts") | Some("mts") | Some("cts") => Syntax::Typescript(TsSyntax {
      tsx: false,
      ..Default::default()
    }),
    Some("tsx") => Syntax::Typescript(TsSyntax {
      tsx: true,
      ..Default::default()
    }),
    _ => Syntax::Es(EsSyntax {
      jsx: true,
      ..Default::default()
    }),
  }
}

fn parse(
  source_map: &Lrc<SourceMap>,
  path: Option<&Path>,
  code: String,
) -> Result<Module, RunWithTransformationError> {
  let file_name = match path {
    Some(path) => FileName::Real(PathBuf::from(path)),
    None => FileName::Anon,
  };
  let source_file = source_map.new_source_file(Lrc::new(file_name), code);

  let lexer = Lexer::new(
    syntax_for_path(path),
    EsVersion::latest(),
    StringInput::from(&*source_file),
    None,
  );

  let mut parser = Parser::new_from(lexer);
  parser
    .parse_module()
    .map_err(RunWithTransformationError::SwcParse)
}

/// Parse `code` into `source_map` and run the resolver over it with fresh marks.
///
/// Must be called while SWC globals are set, which is the case inside any transformation
/// closure handed to this module.
pub fn parse_resolved_module(
  source_map: &Lrc<SourceMap>,
  path: &Path,
  code: String,
) -> Result<ResolvedModule, RunWithTransformationError> {
  let mut module = parse(source_map, Some(path), code)?;
  let global_mark = Mark::new();
  let unresolved_mark = Mark::new();
  let typescript = matches!(syntax_for_path(Some(path)), Syntax::Typescript(_));
  module.visit_mut_with(&mut resolver(unresolved_mark, global_mark, typescript));

  Ok(ResolvedModule {
    module,
    unresolved_mark,
  })
}

/// Parse code, run resolver over it, then run the `tranform` function with the parsed module
/// codegen and return the results.
fn run_with_transformation<R>(
  code: &str,
  path: Option<&Path>,
  transform: impl FnOnce(RunContext, &mut Module) -> R,
) -> Result<RunWithTransformationOutput<R>, RunWithTransformationError> {
  let source_map = Lrc::new(SourceMap::default());
  let mut module = parse(&source_map, path, code.into())?;
  let typescript = matches!(syntax_for_path(path), Syntax::Typescript(_));

  GLOBALS.set(
    &Globals::new(),
    || -> Result<RunWithTransformationOutput<R>, RunWithTransformationError> {
      let global_mark = Mark::new();
      let unresolved_mark = Mark::new();
      module.visit_mut_with(&mut resolver(unresolved_mark, global_mark, typescript));

      let context = RunContext {
        source_map: source_map.clone(),
        global_mark,
        unresolved_mark,
      };
      let result = transform(context, &mut module);

      let mut line_pos_buffer = vec![];
      let mut output_buffer = vec![];
      let writer = JsWriter::new(
        source_map.clone(),
        "\n",
        &mut output_buffer,
        Some(&mut line_pos_buffer),
      );
      let mut emitter = swc_core::ecma::codegen::Emitter {
        cfg: Default::default(),
        cm: source_map.clone(),
        comments: None,
        wr: writer,
      };
      emitter.emit_module(&module)?;
      let output_code = String::from_utf8(output_buffer)?;
      let source_map = source_map.build_source_map(&line_pos_buffer);
      let mut output_map_buffer = vec![];
      source_map.to_writer(&mut output_map_buffer)?;

      Ok((output_code, result, output_map_buffer))
    },
  )
}

#[cfg(test)]
mod tests {
  use swc_core::ecma::ast::{Lit, Str};
  use swc_core::ecma::visit::VisitMut;

  use super::*;

  #[test]
  fn test_example() {
    struct Visitor;
    impl VisitMut for Visitor {
      fn visit_mut_lit(&mut self, n: &mut Lit) {
        *n = Lit::Str(Str::from("replacement"));
      }
    }

    let code = r#"console.log('test!')"#;
    let RunVisitResult { output_code, .. } = run_visit(code, |_: RunContext| Visitor).unwrap();
    assert_eq!(
      output_code,
      r#"console.log("replacement");
"#
    );
  }

  #[test]
  fn test_file_transformation_parses_typescript() {
    let code = r#"const size: number = 4;"#;
    let RunVisitResult { output_code, .. } =
      run_file_transformation(Path::new("/src/size.ts"), code, |_, _| ()).unwrap();
    assert_eq!(output_code, "const size: number = 4;\n");
  }

  #[test]
  fn test_file_transformation_parses_jsx() {
    let code = r#"const el = <div />;"#;
    let result = run_file_transformation(Path::new("/src/App.js"), code, |_, _| ());
    assert!(result.is_ok());
  }

  #[test]
  fn test_parse_resolved_module_inside_run() {
    let RunVisitResult { visitor, .. } =
      run_file_transformation(Path::new("/src/a.js"), "export {};", |context, _| {
        parse_resolved_module(
          &context.source_map,
          Path::new("/src/b.js"),
          "export const b = 1;".to_string(),
        )
        .map(|resolved| resolved.module.body.len())
      })
      .unwrap();
    assert_eq!(visitor.unwrap(), 1);
  }

  #[test]
  fn test_parse_error() {
    let result = run_visit_const("const = ;", |_: RunContext| NoopVisit);
    assert!(matches!(
      result,
      Err(RunWithTransformationError::SwcParse(_))
    ));
  }

  struct NoopVisit;
  impl Visit for NoopVisit {}
}
