pub mod runner;
pub mod test_utils;

pub use runner::{
  parse_resolved_module, run_file_transformation, run_visit, run_visit_const,
  syntax_for_path, ResolvedModule, RunContext, RunVisitResult, RunWithTransformationError,
};
