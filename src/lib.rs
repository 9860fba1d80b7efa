pub use crate::compare::{assert_ast_eq, tree_eq, CompareOptions, DivergenceReport, EXCERPT_LEN};
pub use crate::errors::{Error, ErrorCategory, ErrorKind, SourceContext, TreeDivergence};
pub use crate::harness::{
    discover_suite_files, load_cases, partition_outcomes, report_outcomes, run_case, run_section,
    run_suite, skip_reason, test_case, test_section, TestCase, TestConfig, TestOutcome, Throws,
};
pub use crate::normalize::{canonicalize, normalize, COMMENT_FIELDS, EXCLUDED_FIELDS};
pub use crate::syntax::{parse, PrintOptions, Printer};
pub use crate::transform::{Pass, PassPipeline, Transform};

pub mod ast;
pub mod compare;
pub mod errors;
pub mod harness;
pub mod normalize;
pub mod syntax;
pub mod transform;
