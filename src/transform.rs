//! The transform seam: the function under test, and pass pipelines that
//! turn a fixed list of AST passes into one.

use crate::ast::Program;
use crate::compare::CompareOptions;
use crate::errors::SourceContext;
use crate::syntax::{parse, Printer};

/// A source-to-source transformation under test.
///
/// Implemented for closures, so ad-hoc transforms can be passed directly:
///
/// ```rust
/// use transform_testkit::{CompareOptions, Transform};
///
/// let upper = |source: &str, _options: &CompareOptions| -> miette::Result<String> {
///     Ok(source.to_uppercase())
/// };
/// assert_eq!(upper.apply("x;", &CompareOptions::default()).unwrap(), "X;");
/// ```
pub trait Transform {
    fn apply(&self, source: &str, options: &CompareOptions) -> miette::Result<String>;
}

impl<F> Transform for F
where
    F: Fn(&str, &CompareOptions) -> miette::Result<String>,
{
    fn apply(&self, source: &str, options: &CompareOptions) -> miette::Result<String> {
        self(source, options)
    }
}

/// One AST-to-AST rewrite step.
pub trait Pass {
    fn name(&self) -> &str;
    fn run(&self, program: Program) -> miette::Result<Program>;
}

/// Composes a fixed list of passes into a [`Transform`]:
/// parse, fold the passes over the program, print canonically.
///
/// Parse errors on the input are fatal and propagate to the runner, which
/// reports them as case failures (or matches them against a `throws`
/// directive).
pub struct PassPipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl PassPipeline {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }
}

impl Transform for PassPipeline {
    fn apply(&self, source: &str, _options: &CompareOptions) -> miette::Result<String> {
        let ctx = SourceContext::from_source("input", source);
        let mut program = parse(source, &ctx)?;
        for pass in &self.passes {
            program = pass
                .run(program)
                .map_err(|error| error.wrap_err(format!("pass '{}' failed", pass.name())))?;
        }
        Ok(Printer::canonical().print(&program))
    }
}
