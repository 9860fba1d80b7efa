//! Table-driven test harness.
//!
//! Maps a table of named test cases onto individual test executions: each
//! case feeds its `input` to the transform under test, then either matches
//! a raised error against a `throws` directive or asserts structural
//! equality between the transform's result and the case's `output`.
//!
//! # Case format
//!
//! Tables can be built in code with [`TestCase::new`] or loaded from YAML
//! files:
//!
//! ```yaml
//! - name: "adds semicolon"
//!   input: "let x = 1"
//!   output: "let x = 1;"
//! - name: "rejects bad input"
//!   input: "f("
//!   throws: "expected"
//! - name: "tolerated"
//!   input: "x"
//!   throws: false
//!   skip: true
//! ```
//!
//! # Dispatch policy
//!
//! Evaluated in priority order per case:
//! - `throws: true` — the transform must raise any error.
//! - `throws: "s"` — the transform must raise an error whose message
//!   contains `"s"`.
//! - `throws: false` — the transform must not raise; output is not
//!   compared.
//! - no `throws` — the transform must succeed and its result must be
//!   structurally equal to `output`.
//!
//! The transform receives the case's own `options` when present, else the
//! shared section options; structural comparison always uses the shared
//! options.
//!
//! # Entry points
//!
//! - [`run_case`] / [`run_section`] — pure execution, no I/O.
//! - [`test_section`] / [`test_case`] — run, report to stderr, and panic on
//!   failure, so a single `#[test]` function is the test-framework
//!   boundary.
//! - [`run_suite`] — discover YAML tables under a directory tree and run
//!   them all with summary reporting.

use crate::compare::{assert_ast_eq, CompareOptions, DivergenceReport};
use crate::errors::ErrorKind;
use crate::transform::{PassPipeline, Transform};
use difference::{Changeset, Difference};
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;

// =============================================================================
// CORE TYPES
// =============================================================================

/// One entry in a test table.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    /// Expected output source; required unless `throws` is set.
    #[serde(default)]
    pub output: Option<String>,
    /// Error expectation; see the module docs for the dispatch policy.
    #[serde(default)]
    pub throws: Option<Throws>,
    /// Per-case options forwarded to the transform.
    #[serde(default)]
    pub options: Option<CompareOptions>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            output: None,
            throws: None,
            options: None,
            skip: false,
            only: false,
        }
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn throws(mut self, throws: Throws) -> Self {
        self.throws = Some(throws);
        self
    }

    pub fn options(mut self, options: CompareOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Error expectation: `true`/`false`, or a message substring.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Throws {
    Any(bool),
    Contains(String),
}

/// Result of executing a single case.
#[derive(Debug, Clone)]
pub enum TestOutcome {
    Pass {
        name: String,
    },
    Fail {
        name: String,
        message: String,
        /// Present when the failure was a structural mismatch.
        report: Option<DivergenceReport>,
    },
    Skipped {
        name: String,
        reason: String,
    },
}

impl TestOutcome {
    pub fn name(&self) -> &str {
        match self {
            TestOutcome::Pass { name }
            | TestOutcome::Fail { name, .. }
            | TestOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, TestOutcome::Fail { .. })
    }
}

/// Configuration for suite execution and reporting.
pub struct TestConfig {
    pub suite_root: String,
    pub use_colors: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            suite_root: "tests/suites".to_string(),
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

// Color constants for terminal output.
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

impl TestConfig {
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

// =============================================================================
// CASE EXECUTION
// =============================================================================

/// Executes one case against the transform.
///
/// `shared` is the section's option set: the transform receives the case's
/// own options when present (else `shared`), while structural comparison
/// always uses `shared`.
pub fn run_case(case: &TestCase, transform: &dyn Transform, shared: &CompareOptions) -> TestOutcome {
    let entry_options = case.options.as_ref().unwrap_or(shared);
    let result = transform.apply(&case.input, entry_options);

    match &case.throws {
        Some(Throws::Any(true)) => match result {
            Err(_) => pass(case),
            Ok(_) => fail(case, "expected the transform to raise, but it succeeded"),
        },
        Some(Throws::Contains(needle)) => match result {
            Err(error) => {
                let message = error.to_string();
                if message.contains(needle) {
                    pass(case)
                } else {
                    fail(
                        case,
                        format!(
                            "raised error does not contain {:?}\n  raised: {}",
                            needle, message
                        ),
                    )
                }
            }
            Ok(_) => fail(case, "expected the transform to raise, but it succeeded"),
        },
        Some(Throws::Any(false)) => match result {
            Ok(_) => pass(case),
            Err(error) => fail(
                case,
                format!("expected the transform to succeed, but it raised: {}", error),
            ),
        },
        None => {
            let expected = match &case.output {
                Some(expected) => expected,
                None => return fail(case, "case declares neither 'throws' nor 'output'"),
            };
            let actual = match result {
                Ok(actual) => actual,
                Err(error) => return fail(case, format!("transform raised: {}", error)),
            };
            match assert_ast_eq(expected, &actual, shared) {
                Ok(()) => pass(case),
                Err(error) => {
                    let message = error.to_string();
                    let report = match error.kind {
                        ErrorKind::StructuralMismatch { report, .. } => Some(report),
                        _ => None,
                    };
                    TestOutcome::Fail {
                        name: case.name.clone(),
                        message,
                        report,
                    }
                }
            }
        }
    }
}

fn pass(case: &TestCase) -> TestOutcome {
    TestOutcome::Pass {
        name: case.name.clone(),
    }
}

fn fail(case: &TestCase, message: impl Into<String>) -> TestOutcome {
    TestOutcome::Fail {
        name: case.name.clone(),
        message: message.into(),
        report: None,
    }
}

/// Runs every case in a table, honoring `skip`/`only` flags.
pub fn run_section(
    transform: &dyn Transform,
    cases: &[TestCase],
    options: &CompareOptions,
) -> Vec<TestOutcome> {
    let has_only = cases.iter().any(|case| case.only);
    cases
        .iter()
        .map(|case| match skip_reason(case, has_only, None) {
            Some(reason) => TestOutcome::Skipped {
                name: case.name.clone(),
                reason,
            },
            None => run_case(case, transform, options),
        })
        .collect()
}

/// Helper for test skipping logic.
pub fn skip_reason(case: &TestCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("marked 'skip'".to_string());
    }
    if let Some(needle) = filter {
        if !case.name.to_lowercase().contains(needle) {
            return Some(format!("filtered out by substring: {}", needle));
        }
    }
    None
}

// =============================================================================
// TEST-FRAMEWORK BOUNDARY
// =============================================================================

/// Runs a section, reports to stderr, and panics if any case failed.
///
/// Designed to be the body of a `#[test]` function: structural mismatches
/// and unexpected errors become a failed test, never a process crash.
pub fn test_section(
    name: &str,
    transform: &dyn Transform,
    cases: &[TestCase],
    options: &CompareOptions,
) {
    let outcomes = run_section(transform, cases, options);
    let config = TestConfig::default();
    report_outcomes(name, &outcomes, &config);

    let (_, failed, _) = partition_outcomes(&outcomes);
    if failed > 0 {
        let failures: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.is_fail())
            .map(|o| o.name())
            .collect();
        panic!(
            "section '{}': {} of {} cases failed: {}",
            name,
            failed,
            outcomes.len(),
            failures.join(", ")
        );
    }
}

/// Wraps a fixed pass list into a transform and runs it as a named section.
pub fn test_case(
    name: &str,
    passes: Vec<Box<dyn crate::transform::Pass>>,
    cases: &[TestCase],
    options: &CompareOptions,
) {
    let pipeline = PassPipeline::new(passes);
    test_section(name, &pipeline, cases, options);
}

// =============================================================================
// SUITE DISCOVERY AND LOADING
// =============================================================================

/// Discovers all YAML files recursively under the given root directory.
pub fn discover_suite_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// Loads and parses test cases from a YAML file. Unreadable or malformed
/// files are reported to stderr and contribute no cases.
pub fn load_cases(path: &Path) -> Vec<TestCase> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Vec<TestCase>>(&content) {
            Ok(cases) => cases,
            Err(error) => {
                eprintln!("failed to parse YAML in {}: {}", path.display(), error);
                Vec::new()
            }
        },
        Err(error) => {
            eprintln!("failed to read {}: {}", path.display(), error);
            Vec::new()
        }
    }
}

/// Discovers, loads, and runs every YAML table under `config.suite_root`.
/// Returns `(passed, failed, skipped)`.
pub fn run_suite(
    transform: &dyn Transform,
    config: &TestConfig,
    filter: Option<&str>,
) -> (usize, usize, usize) {
    let files = discover_suite_files(&config.suite_root);

    let mut all_cases = Vec::new();
    let mut has_only = false;
    for path in &files {
        let file_name = path.display().to_string();
        for case in load_cases(path) {
            if case.only {
                has_only = true;
            }
            all_cases.push((file_name.clone(), case));
        }
    }

    let shared = CompareOptions::default();
    let outcomes: Vec<(String, TestOutcome)> = all_cases
        .into_iter()
        .map(|(file, case)| {
            let outcome = match skip_reason(&case, has_only, filter) {
                Some(reason) => TestOutcome::Skipped {
                    name: case.name.clone(),
                    reason,
                },
                None => run_case(&case, transform, &shared),
            };
            (file, outcome)
        })
        .collect();

    for (file, outcome) in &outcomes {
        print_outcome(Some(file.as_str()), outcome, config);
    }

    let flat: Vec<TestOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();
    let (passed, failed, skipped) = partition_outcomes(&flat);
    print_summary(passed, failed, skipped, config);
    (passed, failed, skipped)
}

// =============================================================================
// REPORTING
// =============================================================================

/// Partitions outcomes into `(passed, failed, skipped)` counts.
pub fn partition_outcomes(outcomes: &[TestOutcome]) -> (usize, usize, usize) {
    let passed = outcomes
        .iter()
        .filter(|o| matches!(o, TestOutcome::Pass { .. }))
        .count();
    let failed = outcomes.iter().filter(|o| o.is_fail()).count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, TestOutcome::Skipped { .. }))
        .count();
    (passed, failed, skipped)
}

/// Prints per-case lines and a summary for one section.
pub fn report_outcomes(section: &str, outcomes: &[TestOutcome], config: &TestConfig) {
    for outcome in outcomes {
        print_outcome(Some(section), outcome, config);
    }
    let (passed, failed, skipped) = partition_outcomes(outcomes);
    print_summary(passed, failed, skipped, config);
}

fn print_outcome(group: Option<&str>, outcome: &TestOutcome, config: &TestConfig) {
    let in_group = |name: &str| match group {
        Some(group) => format!("{} [{}]", name, group),
        None => name.to_string(),
    };
    match outcome {
        TestOutcome::Pass { name } => {
            eprintln!("{}: {}", config.colorize("PASS", GREEN), in_group(name));
        }
        TestOutcome::Fail {
            name,
            message,
            report,
        } => {
            eprintln!("{}: {}", config.colorize("FAIL", RED), in_group(name));
            for line in message.lines() {
                eprintln!("  {}", line);
            }
            if let Some(report) = report {
                eprintln!("  {}:", config.colorize("rendered diff", CYAN));
                print_rendering_diff(&report.expected, &report.actual, config);
            }
        }
        TestOutcome::Skipped { name, reason } => {
            eprintln!(
                "{}: {} ({})",
                config.colorize("SKIP", YELLOW),
                in_group(name),
                reason
            );
        }
    }
}

fn print_summary(passed: usize, failed: usize, skipped: usize, config: &TestConfig) {
    eprintln!(
        "summary: total {}, {} {}, {} {}, {} {}",
        passed + failed + skipped,
        config.colorize("passed", GREEN),
        passed,
        config.colorize("failed", RED),
        failed,
        config.colorize("skipped", YELLOW),
        skipped,
    );
}

/// Colored line diff of the two display renderings (expected vs actual).
fn print_rendering_diff(expected: &str, actual: &str, config: &TestConfig) {
    let mut stderr = StandardStream::stderr(if config.use_colors {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                let _ = stderr.reset();
                for line in text.lines() {
                    let _ = writeln!(stderr, "   {}", line);
                }
            }
            Difference::Add(text) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in text.lines() {
                    let _ = writeln!(stderr, "  +{}", line);
                }
            }
            Difference::Rem(text) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in text.lines() {
                    let _ = writeln!(stderr, "  -{}", line);
                }
            }
        }
    }
    let _ = stderr.reset();
}
