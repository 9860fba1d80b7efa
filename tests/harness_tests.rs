//! Runner behavior: throws dispatch, options forwarding, the libtest
//! boundary, pass pipelines, and YAML suites.

use std::fs;

use transform_testkit::{
    discover_suite_files, load_cases, parse, run_case, run_section, run_suite, test_case,
    test_section, CompareOptions, Pass, Printer, SourceContext, TestCase, TestConfig, TestOutcome,
    Throws,
};

/// The transform from the end-to-end example: append a semicolon.
fn append_semicolon(source: &str, _options: &CompareOptions) -> miette::Result<String> {
    let trimmed = source.trim_end();
    if trimmed.ends_with(';') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{};", trimmed))
    }
}

fn reparse(source: &str, _options: &CompareOptions) -> miette::Result<String> {
    let ctx = SourceContext::from_source("input", source);
    let program = parse(source, &ctx)?;
    Ok(Printer::canonical().print(&program))
}

fn failing(_source: &str, _options: &CompareOptions) -> miette::Result<String> {
    Err(miette::miette!("boom: flux capacitor"))
}

fn shared() -> CompareOptions {
    CompareOptions::default()
}

// =============================================================================
// END-TO-END EXAMPLE
// =============================================================================

#[test]
fn adds_semicolon_table_passes() {
    let cases = [TestCase::new("adds semicolon", "let x = 1").output("let x = 1;")];
    let outcomes = run_section(&append_semicolon, &cases, &shared());
    assert!(matches!(outcomes[0], TestOutcome::Pass { .. }));
}

#[test]
fn wrong_output_pinpoints_the_digit() {
    let cases = [TestCase::new("adds semicolon", "let x = 1").output("let x = 2;")];
    let outcomes = run_section(&append_semicolon, &cases, &shared());
    match &outcomes[0] {
        TestOutcome::Fail { report, .. } => {
            let report = report.as_ref().expect("mismatch failures carry a report");
            assert_eq!(report.common_prefix, "let x = ");
            assert_eq!(report.expected_excerpt, "2;");
            assert_eq!(report.actual_excerpt, "1;");
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

// =============================================================================
// THROWS DISPATCH
// =============================================================================

#[test]
fn throws_true_requires_any_error() {
    let case = TestCase::new("raises", "x").throws(Throws::Any(true));
    assert!(matches!(
        run_case(&case, &failing, &shared()),
        TestOutcome::Pass { .. }
    ));
    assert!(run_case(&case, &append_semicolon, &shared()).is_fail());
}

#[test]
fn throws_substring_matches_the_message() {
    let matching = TestCase::new("raises boom", "x").throws(Throws::Contains("boom".into()));
    assert!(matches!(
        run_case(&matching, &failing, &shared()),
        TestOutcome::Pass { .. }
    ));

    let wrong = TestCase::new("raises other", "x").throws(Throws::Contains("other".into()));
    assert!(run_case(&wrong, &failing, &shared()).is_fail());

    let succeeded = TestCase::new("never raises", "x").throws(Throws::Contains("boom".into()));
    assert!(run_case(&succeeded, &append_semicolon, &shared()).is_fail());
}

#[test]
fn throws_false_ignores_output() {
    // Output present but deliberately wrong: only absence-of-error matters.
    let case = TestCase::new("no raise", "x")
        .output("completely_different;")
        .throws(Throws::Any(false));
    assert!(matches!(
        run_case(&case, &append_semicolon, &shared()),
        TestOutcome::Pass { .. }
    ));
    assert!(run_case(&case, &failing, &shared()).is_fail());
}

#[test]
fn transform_parse_errors_match_throws_directives() {
    let case = TestCase::new("bad input", "f(").throws(Throws::Contains("expected".into()));
    assert!(matches!(
        run_case(&case, &reparse, &shared()),
        TestOutcome::Pass { .. }
    ));
}

// =============================================================================
// OPTIONS ROUTING
// =============================================================================

#[test]
fn entry_options_reach_the_transform() {
    // A transform that raises only when handed comment-preserving options:
    // the case passes exactly because its own options were forwarded.
    let picky = |_source: &str, options: &CompareOptions| -> miette::Result<String> {
        if options.comments {
            Err(miette::miette!("comments enabled"))
        } else {
            Ok("x;".to_string())
        }
    };
    let case = TestCase::new("sees entry options", "x")
        .options(CompareOptions { comments: true })
        .throws(Throws::Contains("comments enabled".into()));
    assert!(matches!(
        run_case(&case, &picky, &shared()),
        TestOutcome::Pass { .. }
    ));

    let without = TestCase::new("sees shared options", "x").throws(Throws::Any(false));
    assert!(matches!(
        run_case(&without, &picky, &shared()),
        TestOutcome::Pass { .. }
    ));
}

#[test]
fn comparison_uses_the_shared_options() {
    // Entry options preserve comments, but the comparison runs with the
    // shared (comment-stripping) options, so the comment-only difference
    // does not fail the case.
    let case = TestCase::new("comment difference", "/* c */ x;")
        .output("x;")
        .options(CompareOptions { comments: true });
    assert!(matches!(
        run_case(&case, &reparse, &shared()),
        TestOutcome::Pass { .. }
    ));
}

// =============================================================================
// SECTIONS, SKIP/ONLY, AND THE LIBTEST BOUNDARY
// =============================================================================

#[test]
fn run_section_honors_skip_and_only() {
    let mut skipped = TestCase::new("skipped", "x").output("x;");
    skipped.skip = true;
    let normal = TestCase::new("normal", "x").output("x;");
    let outcomes = run_section(&reparse, &[skipped, normal], &shared());
    assert!(matches!(outcomes[0], TestOutcome::Skipped { .. }));
    assert!(matches!(outcomes[1], TestOutcome::Pass { .. }));

    let mut only = TestCase::new("only", "x").output("x;");
    only.only = true;
    let other = TestCase::new("other", "x").output("x;");
    let outcomes = run_section(&reparse, &[only, other], &shared());
    assert!(matches!(outcomes[0], TestOutcome::Pass { .. }));
    assert!(matches!(outcomes[1], TestOutcome::Skipped { .. }));
}

#[test]
fn test_section_accepts_a_green_table() {
    let cases = [
        TestCase::new("adds semicolon", "let x = 1").output("let x = 1;"),
        TestCase::new("keeps semicolon", "let x = 1;").output("let x = 1;"),
    ];
    test_section("append-semicolon", &append_semicolon, &cases, &shared());
}

#[test]
#[should_panic(expected = "1 of 1 cases failed")]
fn test_section_panics_on_failure() {
    let cases = [TestCase::new("wrong", "let x = 1").output("let x = 2;")];
    test_section("append-semicolon", &append_semicolon, &cases, &shared());
}

// =============================================================================
// PASS PIPELINES
// =============================================================================

struct RenameTopLevel {
    from: String,
    to: String,
}

impl Pass for RenameTopLevel {
    fn name(&self) -> &str {
        "rename-top-level"
    }

    fn run(
        &self,
        mut program: transform_testkit::ast::Program,
    ) -> miette::Result<transform_testkit::ast::Program> {
        use transform_testkit::ast::{Expr, StmtKind};
        for stmt in &mut program.body {
            if let StmtKind::Expr { expr } = &mut stmt.kind {
                if let Expr::Ident { name } = &mut expr.expr {
                    if *name == self.from {
                        *name = self.to.clone();
                    }
                }
            }
        }
        Ok(program)
    }
}

#[test]
fn test_case_drives_a_pass_pipeline() {
    let cases = [
        TestCase::new("renames", "x").output("y;"),
        TestCase::new("leaves others alone", "z").output("z;"),
        TestCase::new("rejects malformed input", "f(").throws(Throws::Any(true)),
    ];
    test_case(
        "rename-x-to-y",
        vec![Box::new(RenameTopLevel {
            from: "x".into(),
            to: "y".into(),
        })],
        &cases,
        &shared(),
    );
}

// =============================================================================
// YAML SUITES
// =============================================================================

#[test]
fn yaml_suites_load_and_run() {
    let dir = std::env::temp_dir().join(format!("testkit-suite-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp suite dir");
    let path = dir.join("cases.yaml");
    fs::write(
        &path,
        r#"
- name: "identity"
  input: "let x = 'a'"
  output: "let x = 'a';"
- name: "rejects bad input"
  input: "f("
  throws: "expected"
- name: "parked"
  input: "x"
  throws: false
  skip: true
"#,
    )
    .expect("write suite file");

    let files = discover_suite_files(&dir);
    assert_eq!(files.len(), 1);
    assert_eq!(load_cases(&files[0]).len(), 3);

    let config = TestConfig {
        suite_root: dir.display().to_string(),
        use_colors: false,
    };
    let (passed, failed, skipped) = run_suite(&reparse, &config, None);
    assert_eq!((passed, failed, skipped), (2, 0, 1));

    let (passed, failed, skipped) = run_suite(&reparse, &config, Some("identity"));
    assert_eq!((passed, failed, skipped), (1, 0, 2));

    fs::remove_file(&path).ok();
    fs::remove_dir(&dir).ok();
}
