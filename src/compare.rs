//! Comparator: deep structural equality over normalized trees, with a
//! human-readable divergence report on failure.

use crate::errors::{Error, SourceContext, TreeDivergence};
use crate::normalize::normalize_labeled;
use crate::syntax::{parse, PrintOptions, Printer};
use difference::{Changeset, Difference};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Length of the excerpt shown from each rendering after the common prefix.
pub const EXCERPT_LEN: usize = 60;

/// Comparison options. The only recognized knob: whether comments take part
/// in the comparison. Off by default, so `/* c */ x;` equals `x;`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CompareOptions {
    #[serde(default)]
    pub comments: bool,
}

// ============================================================================
// ASSERTION
// ============================================================================

/// Asserts that two source fragments parse to structurally equal trees
/// after normalization.
///
/// Parse errors on either side propagate unmodified. A structural
/// difference raises [`crate::errors::ErrorKind::StructuralMismatch`]
/// carrying a [`DivergenceReport`], with the low-level [`TreeDivergence`]
/// preserved as the error's source.
pub fn assert_ast_eq(expected: &str, actual: &str, options: &CompareOptions) -> Result<(), Error> {
    let expected_tree = normalize_labeled(expected, "expected", options)?;
    let actual_tree = normalize_labeled(actual, "actual", options)?;

    match tree_eq(&actual_tree, &expected_tree, "$") {
        Ok(()) => Ok(()),
        Err(divergence) => {
            let report = DivergenceReport::build(expected, actual, &expected_tree, &actual_tree)?;
            Err(Error::mismatch(report, divergence, actual))
        }
    }
}

/// Deep structural equality: order-sensitive for arrays, key-set and
/// value-sensitive for objects. Returns the path of the first divergence.
pub fn tree_eq(actual: &Value, expected: &Value, path: &str) -> Result<(), TreeDivergence> {
    match (actual, expected) {
        (Value::Object(actual_map), Value::Object(expected_map)) => {
            for key in expected_map.keys() {
                if !actual_map.contains_key(key) {
                    return Err(divergence(path, format!("missing field '{}'", key)));
                }
            }
            for key in actual_map.keys() {
                if !expected_map.contains_key(key) {
                    return Err(divergence(path, format!("unexpected field '{}'", key)));
                }
            }
            for (key, expected_child) in expected_map {
                // Both maps hold the key; checked above.
                if let Some(actual_child) = actual_map.get(key) {
                    tree_eq(actual_child, expected_child, &format!("{}.{}", path, key))?;
                }
            }
            Ok(())
        }
        (Value::Array(actual_items), Value::Array(expected_items)) => {
            if actual_items.len() != expected_items.len() {
                return Err(divergence(
                    path,
                    format!(
                        "expected {} elements, found {}",
                        expected_items.len(),
                        actual_items.len()
                    ),
                ));
            }
            for (index, (actual_child, expected_child)) in
                actual_items.iter().zip(expected_items).enumerate()
            {
                tree_eq(actual_child, expected_child, &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
        _ if actual == expected => Ok(()),
        _ => Err(divergence(
            path,
            format!("expected {}, found {}", brief(expected), brief(actual)),
        )),
    }
}

fn divergence(path: &str, detail: String) -> TreeDivergence {
    TreeDivergence {
        path: path.to_string(),
        detail,
    }
}

/// Compact single-line rendering of a subtree for divergence messages.
fn brief(value: &Value) -> String {
    let rendered =
        serde_json::to_string(value).unwrap_or_else(|_| String::from("<unprintable>"));
    if rendered.chars().count() > 48 {
        let head: String = rendered.chars().take(45).collect();
        format!("{}...", head)
    } else {
        rendered
    }
}

// ============================================================================
// DIVERGENCE REPORT
// ============================================================================

/// Diagnostics computed when two sources fail structural comparison.
///
/// The renderings here are display-only: both originals are parsed once and
/// pretty-printed with comments retained, independently of the
/// canonicalization used for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceReport {
    pub expected: String,
    pub actual: String,
    /// Longest common literal prefix of the two renderings.
    pub common_prefix: String,
    /// Bounded excerpt of each rendering from the first divergent character.
    pub expected_excerpt: String,
    pub actual_excerpt: String,
    /// Structural diff of the stripped trees (actual vs expected).
    pub tree_diff: String,
}

impl DivergenceReport {
    pub(crate) fn build(
        expected_source: &str,
        actual_source: &str,
        expected_tree: &Value,
        actual_tree: &Value,
    ) -> Result<Self, Error> {
        let expected = render_display(expected_source, "expected")?;
        let actual = render_display(actual_source, "actual")?;

        let prefix_len = common_prefix_len(&expected, &actual);
        let common_prefix: String = expected.chars().take(prefix_len).collect();

        Ok(Self {
            expected_excerpt: excerpt(&expected, prefix_len),
            actual_excerpt: excerpt(&actual, prefix_len),
            expected,
            actual,
            common_prefix,
            tree_diff: render_tree_diff(actual_tree, expected_tree),
        })
    }
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- expected ---")?;
        writeln!(f, "{}", self.expected)?;
        writeln!(f, "--- actual ---")?;
        writeln!(f, "{}", self.actual)?;
        writeln!(f, "--- divergence ---")?;
        writeln!(
            f,
            "common prefix ({} chars): {:?}",
            self.common_prefix.chars().count(),
            self.common_prefix
        )?;
        writeln!(f, "expected continues: {:?}", self.expected_excerpt)?;
        writeln!(f, "actual continues:   {:?}", self.actual_excerpt)?;
        writeln!(f, "--- tree diff (-actual +expected) ---")?;
        write!(f, "{}", self.tree_diff)
    }
}

/// Display rendering of a source fragment: parse once, print with comments
/// retained, trim trailing whitespace.
pub(crate) fn render_display(source: &str, label: &str) -> Result<String, Error> {
    let ctx = SourceContext::from_source(label, source);
    let program = parse(source, &ctx)?;
    let printed = Printer::new(PrintOptions { comments: true }).print(&program);
    Ok(printed.trim_end().to_string())
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count()
}

fn excerpt(text: &str, from_chars: usize) -> String {
    text.chars().skip(from_chars).take(EXCERPT_LEN).collect()
}

/// Renders the structural diff of two trees via the external diff utility.
/// Never fails; worst case is an empty diff body.
fn render_tree_diff(actual: &Value, expected: &Value) -> String {
    let actual_json =
        serde_json::to_string_pretty(actual).unwrap_or_else(|_| String::from("<unprintable>"));
    let expected_json =
        serde_json::to_string_pretty(expected).unwrap_or_else(|_| String::from("<unprintable>"));

    let changeset = Changeset::new(&actual_json, &expected_json, "\n");
    let mut out = String::new();
    for diff in &changeset.diffs {
        let (prefix, text) = match diff {
            Difference::Same(text) => (' ', text),
            Difference::Add(text) => ('+', text),
            Difference::Rem(text) => ('-', text),
        };
        for line in text.lines() {
            out.push(prefix);
            out.push(' ');
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
