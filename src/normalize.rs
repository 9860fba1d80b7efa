//! Normalizer: turns source text into a comparison-ready tree.
//!
//! Pipeline: parse, re-print through the canonical printer, re-parse the
//! canonical text, then lower to a generic JSON value and strip the
//! non-semantic fields. The second parse forces both sides of a comparison
//! through one identical pipeline; it is also what re-anchors comment
//! attachment and collapses literal raw text deterministically.

use crate::compare::CompareOptions;
use crate::errors::{Error, SourceContext};
use crate::syntax::{parse, Printer};
use serde_json::Value;

/// Field names stripped from every node: position spans, raw literal text,
/// parenthesization markers.
pub const EXCLUDED_FIELDS: &[&str] = &["span", "raw", "parenthesized"];

/// Comment attachment fields, stripped only when comments are not preserved.
pub const COMMENT_FIELDS: &[&str] = &["leading_comments", "trailing_comments"];

/// Normalizes source text for structural comparison.
pub fn normalize(source: &str, options: &CompareOptions) -> Result<Value, Error> {
    normalize_labeled(source, "source", options)
}

/// Like [`normalize`], with a label naming the source in parse errors.
pub fn normalize_labeled(
    source: &str,
    label: &str,
    options: &CompareOptions,
) -> Result<Value, Error> {
    let canonical = canonicalize_labeled(source, label)?;
    let ctx = SourceContext::from_source(label, &canonical);
    let program = parse(&canonical, &ctx)?;

    let mut tree =
        serde_json::to_value(&program).map_err(|e| Error::internal(e.to_string()))?;
    strip_excluded(&mut tree, options.comments);
    Ok(tree)
}

/// Re-prints source text in the canonical style (comments retained).
pub fn canonicalize(source: &str) -> Result<String, Error> {
    canonicalize_labeled(source, "source")
}

fn canonicalize_labeled(source: &str, label: &str) -> Result<String, Error> {
    let ctx = SourceContext::from_source(label, source);
    let program = parse(source, &ctx)?;
    Ok(Printer::canonical().print(&program))
}

/// Recursively removes excluded fields, depth-first and in place.
///
/// Only objects are pruned by key; array elements are recursed into but
/// never removed; scalars are left untouched. Trees are finite and bounded
/// by source size, so recursion needs no depth guard.
pub fn strip_excluded(tree: &mut Value, keep_comments: bool) {
    match tree {
        Value::Object(map) => {
            map.retain(|key, _| !is_excluded(key, keep_comments));
            for child in map.values_mut() {
                strip_excluded(child, keep_comments);
            }
        }
        Value::Array(items) => {
            for child in items {
                strip_excluded(child, keep_comments);
            }
        }
        _ => {}
    }
}

fn is_excluded(key: &str, keep_comments: bool) -> bool {
    EXCLUDED_FIELDS.contains(&key) || (!keep_comments && COMMENT_FIELDS.contains(&key))
}
