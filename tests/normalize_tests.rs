//! Equivalence properties of the normalizer: cosmetic differences must
//! vanish, semantic differences must survive.

use pretty_assertions::assert_eq;
use transform_testkit::{assert_ast_eq, canonicalize, normalize, CompareOptions};

fn eq(expected: &str, actual: &str) -> bool {
    assert_ast_eq(expected, actual, &CompareOptions::default()).is_ok()
}

fn eq_with_comments(expected: &str, actual: &str) -> bool {
    assert_ast_eq(expected, actual, &CompareOptions { comments: true }).is_ok()
}

#[test]
fn quote_style_is_cosmetic() {
    assert!(eq("const x = 'a'", "const x = \"a\""));
}

#[test]
fn comments_are_cosmetic_by_default() {
    assert!(eq("/* c */ const x = 1;", "const x = 1;"));
    assert!(eq("const x = 1; // note", "const x = 1;"));
}

#[test]
fn comments_are_semantic_when_preserved() {
    assert!(!eq_with_comments("/* c */ const x = 1;", "const x = 1;"));
    // Identical comments still compare equal, wherever the line breaks are.
    assert!(eq_with_comments("/* c */ const x = 1;", "/* c */\nconst x = 1;"));
    // Different comment text is a real difference.
    assert!(!eq_with_comments("/* c */ const x = 1;", "/* d */ const x = 1;"));
}

#[test]
fn whitespace_layout_is_cosmetic() {
    assert!(eq("let x = f(1, 2);", "let x =\n  f(\n    1,\n    2\n  )"));
}

#[test]
fn trailing_commas_are_cosmetic() {
    assert!(eq("f(a, b,)", "f(a, b)"));
    assert!(eq("[1, 2,]", "[1, 2]"));
}

#[test]
fn semicolons_are_cosmetic() {
    assert!(eq("let x = 1", "let x = 1;"));
}

#[test]
fn redundant_parens_are_cosmetic() {
    assert!(eq("(x);", "x;"));
    assert!(eq("(a) + (b);", "a + b;"));
}

#[test]
fn number_raw_text_is_cosmetic() {
    assert!(eq("let x = 1.50", "let x = 1.5"));
}

#[test]
fn value_differences_are_semantic() {
    assert!(!eq("let x = 1;", "let x = 2;"));
    assert!(!eq("let x = 1;", "const x = 1;"));
    assert!(!eq("f(a, b);", "f(b, a);"));
}

#[test]
fn type_annotations_are_semantic() {
    assert!(!eq("let x: num = 1", "let x = 1"));
    assert!(eq("let x: num = 1;", "let x:num=1"));
}

#[test]
fn markup_layout_is_cosmetic_but_attribute_order_is_not() {
    assert!(eq("<a b='c'>hi</a>;", "<a   b=\"c\" > hi </a>;"));
    assert!(eq("<br></br>;", "<br/>;"));
    assert!(!eq("<a x='1' y='2'/>;", "<a y='2' x='1'/>;"));
}

#[test]
fn empty_sources_compare_equal() {
    assert!(eq("", "   \n\t"));
    assert!(eq("", "// only a comment"));
}

#[test]
fn normalization_is_idempotent() {
    let sources = [
        "let x = \"a\"",
        "/* c */ const y: str = 'b'; // tail",
        "f(a, 1.50, [2, 3,],);",
        "-a + b * (c - d) <= e;",
        "<a b='c' on={x + 1}>hi <b/> {y}</a>;",
    ];
    for source in sources {
        for options in [
            CompareOptions::default(),
            CompareOptions { comments: true },
        ] {
            let canonical = canonicalize(source).unwrap();
            assert_eq!(
                normalize(&canonical, &options).unwrap(),
                normalize(source, &options).unwrap(),
                "idempotence failed for {:?}",
                source
            );
            // Canonical text is a fixed point of canonicalization.
            assert_eq!(canonicalize(&canonical).unwrap(), canonical);
        }
    }
}
