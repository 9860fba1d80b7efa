//! Parser for the script dialect.
//!
//! Converts source text into spanned AST nodes. Purely syntactic: no name
//! resolution, no type checking. Comments are invisible to the grammar and
//! collected by a separate string-aware scan, then attached to the statement
//! they lexically precede or enclose.

use crate::ast::{
    AttributeValue, BinaryOp, Comment, DeclKeyword, Expr, MarkupAttribute, MarkupChild,
    MarkupElement, Node, Program, Span, Stmt, StmtKind, TypeAnn, UnaryOp,
};
use crate::errors::{Error, ErrorKind, SourceContext};
use pest::{error::Error as PestError, iterators::Pair, Parser};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ScriptParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse source text into a [`Program`].
///
/// Empty and whitespace-only input parse to an empty program. Any grammar
/// violation is fatal and reported against `source`.
pub fn parse(source_text: &str, source: &SourceContext) -> Result<Program, Error> {
    let pairs = ScriptParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, source))?;

    let program = pairs.peek().ok_or_else(|| {
        Error::internal("pest accepted input without producing a program pair")
    })?;

    let mut body = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        body.push(build_statement(pair, source)?);
    }

    let comments = scan_comments(source_text);
    let (body, trailing_comments) = attach_comments(body, comments);

    Ok(Program {
        body,
        span: Span {
            start: 0,
            end: source_text.len(),
        },
        trailing_comments,
    })
}

// ============================================================================
// STATEMENT BUILDERS
// ============================================================================

fn build_statement(pair: Pair<Rule>, source: &SourceContext) -> Result<Stmt, Error> {
    let span = get_span(&pair);
    let inner = first_inner(pair)?;

    let kind = match inner.as_rule() {
        Rule::let_stmt => build_let(inner, source)?,
        Rule::expr_stmt => StmtKind::Expr {
            expr: build_expr(first_inner(inner)?, source)?,
        },
        rule => return Err(unsupported_rule(rule, source, span)),
    };

    Ok(Stmt {
        kind,
        span,
        leading_comments: Vec::new(),
    })
}

fn build_let(pair: Pair<Rule>, source: &SourceContext) -> Result<StmtKind, Error> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();

    let keyword = match next_pair(&mut inner, span)?.as_str() {
        "const" => DeclKeyword::Const,
        _ => DeclKeyword::Let,
    };
    let name = next_pair(&mut inner, span)?.as_str().to_string();

    let mut next = next_pair(&mut inner, span)?;
    let ty = if next.as_rule() == Rule::type_ann {
        let ty_span = get_span(&next);
        let ty_name = first_inner(next)?.as_str().to_string();
        next = next_pair(&mut inner, span)?;
        Some(TypeAnn {
            name: ty_name,
            span: ty_span,
        })
    } else {
        None
    };

    Ok(StmtKind::Let {
        keyword,
        name,
        ty,
        init: build_expr(next, source)?,
    })
}

// ============================================================================
// EXPRESSION BUILDERS
// ============================================================================

fn build_expr(pair: Pair<Rule>, source: &SourceContext) -> Result<Node, Error> {
    let span = get_span(&pair);

    match pair.as_rule() {
        // Transparent wrappers.
        Rule::expr | Rule::primary => build_expr(first_inner(pair)?, source),

        Rule::comparison | Rule::additive | Rule::multiplicative => {
            build_binary_chain(pair, source)
        }

        Rule::unary => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner, span)?;
            if first.as_rule() == Rule::unary_op {
                let op = match first.as_str() {
                    "-" => UnaryOp::Neg,
                    _ => UnaryOp::Not,
                };
                let operand = build_expr(next_pair(&mut inner, span)?, source)?;
                Ok(Node::new(
                    Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            } else {
                build_expr(first, source)
            }
        }

        Rule::postfix => build_postfix(pair, source),

        Rule::number => build_number(pair, source),

        Rule::string => {
            let raw = pair.as_str().to_string();
            let value = decode_string(&raw);
            Ok(Node::new(Expr::Str { value, raw }, span))
        }

        Rule::boolean => Ok(Node::new(
            Expr::Bool {
                value: pair.as_str() == "true",
            },
            span,
        )),

        Rule::null => Ok(Node::new(Expr::Null, span)),

        Rule::ident => Ok(Node::new(
            Expr::Ident {
                name: pair.as_str().to_string(),
            },
            span,
        )),

        Rule::array => {
            let elements = pair
                .into_inner()
                .map(|p| build_expr(p, source))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::new(Expr::Array { elements }, span))
        }

        Rule::paren => {
            let mut node = build_expr(first_inner(pair)?, source)?;
            node.parenthesized = true;
            node.span = span;
            Ok(node)
        }

        Rule::markup => {
            let element = build_markup(pair, source)?;
            Ok(Node::new(Expr::Markup { element }, span))
        }

        rule => Err(unsupported_rule(rule, source, span)),
    }
}

/// Folds `operand (op operand)*` into left-associated binary nodes. A chain
/// with a single operand collapses to that operand.
fn build_binary_chain(pair: Pair<Rule>, source: &SourceContext) -> Result<Node, Error> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();

    let mut node = build_expr(next_pair(&mut inner, span)?, source)?;
    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_str());
        let rhs = build_expr(next_pair(&mut inner, span)?, source)?;
        let combined = node.span.to(rhs.span);
        node = Node::new(
            Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(rhs),
            },
            combined,
        );
    }
    Ok(node)
}

fn build_postfix(pair: Pair<Rule>, source: &SourceContext) -> Result<Node, Error> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();

    let mut node = build_expr(next_pair(&mut inner, span)?, source)?;
    for op in inner {
        let op_span = get_span(&op);
        match op.as_rule() {
            Rule::call_args => {
                let args = op
                    .into_inner()
                    .map(|p| build_expr(p, source))
                    .collect::<Result<Vec<_>, _>>()?;
                let combined = node.span.to(op_span);
                node = Node::new(
                    Expr::Call {
                        callee: Box::new(node),
                        args,
                    },
                    combined,
                );
            }
            Rule::member => {
                let property = first_inner(op)?.as_str().to_string();
                let combined = node.span.to(op_span);
                node = Node::new(
                    Expr::Member {
                        object: Box::new(node),
                        property,
                    },
                    combined,
                );
            }
            rule => return Err(unsupported_rule(rule, source, op_span)),
        }
    }
    Ok(node)
}

fn build_number(pair: Pair<Rule>, source: &SourceContext) -> Result<Node, Error> {
    let span = get_span(&pair);
    let raw = pair.as_str().to_string();
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite());
    match value {
        Some(value) => Ok(Node::new(Expr::Number { value, raw }, span)),
        None => Err(Error::parse(
            ErrorKind::InvalidLiteral {
                literal_type: "number".into(),
                value: raw,
            },
            source,
            span,
        )),
    }
}

// ============================================================================
// MARKUP BUILDERS
// ============================================================================

fn build_markup(pair: Pair<Rule>, source: &SourceContext) -> Result<MarkupElement, Error> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();

    let name = next_pair(&mut inner, span)?.as_str().to_string();
    let mut attributes = Vec::new();
    let mut children = Vec::new();

    for part in inner {
        match part.as_rule() {
            Rule::markup_attr => attributes.push(build_markup_attr(part, source)?),
            Rule::self_close => {}
            Rule::markup_body => {
                for piece in part.into_inner() {
                    match piece.as_rule() {
                        Rule::markup_child => {
                            if let Some(child) = build_markup_child(piece, source)? {
                                children.push(child);
                            }
                        }
                        Rule::ident => {
                            let close = piece.as_str();
                            if close != name {
                                return Err(Error::parse(
                                    ErrorKind::MismatchedTag {
                                        open: name,
                                        close: close.to_string(),
                                    },
                                    source,
                                    get_span(&piece),
                                ));
                            }
                        }
                        rule => {
                            return Err(unsupported_rule(rule, source, get_span(&piece)));
                        }
                    }
                }
            }
            rule => return Err(unsupported_rule(rule, source, get_span(&part))),
        }
    }

    Ok(MarkupElement {
        name,
        attributes,
        children,
        span,
    })
}

fn build_markup_attr(pair: Pair<Rule>, source: &SourceContext) -> Result<MarkupAttribute, Error> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();

    let name = next_pair(&mut inner, span)?.as_str().to_string();
    let value = match inner.next() {
        Some(value_pair) => {
            let inner_value = first_inner(value_pair)?;
            match inner_value.as_rule() {
                Rule::string => {
                    let raw = inner_value.as_str().to_string();
                    let value = decode_string(&raw);
                    Some(AttributeValue::Str { value, raw })
                }
                Rule::markup_expr => Some(AttributeValue::Expr {
                    node: build_expr(first_inner(inner_value)?, source)?,
                }),
                rule => return Err(unsupported_rule(rule, source, span)),
            }
        }
        None => None,
    };

    Ok(MarkupAttribute { name, value, span })
}

/// Builds one markup child; whitespace-only text runs dissolve into `None`.
fn build_markup_child(
    pair: Pair<Rule>,
    source: &SourceContext,
) -> Result<Option<MarkupChild>, Error> {
    let inner = first_inner(pair)?;
    let span = get_span(&inner);

    match inner.as_rule() {
        Rule::markup => Ok(Some(MarkupChild::Element(build_markup(inner, source)?))),
        Rule::markup_expr => Ok(Some(MarkupChild::Expr(build_expr(
            first_inner(inner)?,
            source,
        )?))),
        Rule::markup_text => {
            let value = collapse_whitespace(inner.as_str());
            if value.is_empty() {
                Ok(None)
            } else {
                Ok(Some(MarkupChild::Text { value, span }))
            }
        }
        rule => Err(unsupported_rule(rule, source, span)),
    }
}

// ============================================================================
// COMMENT COLLECTION
// ============================================================================

/// Scans source for `//` and `/* */` comments, skipping string literals.
///
/// Runs only after a successful grammar parse, so every block comment is
/// known to be terminated and every quote balanced.
fn scan_comments(source: &str) -> Vec<Comment> {
    let bytes = source.as_bytes();
    let mut comments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                    } else if bytes[i] == quote {
                        i += 1;
                        break;
                    } else {
                        i += 1;
                    }
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                comments.push(Comment {
                    text: source[start..i].to_string(),
                    span: Span { start, end: i },
                });
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                comments.push(Comment {
                    text: source[start..i].to_string(),
                    span: Span { start, end: i },
                });
            }
            _ => i += 1,
        }
    }

    comments
}

/// Attaches each comment to the first statement whose span ends after it;
/// the rest become program trailing comments.
fn attach_comments(mut body: Vec<Stmt>, comments: Vec<Comment>) -> (Vec<Stmt>, Vec<Comment>) {
    let mut pending = comments.into_iter().peekable();
    for stmt in body.iter_mut() {
        while let Some(comment) = pending.peek() {
            if comment.span.start < stmt.span.end {
                if let Some(comment) = pending.next() {
                    stmt.leading_comments.push(comment);
                }
            } else {
                break;
            }
        }
    }
    (body, pending.collect())
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

/// The grammar guarantees an inner pair for every rule this is called on;
/// a missing one is an engine bug, not a user error.
fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, Error> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| Error::internal(format!("rule {:?} produced no inner pair", rule)))
}

fn next_pair<'a>(
    inner: &mut pest::iterators::Pairs<'a, Rule>,
    span: Span,
) -> Result<Pair<'a, Rule>, Error> {
    inner.next().ok_or_else(|| {
        Error::internal(format!(
            "grammar invariant broken near offset {}",
            span.start
        ))
    })
}

fn binary_op(symbol: &str) -> BinaryOp {
    match symbol {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        _ => BinaryOp::Ge,
    }
}

/// Strips quotes and resolves escapes. Unknown escapes keep their backslash.
fn decode_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unsupported_rule(rule: Rule, source: &SourceContext, span: Span) -> Error {
    Error::parse(
        ErrorKind::Syntax {
            message: format!("unsupported construct: {:?}", rule),
        },
        source,
        span,
    )
}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

fn convert_parse_error(error: PestError<Rule>, source: &SourceContext) -> Error {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    let message = match &error.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } => {
            let mut expected: Vec<&str> = positives.iter().map(|r| friendly_rule(*r)).collect();
            expected.sort_unstable();
            expected.dedup();
            if expected.is_empty() {
                "syntax error".to_string()
            } else {
                format!("expected {}", expected.join(" or "))
            }
        }
        pest::error::ErrorVariant::CustomError { message } => message.clone(),
    };

    Error::parse(ErrorKind::Syntax { message }, source, span)
}

fn friendly_rule(rule: Rule) -> &'static str {
    match rule {
        Rule::statement | Rule::let_stmt | Rule::expr_stmt => "a statement",
        Rule::expr
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative
        | Rule::unary
        | Rule::postfix
        | Rule::primary => "an expression",
        Rule::ident => "an identifier",
        Rule::number => "a number",
        Rule::string => "a string",
        Rule::type_ann => "a type annotation",
        Rule::call_args | Rule::member => "a call or member access",
        Rule::markup | Rule::markup_body | Rule::markup_child => "a markup element",
        Rule::markup_attr | Rule::attr_value => "a markup attribute",
        Rule::self_close => "'/>'",
        Rule::markup_expr => "'{'",
        Rule::EOI => "end of input",
        _ => "valid syntax",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, StmtKind};

    fn ctx(source: &str) -> SourceContext {
        SourceContext::from_source("test", source)
    }

    #[test]
    fn empty_input_is_an_empty_program() {
        let program = parse("", &ctx("")).unwrap();
        assert!(program.body.is_empty());
        assert!(program.trailing_comments.is_empty());
    }

    #[test]
    fn whitespace_only_input_is_an_empty_program() {
        let program = parse("  \n\t ", &ctx("  \n\t ")).unwrap();
        assert!(program.body.is_empty());
    }

    #[test]
    fn parses_a_declaration() {
        let source = "let x = 1;";
        let program = parse(source, &ctx(source)).unwrap();
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::Let { keyword, name, ty, init } => {
                assert_eq!(*keyword, DeclKeyword::Let);
                assert_eq!(name, "x");
                assert!(ty.is_none());
                assert!(matches!(init.expr, Expr::Number { value, .. } if value == 1.0));
            }
            other => panic!("expected let statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_typed_declaration() {
        let source = "const x: num = 2";
        let program = parse(source, &ctx(source)).unwrap();
        match &program.body[0].kind {
            StmtKind::Let { keyword, ty, .. } => {
                assert_eq!(*keyword, DeclKeyword::Const);
                assert_eq!(ty.as_ref().unwrap().name, "num");
            }
            other => panic!("expected let statement, got {:?}", other),
        }
    }

    #[test]
    fn trailing_comma_in_call_is_accepted() {
        let source = "f(a, b,);";
        let program = parse(source, &ctx(source)).unwrap();
        match &program.body[0].kind {
            StmtKind::Expr { expr } => match &expr.expr {
                Expr::Call { args, .. } => assert_eq!(args.len(), 2),
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let source = "a - b - c;";
        let program = parse(source, &ctx(source)).unwrap();
        match &program.body[0].kind {
            StmtKind::Expr { expr } => match &expr.expr {
                Expr::Binary { op, left, .. } => {
                    assert_eq!(*op, BinaryOp::Sub);
                    assert!(matches!(left.expr, Expr::Binary { .. }));
                }
                other => panic!("expected binary, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn comments_attach_to_the_following_statement() {
        let source = "// first\nlet x = 1;\n/* second */\nlet y = 2;\n// tail";
        let program = parse(source, &ctx(source)).unwrap();
        assert_eq!(program.body[0].leading_comments.len(), 1);
        assert_eq!(program.body[0].leading_comments[0].text, "// first");
        assert_eq!(program.body[1].leading_comments[0].text, "/* second */");
        assert_eq!(program.trailing_comments.len(), 1);
        assert_eq!(program.trailing_comments[0].text, "// tail");
    }

    #[test]
    fn comment_lookalikes_inside_strings_are_not_comments() {
        let source = "let x = 'no // comment /* here */';";
        let program = parse(source, &ctx(source)).unwrap();
        assert!(program.body[0].leading_comments.is_empty());
        assert!(program.trailing_comments.is_empty());
    }

    #[test]
    fn unmatched_paren_is_a_parse_error() {
        let source = "f(a, b";
        let err = parse(source, &ctx(source)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    }

    #[test]
    fn non_finite_number_is_rejected() {
        let source = "let x = 1e999;";
        let err = parse(source, &ctx(source)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidLiteral { .. }));
    }

    #[test]
    fn markup_close_tag_must_match() {
        let source = "<a>text</b>;";
        let err = parse(source, &ctx(source)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MismatchedTag { .. }));
    }

    #[test]
    fn block_comments_inside_markup_are_trivia() {
        let source = "<a>foo /* c */ bar</a>;";
        let program = parse(source, &ctx(source)).unwrap();
        assert_eq!(program.body[0].leading_comments.len(), 1);
        assert_eq!(program.body[0].leading_comments[0].text, "/* c */");
        match &program.body[0].kind {
            StmtKind::Expr { expr } => match &expr.expr {
                Expr::Markup { element } => assert_eq!(element.children.len(), 2),
                other => panic!("expected markup, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn markup_whitespace_children_are_dropped() {
        let source = "<a>  <b/>  </a>;";
        let program = parse(source, &ctx(source)).unwrap();
        match &program.body[0].kind {
            StmtKind::Expr { expr } => match &expr.expr {
                Expr::Markup { element } => {
                    assert_eq!(element.children.len(), 1);
                    assert!(matches!(element.children[0], MarkupChild::Element(_)));
                }
                other => panic!("expected markup, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }
}
