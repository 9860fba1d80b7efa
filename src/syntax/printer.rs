//! Canonical printer for the script dialect.
//!
//! Prints a fixed textual style so that cosmetically different sources
//! become identical text: single-quoted strings, one statement per line,
//! forced semicolons, single spaces around binary operators and after
//! commas, no trailing commas. Printing is precedence-aware, so trees built
//! by transforms (which carry no parenthesization markers) still print
//! unambiguously.

use crate::ast::{
    AttributeValue, BinaryOp, Expr, MarkupChild, MarkupElement, Node, Program, Stmt, StmtKind,
};

#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    /// Re-emit attached comments. On by default; the normalizer removes
    /// comments at the tree level, not here.
    pub comments: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self { comments: true }
    }
}

pub struct Printer {
    options: PrintOptions,
}

impl Printer {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    /// Printer with the canonical conventions used for normalization.
    pub fn canonical() -> Self {
        Self::new(PrintOptions::default())
    }

    pub fn print(&self, program: &Program) -> String {
        let mut out = String::new();
        for stmt in &program.body {
            if self.options.comments {
                for comment in &stmt.leading_comments {
                    out.push_str(&comment.text);
                    out.push('\n');
                }
            }
            out.push_str(&self.print_stmt(stmt));
            out.push('\n');
        }
        if self.options.comments {
            for comment in &program.trailing_comments {
                out.push_str(&comment.text);
                out.push('\n');
            }
        }
        out
    }

    fn print_stmt(&self, stmt: &Stmt) -> String {
        match &stmt.kind {
            StmtKind::Let {
                keyword,
                name,
                ty,
                init,
            } => match ty {
                Some(ty) => format!(
                    "{} {}: {} = {};",
                    keyword.as_str(),
                    name,
                    ty.name,
                    self.print_node(init, 0)
                ),
                None => format!(
                    "{} {} = {};",
                    keyword.as_str(),
                    name,
                    self.print_node(init, 0)
                ),
            },
            StmtKind::Expr { expr } => format!("{};", self.print_node(expr, 0)),
        }
    }

    /// Prints a node, parenthesizing when the node was explicitly
    /// parenthesized in the source or when precedence demands it.
    fn print_node(&self, node: &Node, min_precedence: u8) -> String {
        let printed = self.print_expr(&node.expr);
        if node.parenthesized || precedence(&node.expr) < min_precedence {
            format!("({})", printed)
        } else {
            printed
        }
    }

    fn print_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Number { value, .. } => value.to_string(),
            Expr::Str { value, .. } => quote_single(value),
            Expr::Bool { value } => value.to_string(),
            Expr::Null => "null".to_string(),
            Expr::Ident { name } => name.clone(),
            Expr::Array { elements } => {
                format!("[{}]", self.print_list(elements))
            }
            Expr::Unary { op, operand } => {
                format!("{}{}", op.symbol(), self.print_node(operand, UNARY_PRECEDENCE))
            }
            Expr::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                format!(
                    "{} {} {}",
                    self.print_node(left, prec),
                    op.symbol(),
                    self.print_node(right, prec + 1)
                )
            }
            Expr::Member { object, property } => {
                format!("{}.{}", self.print_node(object, POSTFIX_PRECEDENCE), property)
            }
            Expr::Call { callee, args } => {
                format!(
                    "{}({})",
                    self.print_node(callee, POSTFIX_PRECEDENCE),
                    self.print_list(args)
                )
            }
            Expr::Markup { element } => self.print_markup(element),
        }
    }

    fn print_list(&self, nodes: &[Node]) -> String {
        nodes
            .iter()
            .map(|n| self.print_node(n, 0))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn print_markup(&self, element: &MarkupElement) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(&element.name);

        for attr in &element.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            if let Some(value) = &attr.value {
                out.push('=');
                match value {
                    AttributeValue::Str { value, .. } => out.push_str(&quote_single(value)),
                    AttributeValue::Expr { node } => {
                        out.push('{');
                        out.push_str(&self.print_node(node, 0));
                        out.push('}');
                    }
                }
            }
        }

        if element.children.is_empty() {
            out.push_str("/>");
            return out;
        }

        out.push('>');
        let children = element
            .children
            .iter()
            .map(|child| match child {
                MarkupChild::Element(el) => self.print_markup(el),
                MarkupChild::Text { value, .. } => value.clone(),
                MarkupChild::Expr(node) => format!("{{{}}}", self.print_node(node, 0)),
            })
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&children);
        out.push_str("</");
        out.push_str(&element.name);
        out.push('>');
        out
    }
}

// ============================================================================
// PRECEDENCE
// ============================================================================

const COMPARISON_PRECEDENCE: u8 = 1;
const ADDITIVE_PRECEDENCE: u8 = 2;
const MULTIPLICATIVE_PRECEDENCE: u8 = 3;
const UNARY_PRECEDENCE: u8 = 4;
const POSTFIX_PRECEDENCE: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => UNARY_PRECEDENCE,
        _ => POSTFIX_PRECEDENCE,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => COMPARISON_PRECEDENCE,
        BinaryOp::Add | BinaryOp::Sub => ADDITIVE_PRECEDENCE,
        BinaryOp::Mul | BinaryOp::Div => MULTIPLICATIVE_PRECEDENCE,
    }
}

// ============================================================================
// LITERALS
// ============================================================================

/// Single-quoted form with minimal escaping.
fn quote_single(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}
