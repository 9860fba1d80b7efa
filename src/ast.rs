//! AST for the script dialect understood by the harness.
//!
//! Every node carries a source span, literal nodes keep their raw text, and
//! parenthesized expressions are flagged rather than wrapped. The whole tree
//! derives `Serialize` so it can be lowered to a generic JSON value for
//! structural comparison; the field names here are the contract for the
//! normalizer's exclusion sets.

use serde::{Deserialize, Serialize};

// ============================================================================
// SPANS AND TRIVIA
// ============================================================================

/// A byte range in the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

/// A `//` line or `/* */` block comment. The text is kept verbatim,
/// delimiters included, so re-printing is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

// ============================================================================
// PROGRAM AND STATEMENTS
// ============================================================================

/// A parsed source fragment. Empty source parses to an empty program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
    /// Comments after the last statement (or in a statement-free program).
    pub trailing_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Comments lexically preceding (or enclosed by) this statement.
    pub leading_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Let {
        keyword: DeclKeyword,
        name: String,
        ty: Option<TypeAnn>,
        init: Node,
    },
    Expr {
        expr: Node,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKeyword {
    Let,
    Const,
}

impl DeclKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKeyword::Let => "let",
            DeclKeyword::Const => "const",
        }
    }
}

/// Optional type annotation on a declaration, e.g. `let x: num = 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnn {
    pub name: String,
    pub span: Span,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Expression wrapper carrying the non-semantic bookkeeping fields.
///
/// Keeping `span` and `parenthesized` here (instead of on every `Expr`
/// variant) means they serialize as named object keys at a single level,
/// which is what the normalizer's field stripping operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub expr: Expr,
    pub span: Span,
    pub parenthesized: bool,
}

impl Node {
    pub fn new(expr: Expr, span: Span) -> Self {
        Self {
            expr,
            span,
            parenthesized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number { value: f64, raw: String },
    Str { value: String, raw: String },
    Bool { value: bool },
    Null,
    Ident { name: String },
    Array { elements: Vec<Node> },
    Unary { op: UnaryOp, operand: Box<Node> },
    Binary { op: BinaryOp, left: Box<Node>, right: Box<Node> },
    Member { object: Box<Node>, property: String },
    Call { callee: Box<Node>, args: Vec<Node> },
    Markup { element: MarkupElement },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

// ============================================================================
// EMBEDDED MARKUP
// ============================================================================

/// Embedded markup element, e.g. `<tag attr='v' on={expr}>children</tag>`.
///
/// `<a></a>` and `<a/>` build the same node: self-closing is a printing
/// decision (no children), not a stored fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<MarkupAttribute>,
    pub children: Vec<MarkupChild>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupAttribute {
    pub name: String,
    /// `None` for bare flag attributes (`<a flag>`).
    pub value: Option<AttributeValue>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str { value: String, raw: String },
    Expr { node: Node },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkupChild {
    Element(MarkupElement),
    /// Text run with surrounding whitespace trimmed and inner runs
    /// collapsed to single spaces. Whitespace-only runs are dropped at
    /// parse time.
    Text { value: String, span: Span },
    Expr(Node),
}
