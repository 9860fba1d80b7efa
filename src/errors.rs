//! Error handling for the harness.
//!
//! One error type, two families: parse errors (fatal, propagated verbatim)
//! and structural mismatches (carry a full divergence report plus the
//! low-level tree divergence that triggered them, so failure provenance is
//! never lost).

use crate::ast::Span;
use crate::compare::DivergenceReport;
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// Source text plus a display name, used to label parse errors.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_source(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single error type: what went wrong, where, and how to present it.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub source_info: SourceInfo,
    pub diagnostic_info: DiagnosticInfo,
}

#[derive(Debug)]
pub enum ErrorKind {
    /// Malformed source text.
    Syntax { message: String },
    /// A literal the grammar accepted but the builder could not represent
    /// (unparseable or non-finite number, etc).
    InvalidLiteral { literal_type: String, value: String },
    /// A markup element closed with a different tag than it opened with.
    MismatchedTag { open: String, close: String },
    /// Normalized trees differ. Carries the human-readable report and the
    /// tree-level divergence that produced it.
    StructuralMismatch {
        report: DivergenceReport,
        divergence: TreeDivergence,
    },
    /// Engine bug surfaced as an error instead of a panic.
    Internal { message: String },
}

/// Where the error happened.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// How to present it.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// The first point at which two comparison trees disagree. Preserved as the
/// `source()` of a [`ErrorKind::StructuralMismatch`] error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("trees diverge at {path}: {detail}")]
pub struct TreeDivergence {
    /// JSON-pointer-like path into the comparison tree, rooted at `$`.
    pub path: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Compare,
    Internal,
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl Error {
    /// Parse-phase error anchored to a span in the offending source.
    pub fn parse(kind: ErrorKind, source: &SourceContext, span: Span) -> Self {
        let error_code = format!("testkit::parse::{}", kind.code_suffix());
        Self {
            kind,
            source_info: SourceInfo {
                source: source.to_named_source(),
                primary_span: to_source_span(span),
                phase: "parse".into(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }

    /// Structural mismatch between normalized trees.
    pub fn mismatch(
        report: DivergenceReport,
        divergence: TreeDivergence,
        actual_source: &str,
    ) -> Self {
        let source = SourceContext::from_source("actual", actual_source);
        Self {
            kind: ErrorKind::StructuralMismatch { report, divergence },
            source_info: SourceInfo {
                source: source.to_named_source(),
                primary_span: unspanned(),
                phase: "compare".into(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code: "testkit::compare::structural_mismatch".into(),
            },
        }
    }

    /// Internal invariant violation. Should never surface in normal use.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal {
                message: message.into(),
            },
            source_info: SourceInfo {
                source: SourceContext::from_source("internal", "").to_named_source(),
                primary_span: unspanned(),
                phase: "internal".into(),
            },
            diagnostic_info: DiagnosticInfo {
                help: Some("this is a bug in transform-testkit; please report it".into()),
                error_code: "testkit::internal".into(),
            },
        }
    }
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } | Self::InvalidLiteral { .. } | Self::MismatchedTag { .. } => {
                ErrorCategory::Parse
            }
            Self::StructuralMismatch { .. } => ErrorCategory::Compare,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::MismatchedTag { .. } => "mismatched_tag",
            Self::StructuralMismatch { .. } => "structural_mismatch",
            Self::Internal { .. } => "internal",
        }
    }
}

// ============================================================================
// DISPLAY AND DIAGNOSTIC IMPLS
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Syntax { message } => {
                write!(f, "parse error: {}", message)
            }
            ErrorKind::InvalidLiteral {
                literal_type,
                value,
            } => {
                write!(f, "parse error: invalid {} '{}'", literal_type, value)
            }
            ErrorKind::MismatchedTag { open, close } => {
                write!(
                    f,
                    "parse error: closing tag '{}' does not match opening tag '{}'",
                    close, open
                )
            }
            ErrorKind::StructuralMismatch { report, .. } => {
                writeln!(f, "actual source does not structurally match expected source")?;
                write!(f, "{}", report)
            }
            ErrorKind::Internal { message } => {
                write!(f, "internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::StructuralMismatch { divergence, .. } => Some(divergence),
            _ => None,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = match &self.kind {
            ErrorKind::Syntax { .. } => "syntax error here",
            ErrorKind::InvalidLiteral { .. } => "invalid literal",
            ErrorKind::MismatchedTag { .. } => "mismatched closing tag",
            // Mismatches and internal errors are not anchored to a span.
            ErrorKind::StructuralMismatch { .. } | ErrorKind::Internal { .. } => return None,
        };
        let labels = vec![LabeledSpan::new_with_span(
            Some(label.to_string()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

// ============================================================================
// SPAN UTILITIES
// ============================================================================

/// Converts an AST span to a miette source span.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}
