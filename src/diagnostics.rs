use std::fmt;

use thiserror::Error;

use crate::{completion::FatalError, value::Value};

/// Represents a byte span within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn to(self, other: SourceSpan) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Resolves the start of the span to a 1-based `(line, column)` pair.
    pub fn location(&self, source: &str) -> Option<(usize, usize)> {
        let offset = self.span?.start.min(source.len());
        let prefix = &source[..offset];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rfind('\n')
            .map(|idx| prefix[idx + 1..].chars().count())
            .unwrap_or_else(|| prefix.chars().count())
            + 1;
        Some((line, column))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {}", self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type returned across the host boundary.
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    /// A script `throw` (or internal failure) that no `catch` claimed.
    #[error("Uncaught {message}")]
    Uncaught { value: Value, message: String },
    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TesseraError {
    /// The thrown value, when the error is an uncaught script exception.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            TesseraError::Uncaught { value, .. } => Some(value),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TesseraError>;
