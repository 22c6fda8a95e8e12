use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

pub type Label = Rc<str>;

/// Outcome of evaluating a statement. `Throw` travels separately as
/// [`Exception::Throw`] so that `?` carries it through expression evaluation.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal(Option<Value>),
    Return(Value),
    /// Target label and the value produced before the jump.
    Break(Option<Label>, Option<Value>),
    Continue(Option<Label>, Option<Value>),
}

impl Completion {
    pub const EMPTY: Completion = Completion::Normal(None);

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    /// Replaces an empty normal value with `value`, as statement lists do.
    pub fn update_empty(self, value: Option<Value>) -> Completion {
        match self {
            Completion::Normal(None) => Completion::Normal(value),
            other => other,
        }
    }

    /// Fills the empty value of a `break` or `continue` with `value`.
    pub fn fill_jump_value(self, value: Option<Value>) -> Completion {
        match self {
            Completion::Break(label, None) => Completion::Break(label, value),
            Completion::Continue(label, None) => Completion::Continue(label, value),
            other => other,
        }
    }
}

/// The abrupt channel of evaluation.
#[derive(Debug, Clone)]
pub enum Exception {
    /// A script-visible throw carrying an arbitrary value.
    Throw(Value),
    /// A host-imposed limit was hit; scripts cannot observe or catch it.
    Fatal(FatalError),
}

impl From<FatalError> for Exception {
    fn from(err: FatalError) -> Self {
        Exception::Fatal(err)
    }
}

#[derive(Debug, Clone, Error)]
pub enum FatalError {
    #[error("maximum call stack size exceeded ({depth} frames)")]
    StackOverflow { depth: usize },
}

pub type EvalResult<T> = std::result::Result<T, Exception>;

/// Classified error constructors exposed to built-ins and hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::UriError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UriError => "URIError",
        }
    }
}
