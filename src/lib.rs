//! Tessera: an embeddable tree-walking interpreter for an ECMAScript 5 style
//! scripting language, with `let`/`const` and arrow functions.
//!
//! Hosts create an [`Interpreter`], feed it source through
//! [`Interpreter::eval_source`] and receive either a [`Value`] or a
//! [`TesseraError`]. Native functions are plain `fn` pointers registered on
//! objects through the realm helpers.

pub mod ast;
pub mod completion;
pub mod conversions;
pub mod diagnostics;
pub mod environment;
pub mod expressions;
pub mod invocation;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod properties;
pub mod realm;
pub mod repl;
pub mod runtime;
pub mod stack;
pub mod stdlib;
pub mod value;

pub use completion::{Completion, ErrorKind, EvalResult, Exception, FatalError};
pub use conversions::{same_value, strict_equals, to_boolean, Hint};
pub use diagnostics::{Diagnostic, DiagnosticKind, Result, SourceSpan, TesseraError};
pub use environment::{Environment, EnvironmentRef};
pub use object::{Attributes, DescriptorPatch, JsObject, ObjectKind, ObjectRef, PropertyDescriptor, PropertyKind};
pub use realm::{Intrinsics, Realm};
pub use repl::Repl;
pub use runtime::{
    EngineOptions, ExecutionContext, Interpreter, DEFAULT_MAX_CALL_DEPTH, MAX_ARGUMENT_COUNT,
};
pub use value::{Callable, NativeFn, Value};
