use std::{fmt, rc::Rc};

use crate::{
    ast::FunctionNode,
    completion::EvalResult,
    conversions::number_to_string,
    environment::EnvironmentRef,
    object::ObjectRef,
    runtime::Interpreter,
};

/// A language value. Cloning is cheap: strings and objects are shared handles.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Value::String(value.into())
    }

    pub fn number(value: f64) -> Self {
        Value::Number(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Object(object) => object.is_callable(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) if object.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::String(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

/// Renders primitives canonically and objects by class tag, without running
/// any script code.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Object(object) => write!(f, "[object {}]", object.class()),
        }
    }
}

pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>;

/// The call target stored in a function object's internal slots.
#[derive(Clone)]
pub enum Callable {
    Script(Rc<ScriptFunction>),
    Native(Rc<NativeFunction>),
    Bound(Rc<BoundFunction>),
}

impl Callable {
    pub fn is_constructor(&self) -> bool {
        match self {
            Callable::Script(fun) => !fun.node.is_arrow(),
            Callable::Native(fun) => fun.construct.is_some(),
            Callable::Bound(fun) => fun
                .target
                .callable()
                .map(|target| target.is_constructor())
                .unwrap_or(false),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Callable::Script(fun) => fun.node.name.as_deref().unwrap_or("").to_string(),
            Callable::Native(fun) => fun.name.to_string(),
            Callable::Bound(fun) => {
                let inner = fun.target.callable().map(|c| c.name()).unwrap_or_default();
                format!("bound {inner}")
            }
        }
    }
}

pub struct ScriptFunction {
    pub node: Rc<FunctionNode>,
    pub environment: EnvironmentRef,
    pub strict: bool,
    /// Arrow functions capture `this` from their defining context.
    pub lexical_this: Option<Value>,
}

pub struct NativeFunction {
    pub name: &'static str,
    pub length: u32,
    pub call: NativeFn,
    /// Invoked by `new` with the freshly allocated object as `this`.
    pub construct: Option<NativeFn>,
}

pub struct BoundFunction {
    pub target: ObjectRef,
    pub this: Value,
    pub args: Vec<Value>,
}
