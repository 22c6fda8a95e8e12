//! Built-in constructors, prototype methods and global functions.

mod array;
mod error;
mod function;
mod global;
mod object;
mod primitives;
mod string;

use crate::{
    completion::EvalResult,
    object::{Attributes, ObjectRef},
    runtime::Interpreter,
    value::Value,
};

pub fn install(interp: &mut Interpreter) {
    object::install(interp);
    function::install(interp);
    error::install(interp);
    primitives::install(interp);
    string::install(interp);
    array::install(interp);
    global::install(interp);
}

/// The `idx`th argument, `undefined` when absent.
fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or(Value::Undefined)
}

fn require_object(interp: &mut Interpreter, value: &Value, name: &str) -> EvalResult<ObjectRef> {
    match value {
        Value::Object(object) => Ok(object.clone()),
        other => Err(interp.type_error(format!("{name} called on non-object {other}"))),
    }
}

fn define_global(interp: &Interpreter, name: &'static str, value: Value) {
    interp
        .global_object()
        .borrow_mut()
        .insert_data(name, value, Attributes::HIDDEN);
}
