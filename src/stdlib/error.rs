use crate::{
    completion::{ErrorKind, EvalResult},
    object::{Attributes, ObjectKind},
    runtime::Interpreter,
    value::{NativeFn, Value},
};

use super::{arg, define_global, require_object};

pub(super) fn install(interp: &mut Interpreter) {
    let constructors: [(ErrorKind, NativeFn); 7] = [
        (ErrorKind::Error, error_call),
        (ErrorKind::EvalError, eval_error_call),
        (ErrorKind::RangeError, range_error_call),
        (ErrorKind::ReferenceError, reference_error_call),
        (ErrorKind::SyntaxError, syntax_error_call),
        (ErrorKind::TypeError, type_error_call),
        (ErrorKind::UriError, uri_error_call),
    ];
    for (kind, call) in constructors {
        let prototype = interp.intrinsics().error_prototype(kind).clone();
        let constructor = interp.create_native_constructor(kind.name(), 1, call, error_construct, &prototype);
        define_global(interp, kind.name(), Value::Object(constructor));
    }

    let prototype = interp.intrinsics().error_prototype(ErrorKind::Error).clone();
    interp.define_method(&prototype, "toString", 0, error_to_string);
}

/// `new XError(message)`: the instance already carries the right prototype.
fn error_construct(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let instance = require_object(interp, this, "Error")?;
    instance.borrow_mut().kind = ObjectKind::Error;
    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_string(&message)?;
        instance
            .borrow_mut()
            .insert_data("message", Value::String(message), Attributes::HIDDEN);
    }
    Ok(Value::Object(instance))
}

fn make_error(interp: &mut Interpreter, kind: ErrorKind, args: &[Value]) -> EvalResult<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => None,
        other => Some(interp.to_string(&other)?),
    };
    let error = interp.create_error(kind, message.as_deref().unwrap_or(""));
    if message.as_deref() == Some("") {
        error
            .borrow_mut()
            .insert_data("message", Value::from(""), Attributes::HIDDEN);
    }
    Ok(Value::Object(error))
}

fn error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::Error, args)
}

fn eval_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::EvalError, args)
}

fn range_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::RangeError, args)
}

fn reference_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::ReferenceError, args)
}

fn syntax_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::SyntaxError, args)
}

fn type_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::TypeError, args)
}

fn uri_error_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error(interp, ErrorKind::UriError, args)
}

fn error_to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, this, "Error.prototype.toString")?;
    let name = match interp.get(&object, "name")? {
        Value::Undefined => "Error".into(),
        other => interp.to_string(&other)?,
    };
    let message = match interp.get(&object, "message")? {
        Value::Undefined => "".into(),
        other => interp.to_string(&other)?,
    };
    let text = if name.is_empty() {
        message.to_string()
    } else if message.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {message}")
    };
    Ok(Value::from(text))
}
