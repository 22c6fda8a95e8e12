use crate::{
    completion::EvalResult,
    conversions::{strict_equals, to_integer, to_uint32},
    object::{Attributes, DescriptorPatch, ObjectRef},
    runtime::Interpreter,
    value::Value,
};

use super::{arg, define_global};

pub(super) fn install(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().array_prototype.clone();
    let constructor = interp.create_native_constructor("Array", 1, array_call, array_call, &prototype);
    interp.define_method(&constructor, "isArray", 1, array_is_array);

    interp.define_method(&prototype, "push", 1, array_push);
    interp.define_method(&prototype, "pop", 0, array_pop);
    interp.define_method(&prototype, "join", 1, array_join);
    interp.define_method(&prototype, "toString", 0, array_to_string);
    interp.define_method(&prototype, "slice", 2, array_slice);
    interp.define_method(&prototype, "indexOf", 1, array_index_of);
    interp.define_method(&prototype, "forEach", 1, array_for_each);
    interp.define_method(&prototype, "map", 1, array_map);

    define_global(interp, "Array", Value::Object(constructor));
}

/// `Array(len)` or `Array(...items)`, with or without `new`.
fn array_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    if let [Value::Number(requested)] = args {
        let len = to_uint32(*requested);
        if len as f64 != *requested {
            return Err(interp.range_error("Invalid array length"));
        }
        let array = interp.create_array(Vec::new());
        set_length(interp, &array, len as f64)?;
        return Ok(Value::Object(array));
    }
    Ok(Value::Object(interp.create_array(args.to_vec())))
}

fn array_is_array(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let is_array = arg(args, 0).as_object().map(|object| object.is_array()).unwrap_or(false);
    Ok(Value::Boolean(is_array))
}

fn length_of(interp: &mut Interpreter, object: &ObjectRef) -> EvalResult<u32> {
    let length = interp.get(object, "length")?;
    interp.to_uint32(&length)
}

fn set_length(interp: &mut Interpreter, object: &ObjectRef, length: f64) -> EvalResult<()> {
    interp.put(object, "length", Value::Number(length), true)
}

/// Resolves a relative start/end argument against `len`.
fn relative_position(interp: &mut Interpreter, value: &Value, len: f64, default: f64) -> EvalResult<f64> {
    let position = match value {
        Value::Undefined => default,
        other => interp.to_integer(other)?,
    };
    Ok(if position < 0.0 {
        (len + position).max(0.0)
    } else {
        position.min(len)
    })
}

fn array_push(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let mut length = length_of(interp, &object)? as f64;
    for item in args {
        interp.put(&object, &Value::Number(length).to_string(), item.clone(), true)?;
        length += 1.0;
    }
    set_length(interp, &object, length)?;
    Ok(Value::Number(length))
}

fn array_pop(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)?;
    if length == 0 {
        set_length(interp, &object, 0.0)?;
        return Ok(Value::Undefined);
    }
    let key = (length - 1).to_string();
    let element = interp.get(&object, &key)?;
    interp.delete(&object, &key, true)?;
    set_length(interp, &object, (length - 1) as f64)?;
    Ok(element)
}

fn array_join(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".into(),
        other => interp.to_string(&other)?,
    };
    let mut output = String::new();
    for idx in 0..length {
        if idx > 0 {
            output.push_str(&separator);
        }
        let element = interp.get(&object, &idx.to_string())?;
        if !element.is_nullish() {
            output.push_str(&interp.to_string(&element)?);
        }
    }
    Ok(Value::from(output))
}

fn array_to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let join = interp.get(&object, "join")?;
    if join.is_callable() {
        return interp.call(&join, Value::Object(object), &[]);
    }
    Ok(Value::from(format!("[object {}]", object.class())))
}

fn array_slice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)? as f64;
    let start = relative_position(interp, &arg(args, 0), length, 0.0)?;
    let end = relative_position(interp, &arg(args, 1), length, length)?;

    let result = interp.create_array(Vec::new());
    let mut count = 0.0;
    let mut idx = start;
    while idx < end {
        let key = Value::Number(idx).to_string();
        if object.has_property(&key) {
            let element = interp.get(&object, &key)?;
            interp.define_own_property(
                &result,
                &Value::Number(count).to_string(),
                DescriptorPatch::data(element, Attributes::ALL),
                true,
            )?;
        }
        idx += 1.0;
        count += 1.0;
    }
    set_length(interp, &result, count)?;
    Ok(Value::Object(result))
}

fn array_index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)? as f64;
    if length == 0.0 {
        return Ok(Value::Number(-1.0));
    }
    let search = arg(args, 0);
    let from = match arg(args, 1) {
        Value::Undefined => 0.0,
        other => to_integer(interp.to_number(&other)?),
    };
    let mut idx = if from < 0.0 { (length + from).max(0.0) } else { from };
    while idx < length {
        let key = Value::Number(idx).to_string();
        if object.has_property(&key) {
            let element = interp.get(&object, &key)?;
            if strict_equals(&element, &search) {
                return Ok(Value::Number(idx));
            }
        }
        idx += 1.0;
    }
    Ok(Value::Number(-1.0))
}

fn require_callback(interp: &mut Interpreter, callback: &Value) -> EvalResult<()> {
    if !callback.is_callable() {
        return Err(interp.type_error(format!("{callback} is not a function")));
    }
    Ok(())
}

fn array_for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)?;
    let callback = arg(args, 0);
    require_callback(interp, &callback)?;
    let this_arg = arg(args, 1);
    for idx in 0..length {
        let key = idx.to_string();
        if !object.has_property(&key) {
            continue;
        }
        let element = interp.get(&object, &key)?;
        let call_args = [element, Value::from(idx), Value::Object(object.clone())];
        interp.call(&callback, this_arg.clone(), &call_args)?;
    }
    Ok(Value::Undefined)
}

fn array_map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object)?;
    let callback = arg(args, 0);
    require_callback(interp, &callback)?;
    let this_arg = arg(args, 1);

    let result = interp.create_array(Vec::new());
    set_length(interp, &result, length as f64)?;
    for idx in 0..length {
        let key = idx.to_string();
        if !object.has_property(&key) {
            continue;
        }
        let element = interp.get(&object, &key)?;
        let call_args = [element, Value::from(idx), Value::Object(object.clone())];
        let mapped = interp.call(&callback, this_arg.clone(), &call_args)?;
        interp.define_own_property(&result, &key, DescriptorPatch::data(mapped, Attributes::ALL), true)?;
    }
    Ok(Value::Object(result))
}
