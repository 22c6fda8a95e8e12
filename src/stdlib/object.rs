use crate::{
    completion::EvalResult,
    object::{DescriptorPatch, ObjectRef, PropertyKind},
    runtime::Interpreter,
    value::Value,
};

use super::{arg, define_global, require_object};

pub(super) fn install(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().object_prototype.clone();
    let constructor = interp.create_native_constructor("Object", 1, object_call, object_call, &prototype);

    interp.define_method(&constructor, "getPrototypeOf", 1, object_get_prototype_of);
    interp.define_method(&constructor, "getOwnPropertyDescriptor", 2, object_get_own_property_descriptor);
    interp.define_method(&constructor, "getOwnPropertyNames", 1, object_get_own_property_names);
    interp.define_method(&constructor, "keys", 1, object_keys);
    interp.define_method(&constructor, "create", 2, object_create);
    interp.define_method(&constructor, "defineProperty", 3, object_define_property);
    interp.define_method(&constructor, "defineProperties", 2, object_define_properties);
    interp.define_method(&constructor, "preventExtensions", 1, object_prevent_extensions);
    interp.define_method(&constructor, "isExtensible", 1, object_is_extensible);
    interp.define_method(&constructor, "seal", 1, object_seal);
    interp.define_method(&constructor, "isSealed", 1, object_is_sealed);
    interp.define_method(&constructor, "freeze", 1, object_freeze);
    interp.define_method(&constructor, "isFrozen", 1, object_is_frozen);

    interp.define_method(&prototype, "toString", 0, object_to_string);
    interp.define_method(&prototype, "toLocaleString", 0, object_to_locale_string);
    interp.define_method(&prototype, "valueOf", 0, object_value_of);
    interp.define_method(&prototype, "hasOwnProperty", 1, object_has_own_property);
    interp.define_method(&prototype, "isPrototypeOf", 1, object_is_prototype_of);
    interp.define_method(&prototype, "propertyIsEnumerable", 1, object_property_is_enumerable);

    define_global(interp, "Object", Value::Object(constructor));
}

fn object_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Object(interp.create_object()));
    }
    Ok(Value::Object(interp.to_object(&value)?))
}

fn object_get_prototype_of(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getPrototypeOf")?;
    Ok(object.prototype().map(Value::Object).unwrap_or(Value::Null))
}

fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getOwnPropertyDescriptor")?;
    let key = interp.to_string(&arg(args, 1))?;
    match object.get_own_property(&key) {
        Some(desc) => Ok(interp.from_property_descriptor(&desc)),
        None => Ok(Value::Undefined),
    }
}

fn object_get_own_property_names(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getOwnPropertyNames")?;
    let names = object.own_keys().into_iter().map(Value::String).collect();
    Ok(Value::Object(interp.create_array(names)))
}

fn object_keys(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.keys")?;
    let names = object
        .own_keys()
        .into_iter()
        .filter(|key| {
            object
                .get_own_property(key)
                .map(|desc| desc.enumerable)
                .unwrap_or(false)
        })
        .map(Value::String)
        .collect();
    Ok(Value::Object(interp.create_array(names)))
}

fn object_create(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let prototype = match arg(args, 0) {
        Value::Object(prototype) => Some(prototype),
        Value::Null => None,
        other => {
            return Err(interp.type_error(format!("Object prototype may only be an Object or null: {other}")))
        }
    };
    let object = interp.create_object_with_prototype(prototype);
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        define_properties(interp, &object, &properties)?;
    }
    Ok(Value::Object(object))
}

fn object_define_property(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.defineProperty")?;
    let key = interp.to_string(&arg(args, 1))?;
    let patch = interp.to_property_descriptor(&arg(args, 2))?;
    interp.define_own_property(&object, &key, patch, true)?;
    Ok(Value::Object(object))
}

fn object_define_properties(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.defineProperties")?;
    define_properties(interp, &object, &arg(args, 1))?;
    Ok(Value::Object(object))
}

/// Reads every descriptor before defining any of them.
fn define_properties(interp: &mut Interpreter, object: &ObjectRef, properties: &Value) -> EvalResult<()> {
    let properties = interp.to_object(properties)?;
    let mut patches: Vec<(std::rc::Rc<str>, DescriptorPatch)> = Vec::new();
    for key in properties.own_keys() {
        let enumerable = properties
            .get_own_property(&key)
            .map(|desc| desc.enumerable)
            .unwrap_or(false);
        if !enumerable {
            continue;
        }
        let descriptor = interp.get(&properties, &key)?;
        patches.push((key, interp.to_property_descriptor(&descriptor)?));
    }
    for (key, patch) in patches {
        interp.define_own_property(object, &key, patch, true)?;
    }
    Ok(())
}

fn object_prevent_extensions(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.preventExtensions")?;
    object.borrow_mut().extensible = false;
    Ok(Value::Object(object))
}

fn object_is_extensible(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.isExtensible")?;
    Ok(Value::Boolean(object.extensible()))
}

fn object_seal(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.seal")?;
    restrict(interp, &object, false)?;
    Ok(Value::Object(object))
}

fn object_freeze(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.freeze")?;
    restrict(interp, &object, true)?;
    Ok(Value::Object(object))
}

/// Makes every own property non-configurable (and data properties read-only
/// when `freeze`), then prevents extensions.
fn restrict(interp: &mut Interpreter, object: &ObjectRef, freeze: bool) -> EvalResult<()> {
    for key in object.own_keys() {
        let Some(desc) = object.get_own_property(&key) else {
            continue;
        };
        let mut patch = DescriptorPatch {
            configurable: Some(false),
            ..DescriptorPatch::default()
        };
        if freeze && desc.is_data() {
            patch.writable = Some(false);
        }
        interp.define_own_property(object, &key, patch, true)?;
    }
    object.borrow_mut().extensible = false;
    Ok(())
}

fn object_is_sealed(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.isSealed")?;
    Ok(Value::Boolean(is_restricted(&object, false)))
}

fn object_is_frozen(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.isFrozen")?;
    Ok(Value::Boolean(is_restricted(&object, true)))
}

fn is_restricted(object: &ObjectRef, frozen: bool) -> bool {
    if object.extensible() {
        return false;
    }
    object.own_keys().iter().all(|key| match object.get_own_property(key) {
        Some(desc) => {
            let writable = matches!(desc.kind, PropertyKind::Data { writable: true, .. });
            !desc.configurable && !(frozen && writable)
        }
        None => true,
    })
}

fn object_to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let class = match this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        other => interp.to_object(other)?.class(),
    };
    Ok(Value::from(format!("[object {class}]")))
}

fn object_to_locale_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let method = interp.get_value_property(this, "toString")?;
    if !method.is_callable() {
        return Err(interp.type_error("toString is not a function"));
    }
    interp.call(&method, this.clone(), &[])
}

fn object_value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Object(interp.to_object(this)?))
}

fn object_has_own_property(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = interp.to_string(&arg(args, 0))?;
    let object = interp.to_object(this)?;
    Ok(Value::Boolean(object.get_own_property(&key).is_some()))
}

fn object_is_prototype_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let Value::Object(value) = arg(args, 0) else {
        return Ok(Value::Boolean(false));
    };
    let object = interp.to_object(this)?;
    let mut cursor = value.prototype();
    while let Some(current) = cursor {
        if current.ptr_eq(&object) {
            return Ok(Value::Boolean(true));
        }
        cursor = current.prototype();
    }
    Ok(Value::Boolean(false))
}

fn object_property_is_enumerable(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = interp.to_string(&arg(args, 0))?;
    let object = interp.to_object(this)?;
    let enumerable = object
        .get_own_property(&key)
        .map(|desc| desc.enumerable)
        .unwrap_or(false);
    Ok(Value::Boolean(enumerable))
}
