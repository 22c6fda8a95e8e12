//! Property operations that may run script code (accessors, `valueOf` during
//! array length validation).

use crate::{
    completion::EvalResult,
    conversions::{to_boolean, to_uint32},
    object::{
        array_index, Attributes, DescriptorPatch, ObjectRef, PropertyDescriptor,
        PropertyKind, PropertyNames,
    },
    runtime::{Interpreter, MAX_ARGUMENT_COUNT},
    value::Value,
};

impl Interpreter {
    /// `[[Get]]`.
    pub fn get(&mut self, object: &ObjectRef, key: &str) -> EvalResult<Value> {
        let receiver = Value::Object(object.clone());
        self.get_with_receiver(object, key, &receiver)
    }

    fn get_with_receiver(&mut self, object: &ObjectRef, key: &str, receiver: &Value) -> EvalResult<Value> {
        match object.find_property(key) {
            None => Ok(Value::Undefined),
            Some(desc) => match desc.kind {
                PropertyKind::Data { value, .. } => Ok(value),
                PropertyKind::Accessor { get: Some(getter), .. } => {
                    self.call(&Value::Object(getter), receiver.clone(), &[])
                }
                PropertyKind::Accessor { get: None, .. } => Ok(Value::Undefined),
            },
        }
    }

    /// Property read on any base value. Primitive bases resolve through their
    /// wrapper prototype and are passed to getters unwrapped.
    pub fn get_value_property(&mut self, base: &Value, key: &str) -> EvalResult<Value> {
        let prototype = match base {
            Value::Object(object) => return self.get(object, key),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot read property '{key}' of {base}"
                )))
            }
            Value::String(text) => {
                if key == "length" {
                    return Ok(Value::Number(text.encode_utf16().count() as f64));
                }
                if let Some(idx) = array_index(key) {
                    if let Some(unit) = text.encode_utf16().nth(idx as usize) {
                        return Ok(Value::string(String::from_utf16_lossy(&[unit])));
                    }
                }
                self.realm.intrinsics.string_prototype.clone()
            }
            Value::Number(_) => self.realm.intrinsics.number_prototype.clone(),
            Value::Boolean(_) => self.realm.intrinsics.boolean_prototype.clone(),
        };
        self.get_with_receiver(&prototype, key, base)
    }

    /// `[[Put]]`: `throw` selects TypeError over silent failure.
    pub fn put(&mut self, object: &ObjectRef, key: &str, value: Value, throw: bool) -> EvalResult<()> {
        let own = object.get_own_property(key);
        let is_own = own.is_some();
        let found = own.or_else(|| object.prototype().and_then(|proto| proto.find_property(key)));

        match found.map(|desc| desc.kind) {
            Some(PropertyKind::Data { writable: false, .. }) => {
                self.reject_write(key, throw)
            }
            Some(PropertyKind::Data { .. }) if is_own => {
                self.define_own_property(object, key, DescriptorPatch::value(value), throw)?;
                Ok(())
            }
            Some(PropertyKind::Accessor { set: Some(setter), .. }) => {
                self.call(&Value::Object(setter), Value::Object(object.clone()), &[value])?;
                Ok(())
            }
            Some(PropertyKind::Accessor { set: None, .. }) => self.reject_write(key, throw),
            Some(PropertyKind::Data { .. }) | None => {
                if !object.extensible() {
                    return self.reject_write(key, throw);
                }
                self.define_own_property(object, key, DescriptorPatch::data(value, Attributes::ALL), throw)?;
                Ok(())
            }
        }
    }

    /// Property write on any base value. Writes to primitives only reach
    /// inherited setters; anything else is rejected (a TypeError in strict
    /// code).
    pub fn put_value_property(&mut self, base: &Value, key: &str, value: Value, strict: bool) -> EvalResult<()> {
        if let Value::Object(object) = base {
            return self.put(object, key, value, strict);
        }
        if base.is_nullish() {
            return Err(self.type_error(format!(
                "Cannot set property '{key}' of {base}"
            )));
        }
        let wrapper = self.to_object(base)?;
        if wrapper.get_own_property(key).is_some() {
            return self.reject_write(key, strict);
        }
        match wrapper.find_property(key).map(|desc| desc.kind) {
            Some(PropertyKind::Accessor { set: Some(setter), .. }) => {
                self.call(&Value::Object(setter), base.clone(), &[value])?;
                Ok(())
            }
            _ => self.reject_write(key, strict),
        }
    }

    fn reject_write(&mut self, key: &str, throw: bool) -> EvalResult<()> {
        if throw {
            return Err(self.type_error(format!(
                "Cannot assign to read only property '{key}'"
            )));
        }
        Ok(())
    }

    /// `[[DefineOwnProperty]]`. Validates array `length` values first, which
    /// may run `valueOf`.
    pub fn define_own_property(
        &mut self,
        object: &ObjectRef,
        key: &str,
        mut patch: DescriptorPatch,
        throw: bool,
    ) -> EvalResult<bool> {
        if key == "length" && object.is_array() {
            if let Some(requested) = patch.value.take() {
                let number = self.to_number(&requested)?;
                let len = to_uint32(number);
                if len as f64 != number {
                    return Err(self.range_error("Invalid array length"));
                }
                patch.value = Some(Value::Number(len as f64));
            }
        }
        let accepted = object.borrow_mut().define_own_property(key, &patch);
        if !accepted && throw {
            return Err(self.type_error(format!("Cannot redefine property: {key}")));
        }
        Ok(accepted)
    }

    /// `[[Delete]]`.
    pub fn delete(&mut self, object: &ObjectRef, key: &str, throw: bool) -> EvalResult<bool> {
        let removed = object.borrow_mut().delete(key);
        if !removed && throw {
            return Err(self.type_error(format!("Cannot delete property '{key}'")));
        }
        Ok(removed)
    }

    pub fn has_property(&self, object: &ObjectRef, key: &str) -> bool {
        object.has_property(key)
    }

    pub fn get_own_property(&self, object: &ObjectRef, key: &str) -> Option<PropertyDescriptor> {
        object.get_own_property(key)
    }

    pub fn enumerate(&self, object: &ObjectRef) -> PropertyNames {
        object.enumerate()
    }

    /// Installs or redefines a data property, returning whether it was
    /// accepted.
    pub fn define_data_property(
        &self,
        object: &ObjectRef,
        key: &str,
        value: Value,
        attributes: Attributes,
    ) -> bool {
        object
            .borrow_mut()
            .define_own_property(key, &DescriptorPatch::data(value, attributes))
    }

    pub fn define_accessor_property(
        &self,
        object: &ObjectRef,
        key: &str,
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        attributes: Attributes,
    ) -> bool {
        let patch = DescriptorPatch {
            get: Some(get),
            set: Some(set),
            enumerable: Some(attributes.enumerable),
            configurable: Some(attributes.configurable),
            ..DescriptorPatch::default()
        };
        object.borrow_mut().define_own_property(key, &patch)
    }

    /// `ToPropertyDescriptor`: reads a descriptor object into a patch.
    pub fn to_property_descriptor(&mut self, value: &Value) -> EvalResult<DescriptorPatch> {
        let Value::Object(object) = value else {
            return Err(self.type_error(format!("Property description must be an object: {value}")));
        };
        let mut patch = DescriptorPatch::default();
        if object.has_property("enumerable") {
            let flag = self.get(object, "enumerable")?;
            patch.enumerable = Some(to_boolean(&flag));
        }
        if object.has_property("configurable") {
            let flag = self.get(object, "configurable")?;
            patch.configurable = Some(to_boolean(&flag));
        }
        if object.has_property("value") {
            patch.value = Some(self.get(object, "value")?);
        }
        if object.has_property("writable") {
            let flag = self.get(object, "writable")?;
            patch.writable = Some(to_boolean(&flag));
        }
        patch.get = self.descriptor_accessor(object, "get")?;
        patch.set = self.descriptor_accessor(object, "set")?;
        if patch.is_accessor_descriptor() && patch.is_data_descriptor() {
            return Err(self.type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(patch)
    }

    fn descriptor_accessor(&mut self, object: &ObjectRef, name: &str) -> EvalResult<Option<Option<ObjectRef>>> {
        if !object.has_property(name) {
            return Ok(None);
        }
        match self.get(object, name)? {
            Value::Undefined => Ok(Some(None)),
            Value::Object(function) if function.is_callable() => Ok(Some(Some(function))),
            other => Err(self.type_error(format!("Accessor '{name}' must be a function: {other}"))),
        }
    }

    /// `FromPropertyDescriptor`: a fresh object describing `desc`.
    pub fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> Value {
        let result = self.create_object();
        {
            let mut record = result.borrow_mut();
            match &desc.kind {
                PropertyKind::Data { value, writable } => {
                    record.insert_data("value", value.clone(), Attributes::ALL);
                    record.insert_data("writable", Value::Boolean(*writable), Attributes::ALL);
                }
                PropertyKind::Accessor { get, set } => {
                    let getter = get.clone().map(Value::Object).unwrap_or(Value::Undefined);
                    let setter = set.clone().map(Value::Object).unwrap_or(Value::Undefined);
                    record.insert_data("get", getter, Attributes::ALL);
                    record.insert_data("set", setter, Attributes::ALL);
                }
            }
            record.insert_data("enumerable", Value::Boolean(desc.enumerable), Attributes::ALL);
            record.insert_data("configurable", Value::Boolean(desc.configurable), Attributes::ALL);
        }
        Value::Object(result)
    }

    /// The index-ordered elements of an array-like object.
    pub fn list_from_array_like(&mut self, object: &ObjectRef) -> EvalResult<Vec<Value>> {
        let length = self.get(object, "length")?;
        let length = self.to_uint32(&length)?;
        if length > MAX_ARGUMENT_COUNT {
            return Err(self.range_error(format!("too many arguments in function call ({length})")));
        }
        let mut items = Vec::with_capacity(length as usize);
        for idx in 0..length {
            items.push(self.get(object, &idx.to_string())?);
        }
        Ok(items)
    }
}

