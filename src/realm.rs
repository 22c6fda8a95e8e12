use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    completion::{ErrorKind, Exception},
    environment::{Environment, EnvironmentRef},
    object::{Attributes, JsObject, ObjectKind, ObjectRef},
    runtime::Interpreter,
    value::{Callable, NativeFn, NativeFunction, Value},
};

/// Built-in prototypes shared by every object an engine creates.
pub struct Intrinsics {
    pub object_prototype: ObjectRef,
    pub function_prototype: ObjectRef,
    pub array_prototype: ObjectRef,
    pub boolean_prototype: ObjectRef,
    pub number_prototype: ObjectRef,
    pub string_prototype: ObjectRef,
    error_prototypes: IndexMap<ErrorKind, ObjectRef>,
}

impl Intrinsics {
    fn new() -> Self {
        let object_prototype = ObjectRef::new(JsObject::new(None, ObjectKind::Ordinary));
        let derive = |kind: ObjectKind| ObjectRef::new(JsObject::new(Some(object_prototype.clone()), kind));

        let function_prototype = derive(ObjectKind::Function(Callable::Native(Rc::new(
            NativeFunction {
                name: "",
                length: 0,
                call: |_, _, _| Ok(Value::Undefined),
                construct: None,
            },
        ))));
        let array_prototype = derive(ObjectKind::Array);
        array_prototype
            .borrow_mut()
            .insert_data("length", Value::Number(0.0), Attributes::new(true, false, false));
        let boolean_prototype = derive(ObjectKind::Boolean(false));
        let number_prototype = derive(ObjectKind::Number(0.0));
        let string_prototype = derive(ObjectKind::String(Rc::from("")));
        string_prototype
            .borrow_mut()
            .insert_data("length", Value::Number(0.0), Attributes::NONE);

        let error_prototype = derive(ObjectKind::Error);
        let mut error_prototypes = IndexMap::new();
        for kind in ErrorKind::ALL {
            let prototype = if kind == ErrorKind::Error {
                error_prototype.clone()
            } else {
                ObjectRef::new(JsObject::new(Some(error_prototype.clone()), ObjectKind::Error))
            };
            {
                let mut record = prototype.borrow_mut();
                record.insert_data("name", Value::from(kind.name()), Attributes::HIDDEN);
                record.insert_data("message", Value::from(""), Attributes::HIDDEN);
            }
            error_prototypes.insert(kind, prototype);
        }

        Self {
            object_prototype,
            function_prototype,
            array_prototype,
            boolean_prototype,
            number_prototype,
            string_prototype,
            error_prototypes,
        }
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> &ObjectRef {
        &self.error_prototypes[&kind]
    }
}

/// One engine's global state: intrinsics, the global object and the two
/// outermost environments.
pub struct Realm {
    pub intrinsics: Intrinsics,
    pub global_object: ObjectRef,
    /// Object environment over the global object.
    pub global_env: EnvironmentRef,
    /// Declarative environment for script-level `let`/`const`, shared by
    /// every script run in this realm.
    pub script_env: EnvironmentRef,
}

impl Realm {
    pub fn new() -> Self {
        let intrinsics = Intrinsics::new();
        let global_object = ObjectRef::new(JsObject::new(
            Some(intrinsics.object_prototype.clone()),
            ObjectKind::Ordinary,
        ));
        let global_env = Environment::new_object(global_object.clone(), false, None);
        let script_env = Environment::new_declarative(Some(global_env.clone()));
        Self {
            intrinsics,
            global_object,
            global_env,
            script_env,
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.realm.intrinsics
    }

    pub fn global_object(&self) -> ObjectRef {
        self.realm.global_object.clone()
    }

    /// A plain object inheriting from `Object.prototype`.
    pub fn create_object(&self) -> ObjectRef {
        self.create_object_with_prototype(Some(self.realm.intrinsics.object_prototype.clone()))
    }

    pub fn create_object_with_prototype(&self, prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(JsObject::new(prototype, ObjectKind::Ordinary))
    }

    pub fn create_array(&self, items: Vec<Value>) -> ObjectRef {
        let mut record = JsObject::new(
            Some(self.realm.intrinsics.array_prototype.clone()),
            ObjectKind::Array,
        );
        record.insert_data(
            "length",
            Value::Number(items.len() as f64),
            Attributes::new(true, false, false),
        );
        for (idx, item) in items.into_iter().enumerate() {
            record.insert_data(idx.to_string(), item, Attributes::ALL);
        }
        ObjectRef::new(record)
    }

    /// Boolean, Number or String wrapper object for a primitive.
    pub fn create_wrapper(&self, kind: ObjectKind) -> ObjectRef {
        let intrinsics = &self.realm.intrinsics;
        let prototype = match &kind {
            ObjectKind::Boolean(_) => &intrinsics.boolean_prototype,
            ObjectKind::Number(_) => &intrinsics.number_prototype,
            ObjectKind::String(_) => &intrinsics.string_prototype,
            _ => &intrinsics.object_prototype,
        };
        let length = match &kind {
            ObjectKind::String(text) => Some(text.encode_utf16().count()),
            _ => None,
        };
        let mut record = JsObject::new(Some(prototype.clone()), kind);
        if let Some(length) = length {
            record.insert_data("length", Value::Number(length as f64), Attributes::NONE);
        }
        ObjectRef::new(record)
    }

    /// Wraps a call target in a function object with `length` and `name`.
    pub(crate) fn create_function_object(&self, callable: Callable, length: u32, name: &str) -> ObjectRef {
        let mut record = JsObject::new(
            Some(self.realm.intrinsics.function_prototype.clone()),
            ObjectKind::Function(callable),
        );
        record.insert_data("length", Value::from(length), Attributes::NONE);
        record.insert_data("name", Value::from(name), Attributes::NONE);
        ObjectRef::new(record)
    }

    pub fn create_native_function(&self, name: &'static str, length: u32, call: NativeFn) -> ObjectRef {
        let native = NativeFunction {
            name,
            length,
            call,
            construct: None,
        };
        self.create_function_object(Callable::Native(Rc::new(native)), length, name)
    }

    /// A native function usable with `new`. `prototype` becomes the
    /// function's `prototype` property and gains a `constructor` link back.
    pub fn create_native_constructor(
        &self,
        name: &'static str,
        length: u32,
        call: NativeFn,
        construct: NativeFn,
        prototype: &ObjectRef,
    ) -> ObjectRef {
        let native = NativeFunction {
            name,
            length,
            call,
            construct: Some(construct),
        };
        let constructor = self.create_function_object(Callable::Native(Rc::new(native)), length, name);
        constructor
            .borrow_mut()
            .insert_data("prototype", Value::Object(prototype.clone()), Attributes::NONE);
        prototype
            .borrow_mut()
            .insert_data("constructor", Value::Object(constructor.clone()), Attributes::HIDDEN);
        constructor
    }

    /// Installs a built-in method as a hidden, writable property.
    pub fn define_method(&self, target: &ObjectRef, name: &'static str, length: u32, call: NativeFn) {
        let function = self.create_native_function(name, length, call);
        target
            .borrow_mut()
            .insert_data(name, Value::Object(function), Attributes::HIDDEN);
    }

    /// A fresh error object of `kind`. An empty message leaves `message`
    /// inherited.
    pub fn create_error(&self, kind: ErrorKind, message: &str) -> ObjectRef {
        let mut record = JsObject::new(
            Some(self.realm.intrinsics.error_prototype(kind).clone()),
            ObjectKind::Error,
        );
        if !message.is_empty() {
            record.insert_data("message", Value::from(message), Attributes::HIDDEN);
        }
        ObjectRef::new(record)
    }

    /// An exception carrying a new error object, ready for `Err(..)`.
    pub fn throw_error(&self, kind: ErrorKind, message: impl Into<String>) -> Exception {
        let message = message.into();
        Exception::Throw(Value::Object(self.create_error(kind, &message)))
    }

    pub fn type_error(&self, message: impl Into<String>) -> Exception {
        self.throw_error(ErrorKind::TypeError, message)
    }

    pub fn range_error(&self, message: impl Into<String>) -> Exception {
        self.throw_error(ErrorKind::RangeError, message)
    }

    pub fn reference_error(&self, message: impl Into<String>) -> Exception {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    pub fn syntax_error(&self, message: impl Into<String>) -> Exception {
        self.throw_error(ErrorKind::SyntaxError, message)
    }

    /// Renders a thrown value for the host, preferring `name: message` for
    /// error-like objects. Never propagates a nested exception.
    pub fn describe_exception(&mut self, value: &Value) -> String {
        let Value::Object(object) = value else {
            return match self.to_string(value) {
                Ok(text) => text.to_string(),
                Err(_) => value.to_string(),
            };
        };
        let field = |interp: &mut Self, key: &str| -> Option<String> {
            let field = interp.get(object, key).ok()?;
            if field.is_undefined() {
                return None;
            }
            interp.to_string(&field).ok().map(|text| text.to_string())
        };
        let name = field(self, "name");
        let message = field(self, "message");
        match (name, message) {
            (Some(name), Some(message)) if !message.is_empty() => format!("{name}: {message}"),
            (Some(name), _) => name,
            (None, Some(message)) => message,
            (None, None) => value.to_string(),
        }
    }
}
