use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{completion::EvalResult, object::ObjectRef, runtime::Interpreter, value::Value};

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One link in a scope chain.
pub struct Environment {
    outer: Option<EnvironmentRef>,
    record: EnvironmentRecord,
}

pub enum EnvironmentRecord {
    Declarative(IndexMap<Rc<str>, Binding>),
    /// Bindings are the properties of an object (the global object, `with`).
    Object {
        binding_object: ObjectRef,
        provide_this: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
    pub initialized: bool,
    pub deletable: bool,
    /// Immutable bindings created strict reject writes even in sloppy code.
    pub strict: bool,
}

impl Environment {
    pub fn new_declarative(outer: Option<EnvironmentRef>) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            outer,
            record: EnvironmentRecord::Declarative(IndexMap::new()),
        }))
    }

    pub fn new_object(
        binding_object: ObjectRef,
        provide_this: bool,
        outer: Option<EnvironmentRef>,
    ) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            outer,
            record: EnvironmentRecord::Object {
                binding_object,
                provide_this,
            },
        }))
    }

    pub fn outer(&self) -> Option<EnvironmentRef> {
        self.outer.clone()
    }

    /// `HasBinding`. Object records consult the prototype chain but never
    /// run accessors.
    pub fn has_binding(&self, name: &str) -> bool {
        match &self.record {
            EnvironmentRecord::Declarative(bindings) => bindings.contains_key(name),
            EnvironmentRecord::Object { binding_object, .. } => binding_object.has_property(name),
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        match &self.record {
            EnvironmentRecord::Declarative(bindings) => bindings.get(name),
            EnvironmentRecord::Object { .. } => None,
        }
    }

    fn declarative_mut(&mut self) -> Option<&mut IndexMap<Rc<str>, Binding>> {
        match &mut self.record {
            EnvironmentRecord::Declarative(bindings) => Some(bindings),
            EnvironmentRecord::Object { .. } => None,
        }
    }

    /// Creates an uninitialized mutable binding. Existing bindings are kept.
    pub fn create_mutable_binding(&mut self, name: impl Into<Rc<str>>, deletable: bool) {
        if let Some(bindings) = self.declarative_mut() {
            bindings.entry(name.into()).or_insert(Binding {
                value: Value::Undefined,
                mutable: true,
                initialized: false,
                deletable,
                strict: false,
            });
        }
    }

    pub fn create_immutable_binding(&mut self, name: impl Into<Rc<str>>, strict: bool) {
        if let Some(bindings) = self.declarative_mut() {
            bindings.insert(
                name.into(),
                Binding {
                    value: Value::Undefined,
                    mutable: false,
                    initialized: false,
                    deletable: false,
                    strict,
                },
            );
        }
    }

    /// Returns `false` if the binding is missing or already initialized.
    pub fn initialize_binding(&mut self, name: &str, value: Value) -> bool {
        let Some(binding) = self.declarative_mut().and_then(|b| b.get_mut(name)) else {
            return false;
        };
        if binding.initialized {
            return false;
        }
        binding.value = value;
        binding.initialized = true;
        true
    }

    /// Declares and initializes a mutable binding in one step, overwriting
    /// any previous value.
    pub fn declare(&mut self, name: impl Into<Rc<str>>, value: Value) {
        if let Some(bindings) = self.declarative_mut() {
            bindings.insert(
                name.into(),
                Binding {
                    value,
                    mutable: true,
                    initialized: true,
                    deletable: false,
                    strict: false,
                },
            );
        }
    }

    pub fn implicit_this(&self) -> Value {
        match &self.record {
            EnvironmentRecord::Object {
                binding_object,
                provide_this: true,
            } => Value::Object(binding_object.clone()),
            _ => Value::Undefined,
        }
    }
}

/// Walks `outer` links from `env` to the record that binds `name`.
pub fn resolve_binding(env: &EnvironmentRef, name: &str) -> Option<EnvironmentRef> {
    let mut cursor = Some(env.clone());
    while let Some(current) = cursor {
        let next = {
            let record = current.borrow();
            if record.has_binding(name) {
                return Some(current.clone());
            }
            record.outer()
        };
        cursor = next;
    }
    None
}

impl Interpreter {
    /// `GetBindingValue` on the record `env`, which must hold `name` (or have
    /// lost it since resolution).
    pub fn get_binding_value(&mut self, env: &EnvironmentRef, name: &str, strict: bool) -> EvalResult<Value> {
        let object = {
            let record = env.borrow();
            match &record.record {
                EnvironmentRecord::Declarative(bindings) => {
                    return match bindings.get(name) {
                        Some(binding) if binding.initialized => Ok(binding.value.clone()),
                        Some(_) => Err(self.reference_error(format!(
                            "Cannot access '{name}' before initialization"
                        ))),
                        None => Err(self.reference_error(format!("{name} is not defined"))),
                    };
                }
                EnvironmentRecord::Object { binding_object, .. } => binding_object.clone(),
            }
        };
        if !object.has_property(name) {
            if strict {
                return Err(self.reference_error(format!("{name} is not defined")));
            }
            return Ok(Value::Undefined);
        }
        self.get(&object, name)
    }

    pub fn set_mutable_binding(
        &mut self,
        env: &EnvironmentRef,
        name: &str,
        value: Value,
        strict: bool,
    ) -> EvalResult<()> {
        let object = {
            let mut record = env.borrow_mut();
            match &mut record.record {
                EnvironmentRecord::Declarative(bindings) => {
                    let Some(binding) = bindings.get_mut(name) else {
                        drop(record);
                        return Err(self.reference_error(format!("{name} is not defined")));
                    };
                    if !binding.initialized {
                        drop(record);
                        return Err(self.reference_error(format!(
                            "Cannot access '{name}' before initialization"
                        )));
                    }
                    if binding.mutable {
                        binding.value = value;
                        return Ok(());
                    }
                    let reject = strict || binding.strict;
                    drop(record);
                    if reject {
                        return Err(self.type_error("Assignment to constant variable."));
                    }
                    return Ok(());
                }
                EnvironmentRecord::Object { binding_object, .. } => binding_object.clone(),
            }
        };
        self.put(&object, name, value, strict)
    }

    pub fn delete_binding(&mut self, env: &EnvironmentRef, name: &str) -> EvalResult<bool> {
        let object = {
            let mut record = env.borrow_mut();
            match &mut record.record {
                EnvironmentRecord::Declarative(bindings) => {
                    return Ok(match bindings.get(name) {
                        None => true,
                        Some(binding) if binding.deletable => {
                            bindings.shift_remove(name);
                            true
                        }
                        Some(_) => false,
                    });
                }
                EnvironmentRecord::Object { binding_object, .. } => binding_object.clone(),
            }
        };
        self.delete(&object, name, false)
    }
}
