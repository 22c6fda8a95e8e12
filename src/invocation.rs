//! The call protocol: `[[Call]]`, `[[Construct]]`, function object
//! creation and declaration binding for function bodies.

use std::rc::Rc;

use crate::{
    ast::FunctionNode,
    completion::{Completion, EvalResult, Exception, FatalError},
    environment::{Environment, EnvironmentRef},
    object::{Attributes, JsObject, ObjectKind, ObjectRef},
    runtime::{ExecutionContext, Interpreter},
    value::{Callable, ScriptFunction, Value},
};

impl Interpreter {
    /// `[[Call]]` on any value; non-callables raise a TypeError.
    pub fn call(&mut self, function: &Value, this: Value, args: &[Value]) -> EvalResult<Value> {
        let Some((object, callable)) = function
            .as_object()
            .and_then(|object| object.callable().map(|callable| (object.clone(), callable)))
        else {
            return Err(self.type_error(format!("{function} is not a function")));
        };
        match callable {
            Callable::Native(native) => {
                self.enter_call()?;
                let result = (native.call)(self, &this, args);
                self.call_depth -= 1;
                result
            }
            Callable::Script(script) => self.call_script(&object, &script, this, args),
            Callable::Bound(bound) => {
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.call(&Value::Object(bound.target.clone()), bound.this.clone(), &full)
            }
        }
    }

    fn enter_call(&mut self) -> EvalResult<()> {
        if self.call_depth >= self.options.max_call_depth {
            return Err(Exception::Fatal(FatalError::StackOverflow {
                depth: self.call_depth,
            }));
        }
        self.call_depth += 1;
        Ok(())
    }

    fn call_script(
        &mut self,
        callee: &ObjectRef,
        function: &Rc<ScriptFunction>,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        self.enter_call()?;
        tracing::debug!(
            function = function.node.name.as_deref().unwrap_or("<anonymous>"),
            depth = self.call_depth,
            "call"
        );
        let result = self.invoke_script(callee, function, this, args);
        self.call_depth -= 1;
        result
    }

    fn invoke_script(
        &mut self,
        callee: &ObjectRef,
        function: &Rc<ScriptFunction>,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        let this_value = if function.node.is_arrow() {
            function.lexical_this.clone().unwrap_or(Value::Undefined)
        } else if function.strict {
            this
        } else if this.is_nullish() {
            Value::Object(self.global_object())
        } else if this.is_object() {
            this
        } else {
            Value::Object(self.to_object(&this)?)
        };

        let env = Environment::new_declarative(Some(function.environment.clone()));
        self.instantiate_function_declarations(callee, function, &env, args);

        self.push_context(ExecutionContext {
            lexical_environment: env.clone(),
            variable_environment: env,
            this_value,
            strict: function.strict,
        });
        let result = self.execute_statements(&function.node.body);
        self.pop_context();

        match result? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    /// Binds parameters, hoisted functions, `arguments`, hoisted `var`s and
    /// uninitialized `let`/`const` names in a fresh function environment.
    fn instantiate_function_declarations(
        &mut self,
        callee: &ObjectRef,
        function: &ScriptFunction,
        env: &EnvironmentRef,
        args: &[Value],
    ) {
        let node = &function.node;
        {
            let mut record = env.borrow_mut();
            for (idx, param) in node.params.iter().enumerate() {
                record.declare(param.clone(), args.get(idx).cloned().unwrap_or(Value::Undefined));
            }
        }

        for declaration in &node.scope.functions {
            let Some(name) = declaration.name.clone() else {
                continue;
            };
            let object = self.create_script_function(declaration, env.clone());
            env.borrow_mut().declare(name, Value::Object(object));
        }

        let shadowed = node.params.iter().any(|param| &**param == "arguments")
            || node
                .scope
                .functions
                .iter()
                .any(|declaration| declaration.name.as_deref() == Some("arguments"));
        if node.uses_arguments && !node.is_arrow() && !shadowed {
            let arguments = self.create_arguments_object(callee, args, function.strict);
            let mut record = env.borrow_mut();
            if function.strict {
                record.create_immutable_binding("arguments", false);
                record.initialize_binding("arguments", Value::Object(arguments));
            } else {
                record.declare("arguments", Value::Object(arguments));
            }
        }

        {
            let mut record = env.borrow_mut();
            for name in &node.scope.var_names {
                if !record.has_binding(name) {
                    record.declare(name.clone(), Value::Undefined);
                }
            }
        }
        Self::create_lexical_bindings(env, &node.scope.lexical);
    }

    /// An unmapped `arguments` object.
    fn create_arguments_object(&self, callee: &ObjectRef, args: &[Value], strict: bool) -> ObjectRef {
        let mut record = JsObject::new(
            Some(self.realm.intrinsics.object_prototype.clone()),
            ObjectKind::Arguments,
        );
        for (idx, arg) in args.iter().enumerate() {
            record.insert_data(idx.to_string(), arg.clone(), Attributes::ALL);
        }
        record.insert_data("length", Value::from(args.len() as f64), Attributes::HIDDEN);
        if !strict {
            record.insert_data("callee", Value::Object(callee.clone()), Attributes::HIDDEN);
        }
        ObjectRef::new(record)
    }

    /// Creates a function object closing over `env`. Arrow functions capture
    /// the current `this`; other functions get a fresh `prototype` object.
    pub(crate) fn create_script_function(&self, node: &Rc<FunctionNode>, env: EnvironmentRef) -> ObjectRef {
        let lexical_this = node.is_arrow().then(|| self.context().this_value.clone());
        let script = ScriptFunction {
            node: node.clone(),
            environment: env,
            strict: node.strict,
            lexical_this,
        };
        let name = node.name.as_deref().unwrap_or("");
        let function = self.create_function_object(
            Callable::Script(Rc::new(script)),
            node.params.len() as u32,
            name,
        );
        if !node.is_arrow() {
            let prototype = self.create_object();
            prototype
                .borrow_mut()
                .insert_data("constructor", Value::Object(function.clone()), Attributes::HIDDEN);
            function.borrow_mut().insert_data(
                "prototype",
                Value::Object(prototype),
                Attributes::new(true, false, false),
            );
        }
        function
    }

    /// `[[Construct]]`: allocates an instance from the callee's `prototype`
    /// and runs the callee with it as `this`. An object result replaces the
    /// instance.
    pub fn construct(&mut self, constructor: &Value, args: &[Value]) -> EvalResult<Value> {
        let Some((object, callable)) = constructor
            .as_object()
            .and_then(|object| object.callable().map(|callable| (object.clone(), callable)))
            .filter(|(_, callable)| callable.is_constructor())
        else {
            return Err(self.type_error(format!("{constructor} is not a constructor")));
        };
        if let Callable::Bound(bound) = &callable {
            let mut full = bound.args.clone();
            full.extend_from_slice(args);
            return self.construct(&Value::Object(bound.target.clone()), &full);
        }

        tracing::debug!(constructor = %callable.name(), "construct");
        let prototype = match self.get(&object, "prototype")? {
            Value::Object(prototype) => prototype,
            _ => self.realm.intrinsics.object_prototype.clone(),
        };
        let instance = self.create_object_with_prototype(Some(prototype));
        let this = Value::Object(instance.clone());

        let result = match &callable {
            Callable::Native(native) => match native.construct {
                Some(construct) => {
                    self.enter_call()?;
                    let result = construct(self, &this, args);
                    self.call_depth -= 1;
                    result?
                }
                None => return Err(self.type_error(format!("{} is not a constructor", native.name))),
            },
            Callable::Script(script) => self.call_script(&object, script, this, args)?,
            Callable::Bound(_) => Value::Undefined,
        };
        if result.is_object() {
            Ok(result)
        } else {
            Ok(Value::Object(instance))
        }
    }

    /// `InstanceofOperator` for a callable `target`.
    pub fn instance_of(&mut self, value: &Value, target: &Value) -> EvalResult<bool> {
        let Some((target_object, callable)) = target
            .as_object()
            .and_then(|object| object.callable().map(|callable| (object.clone(), callable)))
        else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        if let Callable::Bound(bound) = callable {
            return self.instance_of(value, &Value::Object(bound.target.clone()));
        }
        let Value::Object(object) = value else {
            return Ok(false);
        };
        let prototype = match self.get(&target_object, "prototype")? {
            Value::Object(prototype) => prototype,
            other => {
                return Err(self.type_error(format!(
                    "Function has non-object prototype '{other}' in instanceof check"
                )))
            }
        };
        let mut cursor = object.prototype();
        while let Some(current) = cursor {
            if current.ptr_eq(&prototype) {
                return Ok(true);
            }
            cursor = current.prototype();
        }
        Ok(false)
    }
}
