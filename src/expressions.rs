use std::rc::Rc;

use crate::{
    ast::{BinaryOp, Expr, ExprKind, Literal, LogicalOp, Name, PropertyValue, UnaryOp, UpdateOp},
    completion::EvalResult,
    conversions::{strict_equals, to_boolean, Hint},
    environment::{resolve_binding, Environment, EnvironmentRef},
    object::{Attributes, DescriptorPatch},
    runtime::Interpreter,
    stack::ensure_sufficient_stack,
    value::Value,
};

/// A resolved assignment target.
#[derive(Clone)]
pub enum Reference {
    /// `env` is `None` when the name resolved nowhere.
    Binding {
        env: Option<EnvironmentRef>,
        name: Name,
        strict: bool,
    },
    Property {
        base: Value,
        key: Rc<str>,
        strict: bool,
    },
}

impl Reference {
    /// The `this` a call through this reference receives.
    fn this_value(&self) -> Value {
        match self {
            Reference::Property { base, .. } => base.clone(),
            Reference::Binding { env: Some(env), .. } => env.borrow().implicit_this(),
            Reference::Binding { env: None, .. } => Value::Undefined,
        }
    }
}

impl Interpreter {
    pub(crate) fn resolve_identifier(&self, name: &Name) -> Reference {
        Reference::Binding {
            env: resolve_binding(&self.lexical_environment(), name),
            name: name.clone(),
            strict: self.is_strict(),
        }
    }

    pub(crate) fn get_value(&mut self, reference: &Reference) -> EvalResult<Value> {
        match reference {
            Reference::Binding { env: None, name, .. } => {
                Err(self.reference_error(format!("{name} is not defined")))
            }
            Reference::Binding {
                env: Some(env),
                name,
                strict,
            } => self.get_binding_value(env, name, *strict),
            Reference::Property { base, key, .. } => self.get_value_property(base, key),
        }
    }

    pub(crate) fn put_value(&mut self, reference: &Reference, value: Value) -> EvalResult<()> {
        match reference {
            Reference::Binding {
                env: None,
                name,
                strict,
            } => {
                if *strict {
                    return Err(self.reference_error(format!("{name} is not defined")));
                }
                let global = self.global_object();
                self.put(&global, name, value, false)
            }
            Reference::Binding {
                env: Some(env),
                name,
                strict,
            } => self.set_mutable_binding(env, name, value, *strict),
            Reference::Property { base, key, strict } => {
                self.put_value_property(base, key, value, *strict)
            }
        }
    }

    pub(crate) fn evaluate_reference(&mut self, expr: &Expr) -> EvalResult<Reference> {
        match &expr.kind {
            ExprKind::Identifier(name) => Ok(self.resolve_identifier(name)),
            ExprKind::Member { object, property } => {
                let base = self.evaluate(object)?;
                Ok(Reference::Property {
                    base,
                    key: property.clone(),
                    strict: self.is_strict(),
                })
            }
            ExprKind::Index { object, index } => {
                let base = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let key = self.property_key(&base, &index)?;
                Ok(Reference::Property {
                    base,
                    key,
                    strict: self.is_strict(),
                })
            }
            _ => {
                self.evaluate(expr)?;
                Err(self.reference_error("Invalid left-hand side in assignment"))
            }
        }
    }

    /// Converts a computed member key. A nullish base skips the conversion
    /// so that the base check reports first.
    fn property_key(&mut self, base: &Value, index: &Value) -> EvalResult<Rc<str>> {
        if base.is_nullish() {
            return Ok(Rc::from(index.to_string()));
        }
        self.to_string(index)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Bool(flag) => Value::Boolean(*flag),
                Literal::Number(number) => Value::Number(*number),
                Literal::String(text) => Value::String(text.clone()),
            }),
            ExprKind::Identifier(name) => {
                let reference = self.resolve_identifier(name);
                self.get_value(&reference)
            }
            ExprKind::This => Ok(self.context().this_value.clone()),
            ExprKind::Array(elements) => self.evaluate_array(elements),
            ExprKind::Object(properties) => {
                let object = self.create_object();
                for property in properties {
                    let patch = match &property.value {
                        PropertyValue::Init(value) => {
                            let value = self.evaluate(value)?;
                            DescriptorPatch::data(value, Attributes::ALL)
                        }
                        PropertyValue::Getter(node) => {
                            let getter = self.create_script_function(node, self.lexical_environment());
                            DescriptorPatch {
                                get: Some(Some(getter)),
                                enumerable: Some(true),
                                configurable: Some(true),
                                ..DescriptorPatch::default()
                            }
                        }
                        PropertyValue::Setter(node) => {
                            let setter = self.create_script_function(node, self.lexical_environment());
                            DescriptorPatch {
                                set: Some(Some(setter)),
                                enumerable: Some(true),
                                configurable: Some(true),
                                ..DescriptorPatch::default()
                            }
                        }
                    };
                    self.define_own_property(&object, &property.key, patch, false)?;
                }
                Ok(Value::Object(object))
            }
            ExprKind::Function(node) => {
                let env = self.lexical_environment();
                let name = match (&node.name, node.is_arrow()) {
                    (Some(name), false) => name.clone(),
                    _ => return Ok(Value::Object(self.create_script_function(node, env))),
                };
                // Named function expressions see their own name, read-only.
                let func_env = Environment::new_declarative(Some(env));
                let function = self.create_script_function(node, func_env.clone());
                let mut record = func_env.borrow_mut();
                record.create_immutable_binding(name.clone(), false);
                record.initialize_binding(&name, Value::Object(function.clone()));
                Ok(Value::Object(function))
            }
            ExprKind::Unary { op, expr } => self.evaluate_unary(*op, expr),
            ExprKind::Update { op, prefix, target } => {
                let reference = self.evaluate_reference(target)?;
                let old = self.get_value(&reference)?;
                let old = self.to_number(&old)?;
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_value(&reference, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_binary(*op, &left, &right)
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.evaluate(left)?;
                match (op, to_boolean(&left)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.evaluate(test)?;
                if to_boolean(&test) {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
            ExprKind::Assign { op, target, value } => {
                let reference = self.evaluate_reference(target)?;
                let result = match op {
                    None => self.evaluate(value)?,
                    Some(op) => {
                        let current = self.get_value(&reference)?;
                        let rhs = self.evaluate(value)?;
                        self.apply_binary(*op, &current, &rhs)?
                    }
                };
                self.put_value(&reference, result.clone())?;
                Ok(result)
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.evaluate(expr)?;
                }
                Ok(last)
            }
            ExprKind::Member { object, property } => {
                let base = self.evaluate(object)?;
                self.get_value_property(&base, property)
            }
            ExprKind::Index { object, index } => {
                let base = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let key = self.property_key(&base, &index)?;
                self.get_value_property(&base, &key)
            }
            ExprKind::Call { callee, args } => {
                let (function, this) = match &callee.kind {
                    ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                        let reference = self.evaluate_reference(callee)?;
                        let function = self.get_value(&reference)?;
                        (function, reference.this_value())
                    }
                    _ => (self.evaluate(callee)?, Value::Undefined),
                };
                let args = self.evaluate_arguments(args)?;
                if !function.is_callable() {
                    return Err(self.type_error(format!("{} is not a function", describe_callee(callee))));
                }
                self.call(&function, this, &args)
            }
            ExprKind::New { callee, args } => {
                let constructor = self.evaluate(callee)?;
                let args = self.evaluate_arguments(args)?;
                let is_constructor = constructor
                    .as_object()
                    .and_then(|object| object.callable())
                    .map(|callable| callable.is_constructor())
                    .unwrap_or(false);
                if !is_constructor {
                    return Err(self.type_error(format!("{} is not a constructor", describe_callee(callee))));
                }
                self.construct(&constructor, &args)
            }
        }
    }

    fn evaluate_array(&mut self, elements: &[Option<Expr>]) -> EvalResult<Value> {
        let array = self.create_array(Vec::new());
        for (idx, element) in elements.iter().enumerate() {
            let Some(element) = element else {
                continue;
            };
            let value = self.evaluate(element)?;
            array
                .borrow_mut()
                .define_own_property(&idx.to_string(), &DescriptorPatch::data(value, Attributes::ALL));
        }
        array
            .borrow_mut()
            .define_own_property("length", &DescriptorPatch::value(Value::Number(elements.len() as f64)));
        Ok(Value::Object(array))
    }

    fn evaluate_arguments(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    fn evaluate_unary(&mut self, op: UnaryOp, expr: &Expr) -> EvalResult<Value> {
        match op {
            UnaryOp::Delete => self.evaluate_delete(expr),
            UnaryOp::TypeOf => {
                if let ExprKind::Identifier(name) = &expr.kind {
                    let reference = self.resolve_identifier(name);
                    if let Reference::Binding { env: None, .. } = reference {
                        return Ok(Value::from("undefined"));
                    }
                    let value = self.get_value(&reference)?;
                    return Ok(Value::from(value.type_of()));
                }
                let value = self.evaluate(expr)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOp::Void => {
                self.evaluate(expr)?;
                Ok(Value::Undefined)
            }
            UnaryOp::Negate => {
                let value = self.evaluate(expr)?;
                Ok(Value::Number(-self.to_number(&value)?))
            }
            UnaryOp::Plus => {
                let value = self.evaluate(expr)?;
                Ok(Value::Number(self.to_number(&value)?))
            }
            UnaryOp::Not => {
                let value = self.evaluate(expr)?;
                Ok(Value::Boolean(!to_boolean(&value)))
            }
            UnaryOp::BitNot => {
                let value = self.evaluate(expr)?;
                Ok(Value::Number(!self.to_int32(&value)? as f64))
            }
        }
    }

    fn evaluate_delete(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                match self.evaluate_reference(expr)? {
                    Reference::Binding { env: None, .. } => Ok(Value::Boolean(true)),
                    Reference::Binding {
                        env: Some(env), name, ..
                    } => Ok(Value::Boolean(self.delete_binding(&env, &name)?)),
                    Reference::Property { base, key, strict } => {
                        let object = self.to_object(&base)?;
                        Ok(Value::Boolean(self.delete(&object, &key, strict)?))
                    }
                }
            }
            _ => {
                self.evaluate(expr)?;
                Ok(Value::Boolean(true))
            }
        }
    }

    /// Applies a binary operator to already evaluated operands.
    pub fn apply_binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
        let result = match op {
            BinaryOp::Add => {
                let left = self.to_primitive(left, Hint::Default)?;
                let right = self.to_primitive(right, Hint::Default)?;
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                    let mut text = self.to_string(&left)?.to_string();
                    text.push_str(&self.to_string(&right)?);
                    Value::from(text)
                } else {
                    Value::Number(self.to_number(&left)? + self.to_number(&right)?)
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let left = self.to_number(left)?;
                let right = self.to_number(right)?;
                Value::Number(match op {
                    BinaryOp::Sub => left - right,
                    BinaryOp::Mul => left * right,
                    BinaryOp::Div => left / right,
                    _ => left % right,
                })
            }
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
                let left = self.to_int32(left)?;
                let shift = self.to_uint32(right)? & 0x1f;
                Value::Number(match op {
                    BinaryOp::ShiftLeft => left.wrapping_shl(shift),
                    _ => left >> shift,
                } as f64)
            }
            BinaryOp::UnsignedShiftRight => {
                let left = self.to_uint32(left)?;
                let shift = self.to_uint32(right)? & 0x1f;
                Value::Number((left >> shift) as f64)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                let left = self.to_int32(left)?;
                let right = self.to_int32(right)?;
                Value::Number(match op {
                    BinaryOp::BitAnd => left & right,
                    BinaryOp::BitOr => left | right,
                    _ => left ^ right,
                } as f64)
            }
            BinaryOp::Equal => Value::Boolean(self.abstract_equals(left, right)?),
            BinaryOp::NotEqual => Value::Boolean(!self.abstract_equals(left, right)?),
            BinaryOp::StrictEqual => Value::Boolean(strict_equals(left, right)),
            BinaryOp::StrictNotEqual => Value::Boolean(!strict_equals(left, right)),
            BinaryOp::Less => Value::Boolean(self.less_than(left, right, true)? == Some(true)),
            BinaryOp::Greater => Value::Boolean(self.less_than(right, left, false)? == Some(true)),
            BinaryOp::LessEqual => Value::Boolean(self.less_than(right, left, false)? == Some(false)),
            BinaryOp::GreaterEqual => Value::Boolean(self.less_than(left, right, true)? == Some(false)),
            BinaryOp::In => {
                let Value::Object(object) = right else {
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{left}' in {right}"
                    )));
                };
                let key = self.to_string(left)?;
                Value::Boolean(object.has_property(&key))
            }
            BinaryOp::InstanceOf => Value::Boolean(self.instance_of(left, right)?),
        };
        Ok(result)
    }
}

/// Source-like rendering of a callee for "is not a function" messages.
fn describe_callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.to_string(),
        ExprKind::This => "this".to_string(),
        ExprKind::Member { object, property } => format!("{}.{property}", describe_callee(object)),
        ExprKind::Index { object, .. } => format!("{}[...]", describe_callee(object)),
        ExprKind::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        ExprKind::Literal(Literal::String(text)) => format!("\"{text}\""),
        ExprKind::Literal(Literal::Number(number)) => Value::Number(*number).to_string(),
        ExprKind::Literal(Literal::Bool(flag)) => flag.to_string(),
        ExprKind::Literal(Literal::Null) => "null".to_string(),
        _ => "expression".to_string(),
    }
}
