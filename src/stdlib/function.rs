use std::rc::Rc;

use crate::{
    ast::{ExprKind, StmtKind},
    completion::EvalResult,
    parser,
    runtime::Interpreter,
    value::{BoundFunction, Callable, Value},
};

use super::{arg, define_global};

pub(super) fn install(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().function_prototype.clone();
    let constructor = interp.create_native_constructor("Function", 1, function_call, function_call, &prototype);

    interp.define_method(&prototype, "call", 1, function_prototype_call);
    interp.define_method(&prototype, "apply", 2, function_prototype_apply);
    interp.define_method(&prototype, "bind", 1, function_prototype_bind);
    interp.define_method(&prototype, "toString", 0, function_prototype_to_string);

    define_global(interp, "Function", Value::Object(constructor));
}

/// `Function(p1, ..., body)`: compiles a function in the global scope.
fn function_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut params = Vec::new();
    let mut body: Rc<str> = Rc::from("");
    if let Some((last, rest)) = args.split_last() {
        for param in rest {
            params.push(interp.to_string(param)?.to_string());
        }
        body = interp.to_string(last)?;
    }
    let source = format!("(function anonymous({}\n) {{\n{body}\n}})", params.join(","));
    let program = match parser::parse_program(&source, false) {
        Ok(program) => program,
        Err(diagnostic) => return Err(interp.syntax_error(diagnostic.message)),
    };
    let node = match program.body.first().map(|stmt| &stmt.kind) {
        Some(StmtKind::Expr(expr)) => match &expr.kind {
            ExprKind::Function(node) if program.body.len() == 1 => node.clone(),
            _ => return Err(interp.syntax_error("Invalid function body")),
        },
        _ => return Err(interp.syntax_error("Invalid function body")),
    };
    let env = interp.realm.script_env.clone();
    Ok(Value::Object(interp.create_script_function(&node, env)))
}

fn function_prototype_call(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    if !this.is_callable() {
        return Err(interp.type_error("Function.prototype.call called on non-function"));
    }
    let rest = args.get(1..).unwrap_or(&[]);
    interp.call(this, arg(args, 0), rest)
}

fn function_prototype_apply(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    if !this.is_callable() {
        return Err(interp.type_error("Function.prototype.apply called on non-function"));
    }
    let list = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(array_like) => interp.list_from_array_like(&array_like)?,
        other => {
            return Err(interp.type_error(format!(
                "CreateListFromArrayLike called on non-object {other}"
            )))
        }
    };
    interp.call(this, arg(args, 0), &list)
}

fn function_prototype_bind(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let Some(target) = this.as_object().filter(|object| object.is_callable()).cloned() else {
        return Err(interp.type_error("Bind must be called on a function"));
    };
    let bound_args = args.get(1..).unwrap_or(&[]).to_vec();
    let target_length = match interp.get(&target, "length")? {
        Value::Number(length) => length,
        _ => 0.0,
    };
    let length = (target_length - bound_args.len() as f64).max(0.0) as u32;
    let callable = Callable::Bound(Rc::new(BoundFunction {
        target,
        this: arg(args, 0),
        args: bound_args,
    }));
    let name = callable.name();
    Ok(Value::Object(interp.create_function_object(callable, length, &name)))
}

fn function_prototype_to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let Some(callable) = this.as_object().and_then(|object| object.callable()) else {
        return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
    };
    let text = match &callable {
        Callable::Script(function) => function.node.source.to_string(),
        other => format!("function {}() {{ [native code] }}", other.name()),
    };
    Ok(Value::from(text))
}
