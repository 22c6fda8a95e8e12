use tessera::{
    same_value, strict_equals, to_boolean, Attributes, DescriptorPatch, EvalResult, Interpreter,
    PropertyKind, Value,
};

fn double(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let input = args.first().cloned().unwrap_or(Value::Undefined);
    Ok(Value::Number(interp.to_number(&input)? * 2.0))
}

fn reject(interp: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Err(interp.range_error("rejected by host"))
}

fn answer(_interp: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(42.0))
}

fn reenter(interp: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    interp
        .eval_source("1 + 1")
        .map_err(|err| interp.type_error(err.to_string()))
}

fn number(value: Value) -> f64 {
    value
        .as_number()
        .unwrap_or_else(|| panic!("expected Number, found {value:?}"))
}

#[test]
fn host_functions_are_callable_from_scripts() {
    let mut interpreter = Interpreter::new();
    let global = interpreter.global_object();
    let function = interpreter.create_native_function("double", 1, double);
    assert!(interpreter.define_data_property(&global, "double", Value::Object(function), Attributes::HIDDEN));

    let value = interpreter
        .eval_source("double('21') + double.length")
        .expect("script runs");
    assert_eq!(number(value), 43.0);
}

#[test]
fn host_errors_are_catchable_by_scripts() {
    let mut interpreter = Interpreter::new();
    let global = interpreter.global_object();
    interpreter.define_method(&global, "reject", 0, reject);

    let value = interpreter
        .eval_source("try { reject(); } catch (e) { (e instanceof RangeError) + ':' + e.message }")
        .expect("script runs");
    assert_eq!(value.as_str(), Some("true:rejected by host"));
}

#[test]
fn host_accessors_run_on_property_read() {
    let mut interpreter = Interpreter::new();
    let target = interpreter.create_object();
    let getter = interpreter.create_native_function("answer", 0, answer);
    assert!(interpreter.define_accessor_property(
        &target,
        "answer",
        Some(getter),
        None,
        Attributes::new(false, true, true),
    ));

    assert_eq!(number(interpreter.get(&target, "answer").expect("get")), 42.0);
    // No setter: sloppy put is ignored, strict put throws.
    interpreter
        .put(&target, "answer", Value::Number(1.0), false)
        .expect("sloppy put");
    assert!(interpreter.put(&target, "answer", Value::Number(1.0), true).is_err());
}

#[test]
fn put_and_get_follow_prototype_chain() {
    let mut interpreter = Interpreter::new();
    let parent = interpreter.create_object();
    let child = interpreter.create_object_with_prototype(Some(parent.clone()));
    interpreter
        .put(&parent, "shared", Value::from("parent"), true)
        .expect("put on parent");

    assert_eq!(interpreter.get(&child, "shared").expect("get").as_str(), Some("parent"));
    assert!(child.get_own_property("shared").is_none());

    interpreter
        .put(&child, "shared", Value::from("child"), true)
        .expect("put on child");
    assert_eq!(interpreter.get(&child, "shared").expect("get").as_str(), Some("child"));
    assert_eq!(interpreter.get(&parent, "shared").expect("get").as_str(), Some("parent"));

    assert!(interpreter.delete(&child, "shared", true).expect("delete"));
    assert_eq!(interpreter.get(&child, "shared").expect("get").as_str(), Some("parent"));
}

#[test]
fn inherited_read_only_property_blocks_assignment() {
    let mut interpreter = Interpreter::new();
    let parent = interpreter.create_object();
    interpreter.define_data_property(&parent, "fixed", Value::Number(1.0), Attributes::NONE);
    let child = interpreter.create_object_with_prototype(Some(parent));

    interpreter
        .put(&child, "fixed", Value::Number(2.0), false)
        .expect("sloppy put is silent");
    assert!(child.get_own_property("fixed").is_none());
    assert!(interpreter.put(&child, "fixed", Value::Number(2.0), true).is_err());
}

#[test]
fn define_own_property_applies_partial_patches() {
    let mut interpreter = Interpreter::new();
    let object = interpreter.create_object();
    interpreter
        .define_own_property(&object, "k", DescriptorPatch::data(Value::Number(1.0), Attributes::ALL), true)
        .expect("define");

    let patch = DescriptorPatch {
        enumerable: Some(false),
        ..DescriptorPatch::default()
    };
    interpreter
        .define_own_property(&object, "k", patch, true)
        .expect("patch");

    let desc = object.get_own_property("k").expect("property exists");
    assert!(!desc.enumerable);
    assert!(desc.configurable);
    match desc.kind {
        PropertyKind::Data { value, writable } => {
            assert!(writable);
            assert_eq!(number(value), 1.0);
        }
        PropertyKind::Accessor { .. } => panic!("expected data property"),
    }
}

#[test]
fn non_extensible_objects_reject_new_properties() {
    let mut interpreter = Interpreter::new();
    let object = interpreter.create_object();
    let global = interpreter.global_object();
    interpreter.define_data_property(&global, "target", Value::Object(object.clone()), Attributes::ALL);
    interpreter
        .eval_source("Object.preventExtensions(target); target.added = 1;")
        .expect("sloppy add is silent");

    assert!(!object.extensible());
    assert!(!object.has_property("added"));
    let result = interpreter.define_own_property(
        &object,
        "added",
        DescriptorPatch::value(Value::Number(1.0)),
        true,
    );
    assert!(result.is_err());
}

#[test]
fn arrays_track_length_through_host_api() {
    let mut interpreter = Interpreter::new();
    let array = interpreter.create_array(vec![Value::Number(1.0), Value::Number(2.0)]);
    interpreter
        .put(&array, "5", Value::from("tail"), true)
        .expect("index put");
    assert_eq!(number(interpreter.get(&array, "length").expect("length")), 6.0);

    interpreter
        .put(&array, "length", Value::Number(1.0), true)
        .expect("truncate");
    assert!(!array.has_property("5"));
    assert!(!array.has_property("1"));
    assert!(array.has_property("0"));

    assert!(interpreter
        .put(&array, "length", Value::Number(1.5), true)
        .is_err());
}

#[test]
fn enumerate_reports_enumerable_names_in_order() {
    let mut interpreter = Interpreter::new();
    let value = interpreter
        .eval_source("var o = { b: 1, a: 2 }; Object.defineProperty(o, 'hidden', { value: 3 }); o")
        .expect("script runs");
    let object = value.as_object().expect("object result").clone();
    let names: Vec<String> = object.enumerate().map(|name| name.to_string()).collect();
    assert_eq!(names, ["b", "a"]);
}

#[test]
fn call_and_construct_from_host() {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source("function Pair(a, b) { this.a = a; this.b = b; } function add(x, y) { return x + y; }")
        .expect("declarations");
    let global = interpreter.global_object();

    let add = interpreter.get(&global, "add").expect("add");
    let sum = interpreter
        .call(&add, Value::Undefined, &[Value::Number(2.0), Value::Number(3.0)])
        .expect("call");
    assert_eq!(number(sum), 5.0);

    let pair = interpreter.get(&global, "Pair").expect("Pair");
    let instance = interpreter
        .construct(&pair, &[Value::from("x"), Value::from("y")])
        .expect("construct");
    assert!(interpreter.instance_of(&instance, &pair).expect("instanceof"));
    let instance = instance.as_object().expect("object").clone();
    assert_eq!(interpreter.get(&instance, "b").expect("b").as_str(), Some("y"));

    let not_callable = Value::Number(1.0);
    assert!(interpreter.call(&not_callable, Value::Undefined, &[]).is_err());
}

#[test]
fn conversions_follow_language_rules() {
    let mut interpreter = Interpreter::new();
    assert_eq!(interpreter.to_number(&Value::from("  0x10 ")).expect("number"), 16.0);
    assert!(interpreter.to_number(&Value::from("1e")).expect("number").is_nan());
    assert_eq!(interpreter.to_number(&Value::from("")).expect("number"), 0.0);
    assert_eq!(&*interpreter.to_string(&Value::Number(-0.0)).expect("string"), "0");
    assert_eq!(interpreter.to_int32(&Value::Number(4294967297.0)).expect("int32"), 1);
    assert_eq!(interpreter.to_uint32(&Value::Number(-1.0)).expect("uint32"), 4294967295);
    assert_eq!(interpreter.to_integer(&Value::Number(-3.7)).expect("integer"), -3.0);
    assert!(interpreter.to_object(&Value::Null).is_err());

    assert!(!to_boolean(&Value::Number(f64::NAN)));
    assert!(to_boolean(&Value::from("0")));
    assert!(same_value(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    assert!(!same_value(&Value::Number(0.0), &Value::Number(-0.0)));
    assert!(strict_equals(&Value::Number(0.0), &Value::Number(-0.0)));
    assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
}

#[test]
fn enumeration_restarts_against_current_state() {
    let mut interpreter = Interpreter::new();
    let object = interpreter.create_object();
    interpreter.define_data_property(&object, "first", Value::Number(1.0), Attributes::ALL);

    let mut names = object.enumerate();
    assert_eq!(names.next().as_deref(), Some("first"));
    assert!(names.next().is_none());

    interpreter.define_data_property(&object, "second", Value::Number(2.0), Attributes::ALL);
    names.restart();
    let seen: Vec<String> = names.map(|name| name.to_string()).collect();
    assert_eq!(seen, ["first", "second"]);
}

#[test]
fn host_functions_may_reenter_the_interpreter() {
    let mut interpreter = Interpreter::new();
    let global = interpreter.global_object();
    interpreter.define_method(&global, "reenter", 0, reenter);

    let value = interpreter
        .eval_source("function f() { return reenter(); } f() + f()")
        .expect("nested evaluation");
    assert_eq!(number(value), 4.0);

    let value = interpreter
        .eval_source("function depth(n) { return n == 0 ? reenter() : depth(n - 1); } depth(20)")
        .expect("nested evaluation from deep frames");
    assert_eq!(number(value), 2.0);
}

#[test]
fn to_integer_is_idempotent() {
    let mut interpreter = Interpreter::new();
    let samples = [
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        0.0,
        -0.0,
        0.5,
        -0.5,
        -3.7,
        9007199254740992.0 + 0.5,
    ];
    for sample in samples {
        let once = interpreter.to_integer(&Value::Number(sample)).expect("integer");
        let twice = interpreter.to_integer(&Value::Number(once)).expect("integer");
        assert!(
            same_value(&Value::Number(once), &Value::Number(twice)),
            "ToInteger not idempotent for {sample}: {once} then {twice}"
        );
    }
}
