use tessera::{EngineOptions, FatalError, Interpreter, TesseraError, Value};

fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> TesseraError {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn uncaught_message(source: &str) -> String {
    match eval_error(source) {
        TesseraError::Uncaught { message, .. } => message,
        other => panic!("expected uncaught exception, found {other}"),
    }
}

fn expect_number(value: &Value) -> f64 {
    value
        .as_number()
        .unwrap_or_else(|| panic!("expected Number, found {value:?}"))
}

fn expect_string(value: &Value) -> String {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected String, found {value:?}"))
        .to_string()
}

fn expect_bool(value: &Value) -> bool {
    value
        .as_bool()
        .unwrap_or_else(|| panic!("expected Boolean, found {value:?}"))
}

#[test]
fn evaluates_function_call() {
    let value = eval("function f(a) { return a + 1; } f(41)");
    assert_eq!(expect_number(&value), 42.0);
}

#[test]
fn catch_binds_thrown_value() {
    let value = eval(
        r#"
        function g() {
            try { throw 5; } catch (e) { return e + 1; }
        }
        g()
        "#,
    );
    assert_eq!(expect_number(&value), 6.0);
}

#[test]
fn finally_return_overrides_try_return() {
    let value = eval(
        r#"
        function f() {
            try { return 1; } finally { return 2; }
        }
        f()
        "#,
    );
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn finally_return_discards_pending_throw() {
    let value = eval(
        r#"
        function f() {
            try { throw new Error('lost'); } finally { return 'done'; }
        }
        f()
        "#,
    );
    assert_eq!(expect_string(&value), "done");
}

#[test]
fn finally_runs_after_break() {
    let value = eval(
        r#"
        var log = [];
        for (var i = 0; i < 3; i++) {
            try {
                if (i == 1) break;
                log.push('body' + i);
            } finally {
                log.push('finally' + i);
            }
        }
        log.join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "body0,finally0,finally1");
}

#[test]
fn continue_in_for_loop_reaches_update() {
    let value = eval("for (var i = 0; i < 3; i++) { if (i == 1) continue; } i");
    assert_eq!(expect_number(&value), 3.0);
}

#[test]
fn labeled_break_and_continue_target_outer_loop() {
    let value = eval(
        r#"
        var out = [];
        outer: for (var i = 0; i < 3; i++) {
            for (var j = 0; j < 3; j++) {
                if (j == 1) continue outer;
                if (i == 2) break outer;
                out.push(i + '' + j);
            }
        }
        out.join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "00,10");
}

#[test]
fn labeled_block_break() {
    let value = eval(
        r#"
        var reached = 'start';
        block: {
            reached = 'inside';
            break block;
            reached = 'unreachable';
        }
        reached
        "#,
    );
    assert_eq!(expect_string(&value), "inside");
}

#[test]
fn switch_falls_through_until_break() {
    let value = eval(
        r#"
        function classify(n) {
            var out = '';
            switch (n) {
                case 1: out += 'one';
                case 2: out += 'two'; break;
                default: out += 'other';
            }
            return out;
        }
        classify(1) + ',' + classify(2) + ',' + classify(3)
        "#,
    );
    assert_eq!(expect_string(&value), "onetwo,two,other");
}

#[test]
fn switch_default_in_middle_falls_through() {
    let value = eval(
        r#"
        var r = '';
        switch (5) {
            case 1: r += 'a';
            default: r += 'd';
            case 2: r += '2';
        }
        r
        "#,
    );
    assert_eq!(expect_string(&value), "d2");
}

#[test]
fn switch_uses_strict_equality() {
    let value = eval(
        r#"
        var r;
        switch ('1') {
            case 1: r = 'number'; break;
            case '1': r = 'string'; break;
        }
        r
        "#,
    );
    assert_eq!(expect_string(&value), "string");
}

#[test]
fn for_in_lists_own_keys_before_inherited_and_skips_shadowed() {
    let value = eval(
        r#"
        var proto = { a: 1, b: 2 };
        var obj = Object.create(proto);
        obj.b = 3;
        obj.c = 4;
        var keys = [];
        for (var k in obj) keys.push(k);
        keys.join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "b,c,a");
}

#[test]
fn for_in_skips_keys_deleted_during_iteration() {
    let value = eval(
        r#"
        var o = { x: 1, y: 2, z: 3 };
        var seen = [];
        for (var k in o) {
            seen.push(k);
            if (k == 'x') delete o.y;
        }
        seen.join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "x,z");
}

#[test]
fn for_in_over_null_runs_no_iterations() {
    let value = eval("var n = 0; for (var k in null) n++; for (var k in undefined) n++; n");
    assert_eq!(expect_number(&value), 0.0);
}

#[test]
fn this_binding_differs_between_strict_and_sloppy_functions() {
    let value = eval(
        r#"
        function sloppy() { return this; }
        function strict() { 'use strict'; return this; }
        [sloppy() === this, strict() === undefined, typeof sloppy.call(5), typeof strict.call(5)].join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "true,true,object,number");
}

#[test]
fn arrow_functions_capture_enclosing_this() {
    let value = eval(
        r#"
        var obj = {
            v: 7,
            f: function () { var g = () => this.v; return g(); }
        };
        obj.f()
        "#,
    );
    assert_eq!(expect_number(&value), 7.0);
}

#[test]
fn let_binding_is_in_temporal_dead_zone() {
    let message = uncaught_message("{ x; let x = 1; }");
    assert!(message.starts_with("ReferenceError"), "got {message}");
    assert!(message.contains("before initialization"), "got {message}");
}

#[test]
fn typeof_does_not_bypass_temporal_dead_zone() {
    let message = uncaught_message("typeof y; let y = 1;");
    assert!(message.starts_with("ReferenceError"), "got {message}");
}

#[test]
fn typeof_undeclared_identifier_is_undefined() {
    let value = eval("typeof nowhere");
    assert_eq!(expect_string(&value), "undefined");
}

#[test]
fn assignment_to_const_throws_type_error() {
    let message = uncaught_message("const c = 1; c = 2;");
    assert_eq!(message, "TypeError: Assignment to constant variable.");
}

#[test]
fn let_in_for_loop_creates_binding_per_iteration() {
    let value = eval(
        r#"
        var fns = [];
        for (let i = 0; i < 3; i++) fns.push(function () { return i; });
        fns.map(function (f) { return f(); }).join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "0,1,2");
}

#[test]
fn block_scoped_let_does_not_leak() {
    let value = eval("var x = 'outer'; { let x = 'inner'; } x");
    assert_eq!(expect_string(&value), "outer");
}

#[test]
fn closures_share_outer_bindings() {
    let value = eval(
        r#"
        function counter() {
            var n = 0;
            return {
                inc: function () { return ++n; },
                get: function () { return n; }
            };
        }
        var c = counter();
        c.inc();
        c.inc();
        c.get()
        "#,
    );
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn named_function_expression_sees_own_name() {
    let value = eval(
        r#"
        var fact = function inner(n) { return n <= 1 ? 1 : n * inner(n - 1); };
        [fact(5), typeof inner].join(',')
        "#,
    );
    assert_eq!(expect_string(&value), "120,undefined");
}

#[test]
fn hoisted_function_callable_before_declaration() {
    let value = eval("var r = early(); function early() { return 'hoisted'; } r");
    assert_eq!(expect_string(&value), "hoisted");
}

#[test]
fn arguments_object_reflects_call_arguments() {
    let value = eval(
        r#"
        function f() { return arguments.length + ':' + arguments[1]; }
        f('a', 'b', 'c')
        "#,
    );
    assert_eq!(expect_string(&value), "3:b");
}

#[test]
fn array_length_truncation_deletes_elements() {
    let value = eval(
        r#"
        var a = [1, 2, 3, 4, 5];
        a.length = 2;
        [a.length, a[3], a.join('-')].join('|')
        "#,
    );
    assert_eq!(expect_string(&value), "2||1-2");
}

#[test]
fn array_index_assignment_grows_length() {
    let value = eval("var a = []; a[9] = 'x'; a.length");
    assert_eq!(expect_number(&value), 10.0);
}

#[test]
fn invalid_array_length_is_range_error() {
    let message = uncaught_message("var a = []; a.length = -1;");
    assert!(message.starts_with("RangeError"), "got {message}");
}

#[test]
fn array_holes_are_skipped_by_for_each() {
    let value = eval(
        r#"
        var visited = 0;
        [1, , 3].forEach(function () { visited++; });
        visited
        "#,
    );
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn constructors_link_instances_to_prototype() {
    let value = eval(
        r#"
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.sum = function () { return this.x + this.y; };
        var p = new Point(2, 3);
        [p.sum(), p instanceof Point, p.constructor === Point].join()
        "#,
    );
    assert_eq!(expect_string(&value), "5,true,true");
}

#[test]
fn constructor_returning_object_replaces_instance() {
    let value = eval("function F() { this.a = 1; return { a: 2 }; } new F().a");
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn bound_functions_prepend_arguments() {
    let value = eval("function add(a, b) { return a + b; } var inc = add.bind(null, 1); inc(41)");
    assert_eq!(expect_number(&value), 42.0);
}

#[test]
fn apply_spreads_array_like_arguments() {
    let value = eval("function sum(a, b, c) { return a + b + c; } sum.apply(null, [1, 2, 3])");
    assert_eq!(expect_number(&value), 6.0);
}

#[test]
fn object_literal_accessors() {
    let value = eval(
        r#"
        var o = {
            _v: 1,
            get v() { return this._v * 10; },
            set v(x) { this._v = x; }
        };
        o.v = 4;
        o.v
        "#,
    );
    assert_eq!(expect_number(&value), 40.0);
}

#[test]
fn redefining_data_property_as_accessor() {
    let value = eval(
        r#"
        var o = { k: 1 };
        Object.defineProperty(o, 'k', { get: () => 2 });
        o.k
        "#,
    );
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn non_configurable_property_accepts_identical_redefinition_only() {
    let value = eval(
        r#"
        var o = {};
        Object.defineProperty(o, 'k', { value: 1, writable: false, configurable: false });
        Object.defineProperty(o, 'k', { value: 1 });
        var threw = false;
        try {
            Object.defineProperty(o, 'k', { value: 2 });
        } catch (e) {
            threw = e instanceof TypeError;
        }
        [threw, o.k].join()
        "#,
    );
    assert_eq!(expect_string(&value), "true,1");
}

#[test]
fn deleting_own_property_reveals_inherited_value() {
    let value = eval(
        r#"
        var proto = { v: 'inherited' };
        var o = Object.create(proto);
        o.v = 'own';
        delete o.v;
        o.v
        "#,
    );
    assert_eq!(expect_string(&value), "inherited");
}

#[test]
fn frozen_objects_ignore_writes_in_sloppy_code() {
    let value = eval("var o = Object.freeze({ a: 1 }); o.a = 2; [o.a, Object.isFrozen(o)].join()");
    assert_eq!(expect_string(&value), "1,true");
}

#[test]
fn frozen_objects_reject_writes_in_strict_code() {
    let message = uncaught_message("'use strict'; var o = Object.freeze({ a: 1 }); o.a = 2;");
    assert!(message.starts_with("TypeError"), "got {message}");
}

#[test]
fn strict_assignment_to_undeclared_is_reference_error() {
    let message = uncaught_message("'use strict'; undeclared = 1;");
    assert_eq!(message, "ReferenceError: undeclared is not defined");
}

#[test]
fn sloppy_assignment_to_undeclared_creates_global() {
    let value = eval("function f() { leaked = 3; } f(); leaked");
    assert_eq!(expect_number(&value), 3.0);
}

#[test]
fn equality_operators_follow_coercion_rules() {
    let value = eval("[NaN == NaN, 0 == -0, null == undefined, '1' == 1, 0 == '', null == 0].join()");
    assert_eq!(expect_string(&value), "false,true,true,true,true,false");
}

#[test]
fn relational_comparison_of_strings_and_numbers() {
    let value = eval("['b' > 'a', '10' < '9', 10 < 9, NaN < 1, NaN >= 1].join()");
    assert_eq!(expect_string(&value), "true,true,false,false,false");
}

#[test]
fn addition_prefers_string_concatenation() {
    let value = eval("[1 + '2', 1 + 2, true + 1, [] + {}].join('|')");
    assert_eq!(expect_string(&value), "12|3|2|[object Object]");
}

#[test]
fn bitwise_operators_use_int32() {
    let value = eval("[5 & 3, 5 | 3, 5 ^ 3, ~5, 1 << 31, -1 >>> 28, -16 >> 2].join()");
    assert_eq!(expect_string(&value), "1,7,6,-6,-2147483648,15,-4");
}

#[test]
fn value_of_drives_numeric_conversion() {
    let value = eval("var o = { valueOf: function () { return 41; } }; o + 1");
    assert_eq!(expect_number(&value), 42.0);
}

#[test]
fn runtime_errors_are_catchable_with_their_kind() {
    let value = eval(
        r#"
        var kinds = [];
        try { null.x; } catch (e) { kinds.push(e instanceof TypeError); }
        try { missing; } catch (e) { kinds.push(e.name); }
        try { (void 0)(); } catch (e) { kinds.push(e.constructor === TypeError); }
        kinds.join()
        "#,
    );
    assert_eq!(expect_string(&value), "true,ReferenceError,true");
}

#[test]
fn error_objects_render_name_and_message() {
    let value = eval("String(new RangeError('bad')) + '|' + new Error().toString()");
    assert_eq!(expect_string(&value), "RangeError: bad|Error");
}

#[test]
fn calling_non_function_names_the_callee() {
    let message = uncaught_message("var o = {}; o.missing();");
    assert_eq!(message, "TypeError: o.missing is not a function");
}

#[test]
fn uncaught_throw_reaches_host_with_value() {
    let err = eval_error("throw new TypeError('boom');");
    assert_eq!(err.to_string(), "Uncaught TypeError: boom");
    let thrown = err.thrown_value().expect("thrown value");
    assert!(thrown.is_object());
}

#[test]
fn uncaught_primitive_throw() {
    let err = eval_error("throw 42;");
    match err {
        TesseraError::Uncaught { value, message } => {
            assert_eq!(expect_number(&value), 42.0);
            assert_eq!(message, "42");
        }
        other => panic!("expected uncaught exception, found {other}"),
    }
}

#[test]
fn runaway_recursion_is_fatal_and_uncatchable() {
    let mut interpreter = Interpreter::with_options(EngineOptions {
        max_call_depth: 200,
        ..EngineOptions::default()
    });
    let err = interpreter
        .eval_source("function f() { return f(); } try { f(); } catch (e) { 'caught'; }")
        .expect_err("recursion should be fatal");
    assert!(matches!(
        err,
        TesseraError::Fatal(FatalError::StackOverflow { .. })
    ));

    let value = interpreter
        .eval_source("1 + 1")
        .expect("interpreter stays usable");
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn deep_recursion_within_limit_succeeds() {
    let value = eval("function f(n) { return n == 0 ? 0 : 1 + f(n - 1); } f(500)");
    assert_eq!(expect_number(&value), 500.0);
}

#[test]
fn syntax_errors_are_diagnostics() {
    let err = eval_error("while = 1");
    assert!(matches!(err, TesseraError::Diagnostic(_)), "got {err}");
}

#[test]
fn bindings_persist_across_scripts() {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source("var a = 1; let b = 2; function sum() { return a + b; }")
        .expect("first script");
    let value = interpreter.eval_source("sum()").expect("second script");
    assert_eq!(expect_number(&value), 3.0);
}

#[test]
fn redeclaring_script_let_is_syntax_error() {
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("let once = 1;").expect("first declaration");
    let err = interpreter
        .eval_source("let once = 2;")
        .expect_err("redeclaration should fail");
    match err {
        TesseraError::Uncaught { message, .. } => {
            assert_eq!(message, "SyntaxError: Identifier 'once' has already been declared");
        }
        other => panic!("expected uncaught SyntaxError, found {other}"),
    }
}

#[test]
fn with_statement_resolves_through_object() {
    let value = eval("var o = { a: 5 }; var r; with (o) { r = a * 2; } r");
    assert_eq!(expect_number(&value), 10.0);
}

#[test]
fn global_functions_convert_numbers() {
    let value = eval(
        "[parseInt('0x1f'), parseInt('12px'), parseInt('z', 36), parseFloat('3.5e2abc'), isNaN('abc'), isFinite('12')].join()",
    );
    assert_eq!(expect_string(&value), "31,12,35,350,true,true");
}

#[test]
fn number_formatting() {
    let value = eval("[(255).toString(16), (0.5).toString(2), (3.14159).toFixed(2), (1.25).toFixed(1), (0.5).toFixed(0), 1e21, 0.000001, 1 / 3].join(' ')");
    assert_eq!(
        expect_string(&value),
        "ff 0.1 3.14 1.3 1 1e+21 0.000001 0.3333333333333333"
    );
}

#[test]
fn completion_value_of_script_is_last_expression() {
    let value = eval("1; 2; var x = 3;");
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn break_keeps_value_produced_before_it() {
    assert_eq!(expect_number(&eval("1; do { 2; break; } while (false)")), 2.0);
    assert_eq!(expect_number(&eval("3; while (true) { 4; break; }")), 4.0);
    assert_eq!(expect_number(&eval("5; switch (1) { case 1: 6; break; }")), 6.0);
    assert_eq!(expect_number(&eval("7; block: { 8; break block; }")), 8.0);
}

#[test]
fn continue_keeps_value_across_labelled_loops() {
    let value = eval("outer: for (var i = 0; i < 2; i++) { for (;;) { 'inner' + i; continue outer; } }");
    assert_eq!(expect_string(&value), "inner1");
    let value = eval("9; for (var j = 0; j < 3; j++) { if (j == 2) continue; j; }");
    assert_eq!(expect_number(&value), 1.0);
}

#[test]
fn apply_rejects_oversized_argument_lists() {
    let message = uncaught_message("function f() {} f.apply(null, { length: 4294967295 })");
    assert!(message.starts_with("RangeError"), "got {message}");
    let value = eval("function g() { return arguments.length; } g.apply(null, { length: 3 })");
    assert_eq!(expect_number(&value), 3.0);
}

#[test]
fn boolean_checks() {
    assert!(expect_bool(&eval("!!'text' && !'' && !0 && !!{}")));
}
