use tessera::{
    ast::{ExprKind, StmtKind},
    parser::parse_program,
    Diagnostic, DiagnosticKind,
};

fn parse_error(source: &str) -> Diagnostic {
    match parse_program(source, false) {
        Ok(_) => panic!("expected a syntax error for {source:?}"),
        Err(diag) => diag,
    }
}

fn assert_rejects(source: &str, expected: &str) {
    let diag = parse_error(source);
    assert!(
        diag.message.contains(expected),
        "{source:?}: expected message containing {expected:?}, got {:?}",
        diag.message
    );
}

#[test]
fn semicolons_are_inserted_at_line_breaks() {
    let program = parse_program("var a = 1\nvar b = 2\na + b", false).expect("parse");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn return_followed_by_newline_returns_undefined() {
    let program = parse_program("function f() {\n  return\n  42\n}", false).expect("parse");
    let StmtKind::FunctionDeclaration(function) = &program.body[0].kind else {
        panic!("expected function declaration");
    };
    assert!(matches!(function.body[0].kind, StmtKind::Return(None)));
    assert_eq!(function.body.len(), 2);
}

#[test]
fn postfix_increment_does_not_cross_newline() {
    let program = parse_program("var a = 1, b = 1\na\n++b", false).expect("parse");
    assert_eq!(program.body.len(), 3);
    let StmtKind::Expr(expr) = &program.body[2].kind else {
        panic!("expected expression statement");
    };
    assert!(matches!(expr.kind, ExprKind::Update { prefix: true, .. }));
}

#[test]
fn use_strict_directive_marks_program() {
    let program = parse_program("'use strict'; var x = 1;", false).expect("parse");
    assert!(program.strict);
    let sloppy = parse_program("var y = 'use strict';", false).expect("parse");
    assert!(!sloppy.strict);
}

#[test]
fn missing_semicolon_on_same_line_is_error() {
    assert_rejects("var a = 1 var b = 2", "unexpected token");
}

#[test]
fn rejects_return_outside_function() {
    assert_rejects("return 1;", "illegal return statement outside of a function");
}

#[test]
fn rejects_throw_followed_by_newline() {
    assert_rejects("throw\nnew Error('x');", "illegal newline after throw");
}

#[test]
fn rejects_with_in_strict_code() {
    assert_rejects(
        "'use strict'; with ({}) {}",
        "strict mode code may not include a with statement",
    );
}

#[test]
fn rejects_unknown_labels() {
    assert_rejects("while (true) { break missing; }", "undefined label 'missing'");
    assert_rejects("while (true) { continue missing; }", "undefined label 'missing'");
}

#[test]
fn rejects_continue_to_non_loop_label() {
    assert_rejects(
        "block: { while (true) { continue block; } }",
        "does not denote an iteration statement",
    );
}

#[test]
fn rejects_jumps_outside_loops() {
    assert_rejects("continue;", "illegal continue statement");
    assert_rejects("break;", "illegal break statement");
    assert_rejects(
        "while (true) { function f() { break; } }",
        "illegal break statement",
    );
}

#[test]
fn rejects_duplicate_labels() {
    assert_rejects("a: a: ;", "label 'a' has already been declared");
}

#[test]
fn rejects_const_without_initializer() {
    assert_rejects("const c;", "missing initializer in const declaration");
}

#[test]
fn rejects_strict_only_constructs() {
    assert_rejects(
        "'use strict'; var x = 1; delete x;",
        "delete of an unqualified identifier in strict mode",
    );
    assert_rejects("'use strict'; 010;", "octal literals are not allowed in strict mode");
    assert_rejects(
        "function f(a, a) { 'use strict'; }",
        "duplicate parameter name not allowed in strict mode",
    );
    assert_rejects("'use strict'; var eval = 1;", "unexpected 'eval' in strict mode");
}

#[test]
fn sloppy_code_accepts_octal_and_duplicate_params() {
    parse_program("var n = 010; function f(a, a) { return a; }", false).expect("parse");
}

#[test]
fn strict_flag_applies_without_directive() {
    let diag = parse_program("with ({}) {}", true).expect_err("strict parse should fail");
    assert!(diag.message.contains("with statement"));
}

#[test]
fn rejects_multiple_default_clauses() {
    assert_rejects(
        "switch (1) { default: break; default: break; }",
        "more than one default clause",
    );
}

#[test]
fn rejects_try_without_handler() {
    assert_rejects("try {}", "missing catch or finally after try");
}

#[test]
fn reports_unexpected_end_of_input() {
    assert_rejects("var x = 1 +", "unexpected end of input");
}

#[test]
fn syntax_errors_carry_source_locations() {
    let source = "var ok = 1;\nvar = 2;";
    let diag = parse_error(source);
    assert_eq!(diag.kind, DiagnosticKind::Parser);
    assert_eq!(diag.location(source), Some((2, 5)));
    assert!(diag.to_string().starts_with("SyntaxError: "));
}

#[test]
fn lexer_errors_are_syntax_errors() {
    let diag = parse_error("var s = 'unterminated");
    assert_eq!(diag.kind, DiagnosticKind::Lexer);
}
