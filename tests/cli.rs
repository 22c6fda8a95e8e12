use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn tessera() -> Command {
    Command::cargo_bin("tessera").expect("binary exists")
}

#[test]
fn eval_prints_completion_value() {
    tessera()
        .arg("eval")
        .arg("1 + 2")
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));
}

#[test]
fn eval_prints_strings_unquoted() {
    tessera()
        .arg("eval")
        .arg("'tess' + 'era'")
        .assert()
        .success()
        .stdout(predicate::str::contains("tessera"));
}

#[test]
fn run_executes_script_file() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("hello.js");
    fs::write(
        &script,
        "function greet(name) { return 'Hello, ' + name + '!'; }\nprint(greet('Tessera'), 42);\n",
    )
    .expect("write script");

    tessera()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Tessera! 42"));
}

#[test]
fn uncaught_exception_fails_with_message() {
    tessera()
        .arg("eval")
        .arg("throw new Error('boom')")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Uncaught Error: boom"));
}

#[test]
fn syntax_error_reports_location() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.js");
    fs::write(&script, "var ok = 1;\nvar = 2;\n").expect("write script");

    tessera()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("SyntaxError"))
        .stderr(predicate::str::contains("broken.js:2:"));
}

#[test]
fn strict_flag_rejects_implicit_globals() {
    tessera()
        .arg("--strict")
        .arg("eval")
        .arg("x = 1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ReferenceError"));
}

#[test]
fn max_call_depth_flag_limits_recursion() {
    tessera()
        .arg("--max-call-depth")
        .arg("50")
        .arg("eval")
        .arg("function f(n) { return n == 0 ? 0 : f(n - 1); } f(100)")
        .assert()
        .failure()
        .stderr(predicate::str::contains("maximum call stack size exceeded"));
}

#[test]
fn missing_script_is_io_error() {
    let dir = tempdir().expect("create temp dir");
    tessera()
        .arg("run")
        .arg(dir.path().join("absent.js"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
