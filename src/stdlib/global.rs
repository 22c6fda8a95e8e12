use crate::{
    completion::EvalResult,
    conversions::{is_js_whitespace, parse_radix_digits},
    object::Attributes,
    runtime::Interpreter,
    value::{NativeFn, Value},
};

use super::arg;

pub(super) fn install(interp: &mut Interpreter) {
    let global = interp.global_object();
    {
        let mut record = global.borrow_mut();
        record.insert_data("NaN", Value::Number(f64::NAN), Attributes::NONE);
        record.insert_data("Infinity", Value::Number(f64::INFINITY), Attributes::NONE);
        record.insert_data("undefined", Value::Undefined, Attributes::NONE);
    }

    let functions: [(&'static str, u32, NativeFn); 5] = [
        ("isNaN", 1, global_is_nan),
        ("isFinite", 1, global_is_finite),
        ("parseInt", 2, global_parse_int),
        ("parseFloat", 1, global_parse_float),
        ("print", 1, global_print),
    ];
    for (name, length, call) in functions {
        interp.define_method(&global, name, length, call);
    }
}

fn global_is_nan(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

fn global_is_finite(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}

fn global_parse_int(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let input = interp.to_string(&arg(args, 0))?;
    let mut radix = interp.to_int32(&arg(args, 1))?;

    let text = input.trim_start_matches(is_js_whitespace);
    let (sign, mut digits) = match text.as_bytes().first() {
        Some(b'-') => (-1.0, &text[1..]),
        Some(b'+') => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Ok(Value::Number(f64::NAN));
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }
    if strip_prefix && (digits.starts_with("0x") || digits.starts_with("0X")) {
        digits = &digits[2..];
        radix = 16;
    }

    let radix = radix as u32;
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    let value = parse_radix_digits(&digits[..end], radix)
        .map(|magnitude| sign * magnitude)
        .unwrap_or(f64::NAN);
    Ok(Value::Number(value))
}

fn global_parse_float(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let input = interp.to_string(&arg(args, 0))?;
    let text = input.trim_start_matches(is_js_whitespace);
    Ok(Value::Number(decimal_prefix(text)))
}

/// Value of the longest prefix of `text` matching StrDecimalLiteral.
fn decimal_prefix(text: &str) -> f64 {
    let bytes = text.as_bytes();
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos = 1;
    }
    if text[pos..].starts_with("Infinity") {
        return if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut has_digits = pos > int_start;
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        has_digits |= pos > frac_start;
    }
    if !has_digits {
        return f64::NAN;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_start = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_start {
            pos = exp;
        }
    }
    text[..pos].parse::<f64>().unwrap_or(f64::NAN)
}

fn global_print(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut line = String::new();
    for (idx, value) in args.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        line.push_str(&interp.to_string(value)?);
    }
    println!("{line}");
    Ok(Value::Undefined)
}
