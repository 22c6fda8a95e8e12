use crate::{
    completion::EvalResult,
    conversions::{number_to_string, to_boolean},
    object::{Attributes, ObjectKind},
    runtime::Interpreter,
    value::Value,
};

use super::{arg, define_global};

pub(super) fn install(interp: &mut Interpreter) {
    let boolean_prototype = interp.intrinsics().boolean_prototype.clone();
    let boolean = interp.create_native_constructor("Boolean", 1, boolean_call, boolean_construct, &boolean_prototype);
    interp.define_method(&boolean_prototype, "toString", 0, boolean_to_string);
    interp.define_method(&boolean_prototype, "valueOf", 0, boolean_value_of);
    define_global(interp, "Boolean", Value::Object(boolean));

    let number_prototype = interp.intrinsics().number_prototype.clone();
    let number = interp.create_native_constructor("Number", 1, number_call, number_construct, &number_prototype);
    {
        let mut record = number.borrow_mut();
        record.insert_data("MAX_VALUE", Value::Number(f64::MAX), Attributes::NONE);
        record.insert_data("MIN_VALUE", Value::Number(f64::from_bits(1)), Attributes::NONE);
        record.insert_data("NaN", Value::Number(f64::NAN), Attributes::NONE);
        record.insert_data("POSITIVE_INFINITY", Value::Number(f64::INFINITY), Attributes::NONE);
        record.insert_data("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY), Attributes::NONE);
    }
    interp.define_method(&number_prototype, "toString", 1, number_to_string_method);
    interp.define_method(&number_prototype, "toLocaleString", 0, number_to_locale_string);
    interp.define_method(&number_prototype, "valueOf", 0, number_value_of);
    interp.define_method(&number_prototype, "toFixed", 1, number_to_fixed);
    define_global(interp, "Number", Value::Object(number));

    let string_prototype = interp.intrinsics().string_prototype.clone();
    let string = interp.create_native_constructor("String", 1, string_call, string_construct, &string_prototype);
    interp.define_method(&string, "fromCharCode", 1, string_from_char_code);
    interp.define_method(&string_prototype, "toString", 0, string_value_of);
    interp.define_method(&string_prototype, "valueOf", 0, string_value_of);
    define_global(interp, "String", Value::Object(string));
}

fn boolean_call(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(to_boolean(&arg(args, 0))))
}

fn boolean_construct(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let flag = to_boolean(&arg(args, 0));
    Ok(Value::Object(interp.create_wrapper(ObjectKind::Boolean(flag))))
}

fn this_boolean_value(interp: &mut Interpreter, this: &Value, method: &str) -> EvalResult<bool> {
    if let Value::Boolean(flag) = this {
        return Ok(*flag);
    }
    if let Some(Value::Boolean(flag)) = this.as_object().and_then(|object| object.primitive_value()) {
        return Ok(flag);
    }
    Err(interp.type_error(format!("{method} requires that 'this' be a Boolean")))
}

fn boolean_to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let flag = this_boolean_value(interp, this, "Boolean.prototype.toString")?;
    Ok(Value::from(if flag { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(this_boolean_value(interp, this, "Boolean.prototype.valueOf")?))
}

fn number_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        Some(value) => Ok(Value::Number(interp.to_number(value)?)),
        None => Ok(Value::Number(0.0)),
    }
}

fn number_construct(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let Value::Number(number) = number_call(interp, this, args)? else {
        return Ok(Value::Undefined);
    };
    Ok(Value::Object(interp.create_wrapper(ObjectKind::Number(number))))
}

fn this_number_value(interp: &mut Interpreter, this: &Value, method: &str) -> EvalResult<f64> {
    if let Value::Number(number) = this {
        return Ok(*number);
    }
    if let Some(Value::Number(number)) = this.as_object().and_then(|object| object.primitive_value()) {
        return Ok(number);
    }
    Err(interp.type_error(format!("{method} requires that 'this' be a Number")))
}

fn number_to_string_method(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let number = this_number_value(interp, this, "Number.prototype.toString")?;
    let radix = match arg(args, 0) {
        Value::Undefined => 10.0,
        other => interp.to_integer(&other)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 {
        return Ok(Value::from(number_to_string(number)));
    }
    Ok(Value::from(number_to_radix_string(number, radix as u32)))
}

fn number_to_locale_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let number = this_number_value(interp, this, "Number.prototype.toLocaleString")?;
    Ok(Value::from(number_to_string(number)))
}

fn number_value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(this_number_value(interp, this, "Number.prototype.valueOf")?))
}

fn number_to_fixed(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let number = this_number_value(interp, this, "Number.prototype.toFixed")?;
    let digits = interp.to_integer(&arg(args, 0))?;
    if !(0.0..=100.0).contains(&digits) {
        return Err(interp.range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if number.is_nan() {
        return Ok(Value::from("NaN"));
    }
    if number.abs() >= 1e21 {
        return Ok(Value::from(number_to_string(number)));
    }
    let text = fixed_digits(number.abs(), digits as usize);
    if number < 0.0 {
        return Ok(Value::from(format!("-{text}")));
    }
    Ok(Value::from(text))
}

/// `x` with `digits` fractional digits, breaking exact ties upward.
fn fixed_digits(x: f64, digits: usize) -> String {
    let wide = format!("{:.*}", digits + 40, x);
    let Some(dot) = wide.find('.') else {
        return format!("{:.*}", digits, x);
    };
    let cut = dot + 1 + digits;
    let tie = wide.as_bytes()[cut] == b'5' && wide[cut + 1..].bytes().all(|b| b == b'0');
    if !tie {
        return format!("{:.*}", digits, x);
    }
    let mut kept: Vec<u8> = wide[..cut].bytes().collect();
    if digits == 0 {
        kept.pop();
    }
    let mut idx = kept.len();
    loop {
        if idx == 0 {
            kept.insert(0, b'1');
            break;
        }
        idx -= 1;
        match kept[idx] {
            b'.' => continue,
            b'9' => kept[idx] = b'0',
            digit => {
                kept[idx] = digit + 1;
                break;
            }
        }
    }
    kept.into_iter().map(char::from).collect()
}

fn number_to_radix_string(value: f64, radix: u32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let base = radix as f64;
    let magnitude = value.abs();
    let mut integer = magnitude.trunc();
    let mut fraction = magnitude - integer;

    let mut digits = Vec::new();
    if integer == 0.0 {
        digits.push('0');
    }
    while integer >= 1.0 {
        let digit = (integer % base) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        integer = (integer / base).trunc();
    }
    digits.reverse();

    let mut text: String = digits.into_iter().collect();
    if fraction > 0.0 {
        text.push('.');
        let mut count = 0;
        while fraction > 0.0 && count < 52 {
            fraction *= base;
            let digit = fraction.trunc();
            text.push(char::from_digit(digit as u32, radix).unwrap_or('0'));
            fraction -= digit;
            count += 1;
        }
    }
    if value < 0.0 {
        text.insert(0, '-');
    }
    text
}

fn string_call(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        Some(value) => Ok(Value::String(interp.to_string(value)?)),
        None => Ok(Value::from("")),
    }
}

fn string_construct(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let Value::String(text) = string_call(interp, this, args)? else {
        return Ok(Value::Undefined);
    };
    Ok(Value::Object(interp.create_wrapper(ObjectKind::String(text))))
}

fn string_from_char_code(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut units = Vec::with_capacity(args.len());
    for value in args {
        units.push(interp.to_uint16(value)?);
    }
    Ok(Value::from(String::from_utf16_lossy(&units)))
}

fn string_value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    if let Value::String(text) = this {
        return Ok(Value::String(text.clone()));
    }
    if let Some(text @ Value::String(_)) = this.as_object().and_then(|object| object.primitive_value()) {
        return Ok(text);
    }
    Err(interp.type_error("String.prototype.valueOf requires that 'this' be a String"))
}
