//! Type conversion and comparison operations.
//!
//! The free functions are pure and never touch objects. Conversions that may
//! run `valueOf`/`toString` are interpreter methods at the bottom of the file.

use std::rc::Rc;

use crate::{
    completion::EvalResult,
    object::{ObjectKind, ObjectRef},
    runtime::Interpreter,
    value::Value,
};

/// Preferred type passed to `ToPrimitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Default,
    Number,
    String,
}

pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(*n == 0.0 || n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
    }
}

/// WhiteSpace and LineTerminator code points.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

pub fn trim_js_whitespace(text: &str) -> &str {
    text.trim_matches(is_js_whitespace)
}

/// `ToNumber` applied to a String (StringNumericLiteral grammar).
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = trim_js_whitespace(text);
    if trimmed.is_empty() {
        return 0.0;
    }

    let bytes = trimmed.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return parse_radix_digits(&trimmed[2..], radix).unwrap_or(f64::NAN);
        }
    }

    let (sign, unsigned) = match bytes[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(unsigned) {
        return f64::NAN;
    }
    unsigned
        .parse::<f64>()
        .map(|n| sign * n)
        .unwrap_or(f64::NAN)
}

/// Accumulates digits in `radix`; `None` if any digit is invalid or none exist.
pub fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0_f64;
    for c in digits.chars() {
        let digit = c.to_digit(radix)?;
        value = value * radix as f64 + digit as f64;
    }
    Some(value)
}

fn is_decimal_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut digits = pos - int_start;
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        digits += pos - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
            pos += 1;
        }
        let exp_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == exp_start {
            return false;
        }
    }
    pos == bytes.len()
}

/// `ToString` applied to a Number.
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", number_to_string(-value));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. `1.2345e3`.
    let formatted = format!("{value:e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let magnitude = (n - 1).abs();
        if k == 1 {
            format!("{digits}e{sign}{magnitude}")
        } else {
            format!("{}.{}e{sign}{magnitude}", &digits[..1], &digits[1..])
        }
    }
}

pub fn to_integer(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value.is_infinite() || value == 0.0 {
        value
    } else {
        value.trunc()
    }
}

fn modulo_2_32(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return 0.0;
    }
    value.trunc().rem_euclid(4_294_967_296.0)
}

pub fn to_uint32(value: f64) -> u32 {
    modulo_2_32(value) as u32
}

pub fn to_int32(value: f64) -> i32 {
    let wrapped = modulo_2_32(value);
    if wrapped >= 2_147_483_648.0 {
        (wrapped - 4_294_967_296.0) as i32
    } else {
        wrapped as i32
    }
}

pub fn to_uint16(value: f64) -> u16 {
    (modulo_2_32(value) as u32 & 0xFFFF) as u16
}

pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => strict_equals(a, b),
    }
}

/// The `===` operator.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// Compares two strings by UTF-16 code unit.
pub fn string_less_than(a: &str, b: &str) -> bool {
    a.encode_utf16().lt(b.encode_utf16())
}

impl Interpreter {
    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> EvalResult<Value> {
        let Value::Object(object) = value else {
            return Ok(value.clone());
        };
        let order = match hint {
            Hint::String => ["toString", "valueOf"],
            Hint::Number | Hint::Default => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get(object, name)?;
            if method.is_callable() {
                let result = self.call(&method, value.clone(), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &Value) -> EvalResult<f64> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                self.to_number(&primitive)?
            }
        })
    }

    pub fn to_string(&mut self, value: &Value) -> EvalResult<Rc<str>> {
        Ok(match value {
            Value::String(s) => s.clone(),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                self.to_string(&primitive)?
            }
            other => Rc::from(other.to_string()),
        })
    }

    pub fn to_integer(&mut self, value: &Value) -> EvalResult<f64> {
        Ok(to_integer(self.to_number(value)?))
    }

    pub fn to_int32(&mut self, value: &Value) -> EvalResult<i32> {
        Ok(to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &Value) -> EvalResult<u32> {
        Ok(to_uint32(self.to_number(value)?))
    }

    pub fn to_uint16(&mut self, value: &Value) -> EvalResult<u16> {
        Ok(to_uint16(self.to_number(value)?))
    }

    pub fn to_object(&mut self, value: &Value) -> EvalResult<ObjectRef> {
        let kind = match value {
            Value::Object(object) => return Ok(object.clone()),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!("Cannot convert {value} to object")))
            }
            Value::Boolean(b) => ObjectKind::Boolean(*b),
            Value::Number(n) => ObjectKind::Number(*n),
            Value::String(s) => ObjectKind::String(s.clone()),
        };
        Ok(self.create_wrapper(kind))
    }

    pub fn check_object_coercible(&mut self, value: &Value) -> EvalResult<()> {
        if value.is_nullish() {
            return Err(self.type_error(format!(
                "Cannot convert {value} to object"
            )));
        }
        Ok(())
    }

    /// The `==` operator.
    pub fn abstract_equals(&mut self, a: &Value, b: &Value) -> EvalResult<bool> {
        let mut x = a.clone();
        let mut y = b.clone();
        loop {
            match (&x, &y) {
                (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => return Ok(true),
                (Value::Number(l), Value::Number(r)) => return Ok(l == r),
                (Value::String(l), Value::String(r)) => return Ok(l == r),
                (Value::Boolean(l), Value::Boolean(r)) => return Ok(l == r),
                (Value::Object(l), Value::Object(r)) => return Ok(l.ptr_eq(r)),
                (Value::Number(l), Value::String(r)) => return Ok(*l == string_to_number(r)),
                (Value::String(l), Value::Number(r)) => return Ok(string_to_number(l) == *r),
                (Value::Boolean(b), _) => {
                    x = Value::Number(if *b { 1.0 } else { 0.0 });
                }
                (_, Value::Boolean(b)) => {
                    y = Value::Number(if *b { 1.0 } else { 0.0 });
                }
                (Value::Number(_) | Value::String(_), Value::Object(_)) => {
                    y = self.to_primitive(&y, Hint::Default)?;
                }
                (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                    x = self.to_primitive(&x, Hint::Default)?;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Abstract relational comparison `x < y`. `None` stands for the
    /// undefined result produced when either side is NaN.
    ///
    /// `left_first` controls which operand is converted first, so that `>`
    /// and `<=` (which swap operands) keep source evaluation order.
    pub fn less_than(&mut self, x: &Value, y: &Value, left_first: bool) -> EvalResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, Hint::Number)?;
            let py = self.to_primitive(y, Hint::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(y, Hint::Number)?;
            let px = self.to_primitive(x, Hint::Number)?;
            (px, py)
        };
        if let (Value::String(a), Value::String(b)) = (&px, &py) {
            return Ok(Some(string_less_than(a, b)));
        }
        let nx = self.to_number(&px)?;
        let ny = self.to_number(&py)?;
        if nx.is_nan() || ny.is_nan() {
            return Ok(None);
        }
        Ok(Some(nx < ny))
    }
}
