//! `String.prototype` methods. Positions count UTF-16 code units.

use std::rc::Rc;

use crate::{
    completion::EvalResult,
    conversions::{to_integer, trim_js_whitespace},
    runtime::Interpreter,
    value::Value,
};

use super::arg;

pub(super) fn install(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().string_prototype.clone();
    interp.define_method(&prototype, "charAt", 1, string_char_at);
    interp.define_method(&prototype, "charCodeAt", 1, string_char_code_at);
    interp.define_method(&prototype, "concat", 1, string_concat);
    interp.define_method(&prototype, "indexOf", 1, string_index_of);
    interp.define_method(&prototype, "lastIndexOf", 1, string_last_index_of);
    interp.define_method(&prototype, "localeCompare", 1, string_locale_compare);
    interp.define_method(&prototype, "slice", 2, string_slice);
    interp.define_method(&prototype, "substring", 2, string_substring);
    interp.define_method(&prototype, "split", 2, string_split);
    interp.define_method(&prototype, "replace", 2, string_replace);
    interp.define_method(&prototype, "toLowerCase", 0, string_to_lower_case);
    interp.define_method(&prototype, "toLocaleLowerCase", 0, string_to_lower_case);
    interp.define_method(&prototype, "toUpperCase", 0, string_to_upper_case);
    interp.define_method(&prototype, "toLocaleUpperCase", 0, string_to_upper_case);
    interp.define_method(&prototype, "trim", 0, string_trim);
}

/// `CheckObjectCoercible(this)` followed by `ToString(this)`.
fn this_string(interp: &mut Interpreter, this: &Value) -> EvalResult<Rc<str>> {
    interp.check_object_coercible(this)?;
    interp.to_string(this)
}

fn units(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> Value {
    Value::from(String::from_utf16_lossy(units))
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&idx| &haystack[idx..idx + needle.len()] == needle)
}

/// Clamps a relative position (negative counts from the end) into `0..=len`.
fn relative_index(position: f64, len: usize) -> usize {
    let len = len as f64;
    let idx = if position < 0.0 {
        (len + position).max(0.0)
    } else {
        position.min(len)
    };
    idx as usize
}

fn clamp_index(position: f64, len: usize) -> usize {
    position.max(0.0).min(len as f64) as usize
}

fn string_char_at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let position = interp.to_integer(&arg(args, 0))?;
    let units = units(&text);
    if position < 0.0 || position >= units.len() as f64 {
        return Ok(Value::from(""));
    }
    let idx = position as usize;
    Ok(from_units(&units[idx..idx + 1]))
}

fn string_char_code_at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let position = interp.to_integer(&arg(args, 0))?;
    let units = units(&text);
    if position < 0.0 || position >= units.len() as f64 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(units[position as usize] as f64))
}

fn string_concat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut text = this_string(interp, this)?.to_string();
    for value in args {
        text.push_str(&interp.to_string(value)?);
    }
    Ok(Value::from(text))
}

fn string_index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let search = interp.to_string(&arg(args, 0))?;
    let position = interp.to_integer(&arg(args, 1))?;
    let haystack = units(&text);
    let start = clamp_index(position, haystack.len());
    let found = find_units(&haystack, &units(&search), start);
    Ok(Value::Number(found.map(|idx| idx as f64).unwrap_or(-1.0)))
}

fn string_last_index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let search = interp.to_string(&arg(args, 0))?;
    let position = interp.to_number(&arg(args, 1))?;
    let position = if position.is_nan() {
        f64::INFINITY
    } else {
        to_integer(position)
    };
    let haystack = units(&text);
    let needle = units(&search);
    if needle.len() > haystack.len() {
        return Ok(Value::Number(-1.0));
    }
    let start = clamp_index(position, haystack.len()).min(haystack.len() - needle.len());
    let found = (0..=start)
        .rev()
        .find(|&idx| haystack[idx..idx + needle.len()] == needle[..]);
    Ok(Value::Number(found.map(|idx| idx as f64).unwrap_or(-1.0)))
}

fn string_locale_compare(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let that = interp.to_string(&arg(args, 0))?;
    let ordering = text.cmp(&that) as i32;
    Ok(Value::Number(ordering as f64))
}

fn string_slice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let units = units(&text);
    let start = interp.to_integer(&arg(args, 0))?;
    let end = match arg(args, 1) {
        Value::Undefined => units.len() as f64,
        other => interp.to_integer(&other)?,
    };
    let from = relative_index(start, units.len());
    let to = relative_index(end, units.len());
    if from >= to {
        return Ok(Value::from(""));
    }
    Ok(from_units(&units[from..to]))
}

fn string_substring(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let units = units(&text);
    let start = interp.to_integer(&arg(args, 0))?;
    let end = match arg(args, 1) {
        Value::Undefined => units.len() as f64,
        other => interp.to_integer(&other)?,
    };
    let start = clamp_index(start, units.len());
    let end = clamp_index(end, units.len());
    Ok(from_units(&units[start.min(end)..start.max(end)]))
}

fn string_split(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let limit = match arg(args, 1) {
        Value::Undefined => u32::MAX,
        other => interp.to_uint32(&other)?,
    } as usize;
    let separator = arg(args, 0);
    let pattern = if separator.is_undefined() {
        None
    } else {
        Some(interp.to_string(&separator)?)
    };
    if limit == 0 {
        return Ok(Value::Object(interp.create_array(Vec::new())));
    }
    let Some(pattern) = pattern else {
        return Ok(Value::Object(interp.create_array(vec![Value::String(text)])));
    };

    let subject = units(&text);
    let pattern = units(&pattern);
    if subject.is_empty() {
        let parts = if pattern.is_empty() {
            Vec::new()
        } else {
            vec![Value::String(text)]
        };
        return Ok(Value::Object(interp.create_array(parts)));
    }

    let mut parts = Vec::new();
    let mut last = 0;
    let mut cursor = 0;
    while cursor < subject.len() {
        let matched = subject[cursor..].starts_with(&pattern);
        let end = cursor + pattern.len();
        if !matched || end == last {
            cursor += 1;
            continue;
        }
        parts.push(from_units(&subject[last..cursor]));
        if parts.len() == limit {
            return Ok(Value::Object(interp.create_array(parts)));
        }
        last = end;
        cursor = last;
    }
    parts.push(from_units(&subject[last..]));
    Ok(Value::Object(interp.create_array(parts)))
}

fn string_replace(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let search = interp.to_string(&arg(args, 0))?;
    let replacement = arg(args, 1);
    let template = if replacement.is_callable() {
        None
    } else {
        Some(interp.to_string(&replacement)?)
    };

    let subject = units(&text);
    let needle = units(&search);
    let Some(position) = find_units(&subject, &needle, 0) else {
        return Ok(Value::String(text));
    };
    let matched_end = position + needle.len();

    let inserted: Vec<u16> = match template {
        None => {
            let call_args = [
                Value::String(search.clone()),
                Value::Number(position as f64),
                Value::String(text.clone()),
            ];
            let result = interp.call(&replacement, Value::Undefined, &call_args)?;
            units(&interp.to_string(&result)?)
        }
        Some(template) => expand_template(&units(&template), &subject, position, matched_end),
    };

    let mut output = subject[..position].to_vec();
    output.extend_from_slice(&inserted);
    output.extend_from_slice(&subject[matched_end..]);
    Ok(from_units(&output))
}

/// Substitutes `$$`, `$&`, `` $` `` and `$'` in a replacement template.
fn expand_template(template: &[u16], subject: &[u16], start: usize, end: usize) -> Vec<u16> {
    const DOLLAR: u16 = b'$' as u16;
    let mut output = Vec::with_capacity(template.len());
    let mut idx = 0;
    while idx < template.len() {
        let unit = template[idx];
        if unit != DOLLAR || idx + 1 == template.len() {
            output.push(unit);
            idx += 1;
            continue;
        }
        match template[idx + 1] {
            next if next == DOLLAR => output.push(DOLLAR),
            next if next == b'&' as u16 => output.extend_from_slice(&subject[start..end]),
            next if next == b'`' as u16 => output.extend_from_slice(&subject[..start]),
            next if next == b'\'' as u16 => output.extend_from_slice(&subject[end..]),
            next => {
                output.push(DOLLAR);
                output.push(next);
            }
        }
        idx += 2;
    }
    output
}

fn string_to_lower_case(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    Ok(Value::from(text.to_lowercase()))
}

fn string_to_upper_case(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    Ok(Value::from(text.to_uppercase()))
}

fn string_trim(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    Ok(Value::from(trim_js_whitespace(&text)))
}
