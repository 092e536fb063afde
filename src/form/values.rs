use serde_json::Value;

use crate::form::element_model::{Element, SelectOption};

/// JSON equality where `3` and `3.0` compare equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Script-style truthiness: null, false, 0, "" and empty collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Clamp a numeric value into the element's configured range.
///
/// Non-numeric values and elements without range support pass through.
pub fn clamp_to_range(element: &Element, value: Value) -> Value {
    if !element.capabilities().range {
        return value;
    }

    let Some(n) = value.as_f64() else {
        return value;
    };

    let mut clamped = n;
    if let Some(min) = element.min {
        clamped = clamped.max(min);
    }
    if let Some(max) = element.max {
        clamped = clamped.min(max);
    }

    if clamped == n {
        value
    } else {
        number_value(clamped)
    }
}

/// Build a JSON number, keeping integral values as integers.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Interpret a hook result as an option list.
///
/// Accepts an array whose items are either `{label, value}` maps or plain
/// scalars (used as both label and value).
pub fn parse_options(value: &Value) -> Result<Vec<SelectOption>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("expected an array of options, got {}", type_name(value)))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => {
                let value = map.get("value").cloned().unwrap_or(Value::Null);
                let label = match map.get("label") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => display_value(other),
                    None => display_value(&value),
                };
                Ok(SelectOption { label, value })
            }
            Value::Array(_) => Err(format!("option {} is an array", i)),
            scalar => Ok(SelectOption {
                label: display_value(scalar),
                value: scalar.clone(),
            }),
        })
        .collect()
}

/// Parse a CLI-style assignment `id=value`. The value is read as JSON when
/// possible and as a plain string otherwise.
pub fn parse_assignment(raw: &str) -> Option<(String, Value)> {
    let (id, value) = raw.split_once('=')?;
    let id = id.trim();
    if id.is_empty() {
        return None;
    }

    let value = serde_json::from_str(value.trim()).unwrap_or_else(|_| Value::String(value.to_string()));
    Some((id.to_string(), value))
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
