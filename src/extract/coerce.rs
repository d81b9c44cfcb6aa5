// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conservative value coercions.
//!
//! A value is only treated as a number, boolean or percentage when it
//! parses unambiguously. Booleans are never numbers here, even though JSON
//! producers sometimes mix them.

use serde_json::{Map, Value};

/// Integer from a JSON integer, an integer-valued float, or a digit-only string.
#[must_use]
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // Range check keeps the cast exact.
            #[allow(clippy::cast_possible_truncation)]
            (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
        }),
        Value::String(s) => {
            let t = s.trim();
            if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) {
                t.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Float from a JSON number or a numeric string.
#[must_use]
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parses a trimmed string as a finite float.
#[must_use]
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Percentage in `0..=100`.
///
/// Numbers are truncated toward zero; strings must be digits with an
/// optional trailing `%`.
#[must_use]
pub fn to_percent(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => {
            let f = n.as_f64()?;
            if !f.is_finite() {
                return None;
            }
            // Truncation is intended, out-of-range values are rejected below.
            #[allow(clippy::cast_possible_truncation)]
            let t = f.trunc() as i64;
            t
        }
        Value::String(s) => {
            let t = s.trim();
            let t = t.strip_suffix('%').map_or(t, str::trim);
            if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            t.parse::<i64>().ok()?
        }
        _ => return None,
    };
    u8::try_from(n).ok().filter(|p| *p <= 100)
}

/// Boolean from a JSON boolean or a `0`/`1` integer.
#[must_use]
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => match to_int(other)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
    }
}

/// Trimmed, non-empty string.
#[must_use]
pub fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trimmed string rendition of a string or number.
#[must_use]
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => non_empty_str(value),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The object items of an array; anything else yields an empty list.
#[must_use]
pub fn objects(value: &Value) -> Vec<&Map<String, Value>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// First of `keys` whose value is meaningful.
///
/// Null, `false`, blank strings and empty containers are skipped so that
/// alternative key spellings can be probed in order.
#[must_use]
pub fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| is_meaningful(v))
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_coercion() {
        assert_eq!(to_int(&json!(5)), Some(5));
        assert_eq!(to_int(&json!(5.0)), Some(5));
        assert_eq!(to_int(&json!(5.5)), None);
        assert_eq!(to_int(&json!(" 42 ")), Some(42));
        assert_eq!(to_int(&json!("4.2")), None);
        assert_eq!(to_int(&json!("-1")), None);
        assert_eq!(to_int(&json!(true)), None);
        assert_eq!(to_int(&Value::Null), None);
    }

    #[test]
    fn number_coercion() {
        assert_eq!(to_number(&json!(" 1.25 ")), Some(1.25));
        assert_eq!(to_number(&json!(25)), Some(25.0));
        assert_eq!(to_number(&json!("")), None);
        assert_eq!(to_number(&json!("no")), None);
        assert_eq!(to_number(&json!("NaN")), None);
        assert_eq!(to_number(&json!(false)), None);
    }

    #[test]
    fn percent_coercion() {
        assert_eq!(to_percent(&json!(55)), Some(55));
        assert_eq!(to_percent(&json!(99.9)), Some(99));
        assert_eq!(to_percent(&json!("80%")), Some(80));
        assert_eq!(to_percent(&json!(" 7 % ")), Some(7));
        assert_eq!(to_percent(&json!(101)), None);
        assert_eq!(to_percent(&json!(-3)), None);
        assert_eq!(to_percent(&json!("abc")), None);
        assert_eq!(to_percent(&json!(true)), None);
    }

    #[test]
    fn bool_coercion() {
        assert_eq!(to_bool(&json!(true)), Some(true));
        assert_eq!(to_bool(&json!(1)), Some(true));
        assert_eq!(to_bool(&json!("0")), Some(false));
        assert_eq!(to_bool(&json!(2)), None);
        assert_eq!(to_bool(&json!("yes")), None);
    }

    #[test]
    fn string_coercion() {
        assert_eq!(non_empty_str(&json!("  x ")), Some("x".to_string()));
        assert_eq!(non_empty_str(&json!("   ")), None);
        assert_eq!(non_empty_str(&json!(3)), None);
        assert_eq!(scalar_string(&json!(3)), Some("3".to_string()));
        assert_eq!(scalar_string(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(scalar_string(&json!([1])), None);
    }

    #[test]
    fn first_present_skips_blank_values() {
        let m = json!({"a": "", "b": null, "c": false, "d": 0, "e": "x"});
        let m = m.as_object().unwrap();
        assert_eq!(first_present(m, &["a", "b", "c", "d", "e"]), Some(&json!(0)));
        assert_eq!(first_present(m, &["a", "b", "c"]), None);
    }
}
