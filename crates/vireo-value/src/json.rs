//! JSON bridge for [`Value`].
//!
//! `stringify` accepts tables, arrays, or primitives. Byte arrays convert to
//! the string `"ByteArray"`, `NaN` prints as `"NaN"`, and `Undefined` is
//! elided from tables (and nulled in arrays). A deterministic mode sorts
//! table keys lexically for snapshot tests. Circular object graphs are
//! detected with a per-call pointer stack.

use std::rc::Rc;

use serde_json::{Map, Number, json};

use crate::{ArrayData, TableData, Value, ValueError};

/// Convert a [`Value`] into a `serde_json::Value`.
///
/// `deterministic` sorts table keys lexically instead of keeping insertion
/// order.
pub fn value_to_json(value: &Value, deterministic: bool) -> Result<serde_json::Value, ValueError> {
    let mut seen: Vec<*const ()> = Vec::new();
    to_json_inner(value, deterministic, &mut seen)
}

fn to_json_inner(
    value: &Value,
    deterministic: bool,
    seen: &mut Vec<*const ()>,
) -> Result<serde_json::Value, ValueError> {
    Ok(match value {
        Value::Nil | Value::Undefined => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int32(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::UInt32(v) => json!(v),
        Value::UInt64(v) => json!(v),
        Value::Double(v) => {
            if v.is_nan() {
                json!("NaN")
            } else {
                Number::from_f64(*v)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::NaN => json!("NaN"),
        Value::String(s) => json!(s.as_ref()),
        Value::ByteArray(_) => json!("ByteArray"),
        Value::Date(ms) => json!(ms),
        Value::RegExp(re) => json!(format!("/{}/{}", re.pattern, re.flags)),
        Value::Closure(_) | Value::CFunction(_) => serde_json::Value::Null,
        Value::Array(rc) => {
            let ptr = Rc::as_ptr(rc) as *const ();
            if seen.contains(&ptr) {
                return Err(ValueError::CircularJsObject);
            }
            seen.push(ptr);
            let mut out = Vec::with_capacity(rc.borrow().items.len());
            for item in &rc.borrow().items {
                // Undefined in arrays stringifies as null.
                out.push(to_json_inner(item, deterministic, seen)?);
            }
            seen.pop();
            serde_json::Value::Array(out)
        }
        Value::Table(rc) => {
            let ptr = Rc::as_ptr(rc) as *const ();
            if seen.contains(&ptr) {
                return Err(ValueError::CircularJsObject);
            }
            seen.push(ptr);
            let table = rc.borrow();
            let mut pairs: Vec<(&str, &Value)> = table.iter().collect();
            if deterministic {
                pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
            }
            let mut map = Map::with_capacity(pairs.len());
            for (k, v) in pairs {
                map.insert(k.to_string(), to_json_inner(v, deterministic, seen)?);
            }
            seen.pop();
            serde_json::Value::Object(map)
        }
    })
}

/// Convert a `serde_json::Value` into a [`Value`].
///
/// Integers land in the 64-bit family; everything else becomes a double.
pub fn value_from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt64(u)
            } else {
                let d = n.as_f64().unwrap_or(f64::NAN);
                if d.is_nan() { Value::NaN } else { Value::Double(d) }
            }
        }
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(map) => {
            let mut table = TableData::new();
            for (k, v) in map {
                table.set(k.clone(), value_from_json(v));
            }
            Value::table(table)
        }
    }
}

/// Script-facing `JSON.stringify`.
pub fn json_stringify(value: &Value, deterministic: bool) -> Result<String, ValueError> {
    let json = value_to_json(value, deterministic)?;
    Ok(json.to_string())
}

/// Script-facing `JSON.parse`. A non-string input parses as the empty string,
/// which fails and yields nil with a log.
pub fn json_parse(value: &Value) -> Value {
    let text = value.as_str().unwrap_or("");
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => value_from_json(&json),
        Err(err) => {
            tracing::warn!(%err, "JSON.parse failed, returning nil");
            Value::Nil
        }
    }
}

/// Deep structural clone that drops sharing (used by reuse paths that need
/// detached copies of component data).
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Array(rc) => {
            let items = rc.borrow().items.iter().map(deep_clone).collect();
            Value::Array(Rc::new(std::cell::RefCell::new(ArrayData {
                items,
                is_const: false,
            })))
        }
        Value::Table(rc) => {
            let mut table = TableData::new();
            for (k, v) in rc.borrow().iter_all() {
                table.set(k.to_string(), deep_clone(v));
            }
            Value::table(table)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Value {
        let mut t = TableData::new();
        t.set("b", Value::Int64(1));
        t.set("a", Value::array(vec![Value::Bool(true), Value::string("x")]));
        t.set("gone", Value::Undefined);
        Value::table(t)
    }

    #[test]
    fn stringify_preserves_insertion_order_by_default() {
        let s = json_stringify(&sample_table(), false).unwrap();
        assert_eq!(s, r#"{"b":1,"a":[true,"x"]}"#);
    }

    #[test]
    fn deterministic_mode_sorts_keys() {
        let s = json_stringify(&sample_table(), true).unwrap();
        assert_eq!(s, r#"{"a":[true,"x"],"b":1}"#);
    }

    #[test]
    fn nan_and_bytearray_have_fixed_text() {
        let v = Value::array(vec![Value::NaN, Value::ByteArray(Rc::new(vec![1, 2]))]);
        let s = json_stringify(&v, false).unwrap();
        assert_eq!(s, r#"["NaN","ByteArray"]"#);
    }

    #[test]
    fn parse_of_non_string_is_nil() {
        assert_eq!(json_parse(&Value::Int32(5)), Value::Nil);
        assert_eq!(json_parse(&Value::Nil), Value::Nil);
    }

    #[test]
    fn round_trip_structural_equality() {
        let original = sample_table();
        let text = json_stringify(&original, false).unwrap();
        let back = json_parse(&Value::string(text));
        // `gone` was undefined and elided, so compare against the elided form.
        if let (Value::Table(a), Value::Table(b)) = (&original, &back) {
            let b = b.borrow();
            for (k, v) in a.borrow().iter() {
                assert_eq!(b.get(k), Some(v));
            }
            assert_eq!(b.len(), 2);
        } else {
            panic!("expected tables");
        }
    }

    #[test]
    fn circular_graph_is_detected() {
        let inner = Value::empty_table();
        if let Value::Table(rc) = &inner {
            rc.borrow_mut().set("self", inner.clone());
        }
        assert!(matches!(
            value_to_json(&inner, false),
            Err(ValueError::CircularJsObject)
        ));
    }
}
