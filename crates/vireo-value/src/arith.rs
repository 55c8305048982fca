//! Arithmetic over [`Value`] with the script VM's promotion rules.
//!
//! Integer arithmetic stays integer as long as both operands are integers and
//! the result fits in 64 bits; overflow promotes to double. Division by zero
//! returns nil (with a log) rather than ±∞. `+` is numeric when both sides
//! are numeric and string concatenation otherwise.

use crate::Value;

/// Format a double the way script-side string coercion does: integral values
/// within the i64 range snap to integer text.
pub fn double_to_text(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 9.2e18 {
        return format!("{}", v as i64);
    }
    format!("{v}")
}

/// Coerce a value to the text used by `+` concatenation.
fn to_concat_text(v: &Value) -> String {
    match v {
        // Fast path: integers go straight to integer text.
        _ if v.is_integer() => v.as_i64().map(|i| i.to_string()).unwrap_or_else(|| {
            // u64 above i64::MAX
            match v {
                Value::UInt64(u) => u.to_string(),
                _ => unreachable!(),
            }
        }),
        Value::Double(d) => double_to_text(*d),
        other => other.to_string(),
    }
}

fn binary_int(a: &Value, b: &Value) -> Option<(i64, i64)> {
    Some((a.as_i64()?, b.as_i64()?))
}

/// `a + b`: numeric addition when both sides are numeric, string
/// concatenation otherwise.
pub fn add(a: &Value, b: &Value) -> Value {
    if a.is_numeric() && b.is_numeric() {
        if let Some((x, y)) = binary_int(a, b) {
            if a.is_integer() && b.is_integer() {
                return match x.checked_add(y) {
                    Some(sum) => Value::Int64(sum),
                    None => Value::Double(x as f64 + y as f64),
                };
            }
        }
        return double_result(a.as_number().unwrap_or(0.0) + b.as_number().unwrap_or(0.0));
    }
    if matches!(a, Value::NaN) || matches!(b, Value::NaN) {
        return Value::NaN;
    }
    Value::string(format!("{}{}", to_concat_text(a), to_concat_text(b)))
}

/// `a - b` with integer preservation.
pub fn sub(a: &Value, b: &Value) -> Value {
    numeric_binop(a, b, i64::checked_sub, |x, y| x - y)
}

/// `a * b` with integer preservation.
pub fn mul(a: &Value, b: &Value) -> Value {
    numeric_binop(a, b, i64::checked_mul, |x, y| x * y)
}

/// `a / b`. Division by zero returns nil with a log. Integer division stays
/// integer only when it divides evenly; otherwise the result is a double.
pub fn div(a: &Value, b: &Value) -> Value {
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Value::NaN;
    };
    if y == 0.0 {
        tracing::warn!("division by zero yields nil");
        return Value::Nil;
    }
    if a.is_integer() && b.is_integer() {
        if let Some((ix, iy)) = binary_int(a, b) {
            if iy != 0 && ix % iy == 0 {
                return Value::Int64(ix / iy);
            }
        }
    }
    double_result(x / y)
}

/// `a % b`. Modulo by zero returns nil with a log.
pub fn rem(a: &Value, b: &Value) -> Value {
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Value::NaN;
    };
    if y == 0.0 {
        tracing::warn!("modulo by zero yields nil");
        return Value::Nil;
    }
    if a.is_integer() && b.is_integer() {
        if let Some((ix, iy)) = binary_int(a, b) {
            if iy != 0 {
                return Value::Int64(ix % iy);
            }
        }
    }
    double_result(x % y)
}

fn numeric_binop(
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Value::NaN;
    };
    if a.is_integer() && b.is_integer() {
        if let Some((ix, iy)) = binary_int(a, b) {
            return match int_op(ix, iy) {
                Some(r) => Value::Int64(r),
                None => Value::Double(float_op(ix as f64, iy as f64)),
            };
        }
    }
    double_result(float_op(x, y))
}

fn double_result(v: f64) -> Value {
    if v.is_nan() { Value::NaN } else { Value::Double(v) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_stays_integer() {
        assert_eq!(add(&Value::Int32(2), &Value::Int64(3)), Value::Int64(5));
    }

    #[test]
    fn overflow_promotes_to_double() {
        let big = Value::Int64(i64::MAX);
        match add(&big, &Value::Int64(1)) {
            Value::Double(d) => assert!(d > i64::MAX as f64 - 2.0),
            other => panic!("expected double, got {other:?}"),
        }
    }

    #[test]
    fn plus_concatenates_when_not_numeric() {
        let got = add(&Value::string("n="), &Value::Int64(42));
        assert_eq!(got, Value::string("n=42"));
        // Integral doubles snap to integer text.
        let got = add(&Value::Double(3.0), &Value::string("px"));
        assert_eq!(got, Value::string("3px"));
    }

    #[test]
    fn division_by_zero_is_nil() {
        assert_eq!(div(&Value::Int32(1), &Value::Int32(0)), Value::Nil);
        assert_eq!(rem(&Value::Int32(1), &Value::Int32(0)), Value::Nil);
    }

    #[test]
    fn division_stays_integer_only_when_even() {
        assert_eq!(div(&Value::Int32(6), &Value::Int32(3)), Value::Int64(2));
        assert_eq!(div(&Value::Int32(7), &Value::Int32(2)), Value::Double(3.5));
    }
}
