//! Script-visible builtin surface installed by the core.
//!
//! The VM consumes these as a table of named groups (`console`, `Math`,
//! `JSON`, `Date`, `JSBI`, …) whose members are [`CFunction`]s over
//! [`Value`]. Console output delegates to `tracing` at mapped levels.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{TableData, Value, json};

/// The ±2^53 band inside which an int64 survives a float crossing losslessly.
pub const SAFE_INTEGER_BOUND: i64 = 1 << 53;

/// Build the global table the core installs into the VM scope.
///
/// Wire-level names are part of the host contract and must not be renamed.
pub fn global_table(global_props: Value, system_info: Value) -> Value {
    let mut globals = TableData::new();
    globals.set("__globalProps", global_props);
    globals.set("SystemInfo", system_info);
    globals.set("console", console_table());
    globals.set("JSON", json_table());
    globals.set("Math", math_table());
    globals.set("Date", date_table());
    globals.set("JSBI", bigint_table());
    globals.set("Array", array_table());
    Value::table(globals)
}

fn args_text(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn console_table() -> Value {
    let mut t = TableData::new();
    t.set("log", Value::CFunction(|args| {
        tracing::info!(target: "script", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("info", Value::CFunction(|args| {
        tracing::info!(target: "script", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("debug", Value::CFunction(|args| {
        tracing::debug!(target: "script", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("warn", Value::CFunction(|args| {
        tracing::warn!(target: "script", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("error", Value::CFunction(|args| {
        tracing::error!(target: "script", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("report", Value::CFunction(|args| {
        tracing::info!(target: "script.report", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("alog", Value::CFunction(|args| {
        tracing::info!(target: "script.alog", "{}", args_text(args));
        Value::Undefined
    }));
    t.set("assert", Value::CFunction(|args| {
        let ok = args.first().map(Value::is_truthy).unwrap_or(false);
        if !ok {
            tracing::error!(target: "script", "assertion failed: {}", args_text(&args[1..]));
        }
        Value::Undefined
    }));
    Value::table(t)
}

fn json_table() -> Value {
    let mut t = TableData::new();
    t.set("parse", Value::CFunction(|args| {
        json::json_parse(args.first().unwrap_or(&Value::Nil))
    }));
    t.set("stringify", Value::CFunction(|args| {
        match json::json_stringify(args.first().unwrap_or(&Value::Nil), false) {
            Ok(text) => Value::string(text),
            Err(err) => {
                tracing::warn!(%err, "JSON.stringify failed");
                Value::Undefined
            }
        }
    }));
    Value::table(t)
}

fn unary_math(args: &[Value], f: fn(f64) -> f64) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(x) => {
            let r = f(x);
            if r.is_nan() { Value::NaN } else { Value::Double(r) }
        }
        None => Value::NaN,
    }
}

fn math_table() -> Value {
    let mut t = TableData::new();
    t.set("sin", Value::CFunction(|a| unary_math(a, f64::sin)));
    t.set("cos", Value::CFunction(|a| unary_math(a, f64::cos)));
    t.set("tan", Value::CFunction(|a| unary_math(a, f64::tan)));
    t.set("asin", Value::CFunction(|a| unary_math(a, f64::asin)));
    t.set("acos", Value::CFunction(|a| unary_math(a, f64::acos)));
    t.set("atan", Value::CFunction(|a| unary_math(a, f64::atan)));
    t.set("abs", Value::CFunction(|a| unary_math(a, f64::abs)));
    t.set("ceil", Value::CFunction(|a| unary_math(a, f64::ceil)));
    t.set("floor", Value::CFunction(|a| unary_math(a, f64::floor)));
    t.set("round", Value::CFunction(|a| unary_math(a, f64::round)));
    t.set("sqrt", Value::CFunction(|a| unary_math(a, f64::sqrt)));
    t.set("exp", Value::CFunction(|a| unary_math(a, f64::exp)));
    t.set("log", Value::CFunction(|a| unary_math(a, f64::ln)));
    t.set("pow", Value::CFunction(|args| {
        let (Some(x), Some(y)) = (
            args.first().and_then(Value::as_number),
            args.get(1).and_then(Value::as_number),
        ) else {
            return Value::NaN;
        };
        let r = x.powf(y);
        if r.is_nan() { Value::NaN } else { Value::Double(r) }
    }));
    t.set("max", Value::CFunction(|args| {
        fold_extremum(args, f64::NEG_INFINITY, f64::max)
    }));
    t.set("min", Value::CFunction(|args| {
        fold_extremum(args, f64::INFINITY, f64::min)
    }));
    t.set("random", Value::CFunction(|_| {
        // Deterministic hosts override this slot; default derives from the clock.
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        Value::Double((nanos as f64 / 1e9).fract())
    }));
    Value::table(t)
}

fn fold_extremum(args: &[Value], seed: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut acc = seed;
    for arg in args {
        match arg.as_number() {
            Some(n) => acc = pick(acc, n),
            None => return Value::NaN,
        }
    }
    if args.is_empty() {
        return Value::Double(seed);
    }
    Value::Double(acc)
}

/// Array prototype helpers that do not take a script closure. Callback-driven
/// members (`map`, `filter`, `find`, `forEach`, `findIndex`) are dispatched
/// by the VM, which owns closure invocation.
fn array_table() -> Value {
    let mut t = TableData::new();
    // In-place members mutate through the caller's handle; a const payload
    // is never written, the op is skipped with a log.
    t.set("push", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::NaN };
        let mut array = rc.borrow_mut();
        if array.is_const {
            tracing::warn!("push on a const array skipped");
            return Value::Int64(array.items.len() as i64);
        }
        for v in &args[1..] {
            array.items.push(v.clone());
        }
        Value::Int64(array.items.len() as i64)
    }));
    t.set("pop", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::Undefined };
        let mut array = rc.borrow_mut();
        if array.is_const {
            tracing::warn!("pop on a const array skipped");
            return Value::Undefined;
        }
        array.items.pop().unwrap_or(Value::Undefined)
    }));
    t.set("shift", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::Undefined };
        let mut array = rc.borrow_mut();
        if array.is_const {
            tracing::warn!("shift on a const array skipped");
            return Value::Undefined;
        }
        if array.items.is_empty() {
            Value::Undefined
        } else {
            array.items.remove(0)
        }
    }));
    t.set("concat", Value::CFunction(|args| {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Value::Array(rc) => out.extend(rc.borrow().items.iter().cloned()),
                other => out.push(other.clone()),
            }
        }
        Value::array(out)
    }));
    t.set("join", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::string("") };
        let sep = args.get(1).and_then(Value::as_str).unwrap_or(",").to_string();
        let text = rc
            .borrow()
            .items
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(&sep);
        Value::string(text)
    }));
    t.set("includes", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::Bool(false) };
        let needle = args.get(1).cloned().unwrap_or(Value::Undefined);
        Value::Bool(rc.borrow().items.iter().any(|v| *v == needle))
    }));
    t.set("slice", Value::CFunction(|args| {
        let Some(Value::Array(rc)) = args.first() else { return Value::array(vec![]) };
        let array = rc.borrow();
        let len = array.items.len() as i64;
        let clamp = |raw: i64| -> usize {
            let idx = if raw < 0 { len + raw } else { raw };
            idx.clamp(0, len) as usize
        };
        let start = clamp(args.get(1).and_then(Value::as_i64).unwrap_or(0));
        let end = clamp(args.get(2).and_then(Value::as_i64).unwrap_or(len));
        let items = if start < end {
            array.items[start..end].to_vec()
        } else {
            Vec::new()
        };
        Value::array(items)
    }));
    Value::table(t)
}

/// Current time in milliseconds since the Unix epoch.
pub fn date_now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

fn date_table() -> Value {
    let mut t = TableData::new();
    t.set("now", Value::CFunction(|_| Value::Double(date_now_ms())));
    Value::table(t)
}

/// `Number.prototype.toFixed` equivalent.
pub fn number_to_fixed(value: &Value, digits: u32) -> Value {
    match value.as_number() {
        Some(n) => Value::string(format!("{:.*}", digits as usize, n)),
        None => Value::NaN,
    }
}

// --- BigInt wrapper ---------------------------------------------------------

/// Wrap an int64 for script use. Values inside the safe-integer band stay
/// plain numbers; outside it they cross to script as a BigInt table
/// `{ __bigint__: "<decimal>" }` so no precision is lost.
pub fn bigint_wrap(v: i64) -> Value {
    if (-SAFE_INTEGER_BOUND..=SAFE_INTEGER_BOUND).contains(&v) {
        return Value::Int64(v);
    }
    let mut t = TableData::new();
    t.set("__bigint__", Value::string(v.to_string()));
    Value::table(t)
}

/// Read back a BigInt wrapper or plain integer.
pub fn bigint_unwrap(v: &Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    if let Value::Table(rc) = v {
        let table = rc.borrow();
        if let Some(text) = table.get("__bigint__").and_then(Value::as_str) {
            return text.parse().ok();
        }
    }
    if let Some(text) = v.as_str() {
        return text.parse().ok();
    }
    None
}

fn bigint_binop(args: &[Value], op: fn(i64, i64) -> Option<i64>) -> Value {
    let (Some(a), Some(b)) = (
        args.first().and_then(bigint_unwrap),
        args.get(1).and_then(bigint_unwrap),
    ) else {
        return Value::NaN;
    };
    match op(a, b) {
        Some(r) => bigint_wrap(r),
        None => {
            tracing::warn!("BigInt operation overflowed or divided by zero");
            Value::Nil
        }
    }
}

fn bigint_cmp(args: &[Value], pred: fn(i64, i64) -> bool) -> Value {
    let (Some(a), Some(b)) = (
        args.first().and_then(bigint_unwrap),
        args.get(1).and_then(bigint_unwrap),
    ) else {
        return Value::Bool(false);
    };
    Value::Bool(pred(a, b))
}

fn bigint_table() -> Value {
    let mut t = TableData::new();
    t.set("BigInt", Value::CFunction(|args| {
        match args.first().and_then(bigint_unwrap) {
            Some(v) => bigint_wrap(v),
            None => Value::NaN,
        }
    }));
    t.set("add", Value::CFunction(|a| bigint_binop(a, i64::checked_add)));
    t.set("subtract", Value::CFunction(|a| bigint_binop(a, i64::checked_sub)));
    t.set("multiply", Value::CFunction(|a| bigint_binop(a, i64::checked_mul)));
    t.set("divide", Value::CFunction(|a| bigint_binop(a, i64::checked_div)));
    t.set("remainder", Value::CFunction(|a| bigint_binop(a, i64::checked_rem)));
    t.set("equal", Value::CFunction(|a| bigint_cmp(a, |x, y| x == y)));
    t.set("notEqual", Value::CFunction(|a| bigint_cmp(a, |x, y| x != y)));
    t.set("lessThan", Value::CFunction(|a| bigint_cmp(a, |x, y| x < y)));
    t.set("lessThanOrEqual", Value::CFunction(|a| bigint_cmp(a, |x, y| x <= y)));
    t.set("greaterThan", Value::CFunction(|a| bigint_cmp(a, |x, y| x > y)));
    t.set("greaterThanOrEqual", Value::CFunction(|a| bigint_cmp(a, |x, y| x >= y)));
    Value::table(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(group: &Value, name: &str, args: &[Value]) -> Value {
        let Value::Table(rc) = group else { panic!("expected table") };
        let f = match rc.borrow().get(name) {
            Some(Value::CFunction(f)) => *f,
            other => panic!("missing builtin {name}: {other:?}"),
        };
        f(args)
    }

    #[test]
    fn globals_expose_wire_level_names() {
        let g = global_table(Value::Nil, Value::Nil);
        let Value::Table(rc) = &g else { panic!() };
        let t = rc.borrow();
        for name in ["__globalProps", "SystemInfo", "console", "JSON", "Math", "Date", "JSBI"] {
            assert!(t.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn math_pow_and_extremes() {
        let m = math_table();
        assert_eq!(
            call(&m, "pow", &[Value::Int32(2), Value::Int32(10)]),
            Value::Double(1024.0)
        );
        assert_eq!(
            call(&m, "max", &[Value::Int32(3), Value::Double(7.5), Value::Int32(-1)]),
            Value::Double(7.5)
        );
        assert_eq!(call(&m, "min", &[Value::string("x")]), Value::NaN);
    }

    #[test]
    fn push_grows_the_callers_array() {
        let arr = Value::array(vec![Value::Int32(1)]);
        let a = array_table();
        let len = call(&a, "push", &[arr.clone(), Value::Int32(2), Value::Int32(3)]);
        assert_eq!(len, Value::Int64(3));
        // The caller's handle sees the new items, not a dropped copy.
        let Value::Array(rc) = &arr else { panic!() };
        assert_eq!(rc.borrow().items.len(), 3);
        assert_eq!(rc.borrow().items[2], Value::Int32(3));

        let popped = call(&a, "pop", &[arr.clone()]);
        assert_eq!(popped, Value::Int32(3));
        assert_eq!(rc.borrow().items.len(), 2);
        let shifted = call(&a, "shift", &[arr.clone()]);
        assert_eq!(shifted, Value::Int32(1));
        assert_eq!(rc.borrow().items.len(), 1);
    }

    #[test]
    fn const_arrays_are_never_written_in_place() {
        let arr = Value::array(vec![Value::Int32(1)]);
        arr.mark_const();
        let a = array_table();

        assert_eq!(call(&a, "push", &[arr.clone(), Value::Int32(2)]), Value::Int64(1));
        assert_eq!(call(&a, "pop", &[arr.clone()]), Value::Undefined);
        assert_eq!(call(&a, "shift", &[arr.clone()]), Value::Undefined);

        let Value::Array(rc) = &arr else { panic!() };
        assert_eq!(rc.borrow().items, vec![Value::Int32(1)]);
        assert!(rc.borrow().is_const);
    }

    #[test]
    fn to_fixed_formats() {
        assert_eq!(
            number_to_fixed(&Value::Double(3.14159), 2),
            Value::string("3.14")
        );
    }

    #[test]
    fn bigint_crossing_boundary() {
        // Inside the safe band stays a plain integer.
        assert_eq!(bigint_wrap(42), Value::Int64(42));
        // Outside it becomes a wrapper and survives round trip.
        let big = SAFE_INTEGER_BOUND + 7;
        let wrapped = bigint_wrap(big);
        assert!(matches!(wrapped, Value::Table(_)));
        assert_eq!(bigint_unwrap(&wrapped), Some(big));
    }

    #[test]
    fn bigint_divide_by_zero_is_nil() {
        let t = bigint_table();
        assert_eq!(
            call(&t, "divide", &[Value::Int64(10), Value::Int64(0)]),
            Value::Nil
        );
        assert_eq!(
            call(&t, "greaterThan", &[Value::Int64(10), Value::Int64(3)]),
            Value::Bool(true)
        );
    }
}
