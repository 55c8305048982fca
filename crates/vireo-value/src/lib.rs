//! Tagged-union value model shared between the scripting VM and the element
//! core.
//!
//! A [`Value`] carries every type the script side can produce: nil/undefined,
//! booleans, the integer family, doubles, strings, ref-counted arrays and
//! insertion-ordered tables, byte arrays, dates, regexps, and function
//! handles. Containers are shared by reference count; a container marked
//! const is cloned copy-on-write before its first mutation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub mod arith;
pub mod builtins;
pub mod json;
pub mod path;

pub use json::{json_parse, json_stringify, value_from_json, value_to_json};
pub use path::{PathSegment, get_by_path, parse_value_path, update_by_path};

use thiserror::Error;

/// Errors surfaced by the value model. None of these cross the C-ABI
/// boundary; callers either drop them with a log or re-raise them as script
/// exceptions on the current VM frame.
#[derive(Debug, Error)]
pub enum ValueError {
    /// A JS object graph referenced itself while being converted.
    #[error("circular reference detected while converting object graph")]
    CircularJsObject,
    /// A value path could not be parsed.
    #[error("malformed value path: {0}")]
    BadPath(String),
    /// A path segment addressed a value of the wrong shape.
    #[error("path segment `{segment}` does not match container shape")]
    PathShapeMismatch { segment: String },
    /// JSON text failed to parse.
    #[error("json parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Native function callable from script with an argument slice.
pub type CFunction = fn(&[Value]) -> Value;

/// Dense array payload. `is_const` marks shared immutable data that must be
/// cloned before mutation.
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    pub items: Vec<Value>,
    pub is_const: bool,
}

/// Insertion-ordered string-keyed table.
///
/// Entries keep their first-insertion position; overwriting a key updates the
/// value in place. Iteration skips `Undefined` values, matching script-side
/// `keys()` semantics.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
    pub is_const: bool,
}

impl TableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let i = *self.index.get(key)?;
        Some(&mut self.entries[i].1)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order, skipping `Undefined` values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Undefined))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate every entry including `Undefined` slots (diagnostics only).
    pub fn iter_all(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }
}

/// Regular expression payload: pattern plus flag string.
#[derive(Debug, Clone)]
pub struct RegExpData {
    pub pattern: String,
    pub flags: String,
}

impl RegExpData {
    /// Test the pattern against the input, honoring the `i` flag.
    pub fn test(&self, input: &str) -> bool {
        let mut builder = regex::RegexBuilder::new(&self.pattern);
        builder.case_insensitive(self.flags.contains('i'));
        builder.multi_line(self.flags.contains('m'));
        builder.dot_matches_new_line(self.flags.contains('s'));
        match builder.build() {
            Ok(re) => re.is_match(input),
            Err(err) => {
                tracing::warn!(pattern = %self.pattern, %err, "invalid regexp pattern");
                false
            }
        }
    }
}

/// The script-side value union.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Undefined,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Double(f64),
    /// A distinct not-a-number value; prints as `"NaN"` in JSON.
    NaN,
    String(Rc<str>),
    Array(Rc<RefCell<ArrayData>>),
    Table(Rc<RefCell<TableData>>),
    ByteArray(Rc<Vec<u8>>),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    RegExp(Rc<RegExpData>),
    /// Opaque bytecode closure handle owned by the VM.
    Closure(u64),
    CFunction(CFunction),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(ArrayData {
            items,
            is_const: false,
        })))
    }

    pub fn table(data: TableData) -> Self {
        Value::Table(Rc::new(RefCell::new(data)))
    }

    pub fn empty_table() -> Self {
        Value::table(TableData::new())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(_)
                | Value::Int64(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
                | Value::Double(_)
        )
    }

    /// True for the integer family only.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::UInt32(_) | Value::UInt64(_)
        )
    }

    /// Numeric payload as f64. `NaN` intentionally returns `None`; it is a
    /// distinct value type, not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload as i64 when the value is integral and fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt32(v) => Some(*v as i64),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by control flow: nil/undefined/false/0/NaN/"" are
    /// falsy, everything else truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil | Value::Undefined | Value::NaN => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            other => match other.as_number() {
                Some(n) => n != 0.0,
                None => true,
            },
        }
    }

    /// Ensure the array payload is uniquely owned and mutable, cloning a
    /// shared or const container first.
    pub fn make_array_mut(rc: &mut Rc<RefCell<ArrayData>>) {
        let needs_clone = Rc::strong_count(rc) > 1 || rc.borrow().is_const;
        if needs_clone {
            let mut cloned = rc.borrow().clone();
            cloned.is_const = false;
            *rc = Rc::new(RefCell::new(cloned));
        }
    }

    /// Ensure the table payload is uniquely owned and mutable, cloning a
    /// shared or const container first.
    pub fn make_table_mut(rc: &mut Rc<RefCell<TableData>>) {
        let needs_clone = Rc::strong_count(rc) > 1 || rc.borrow().is_const;
        if needs_clone {
            let mut cloned = rc.borrow().clone();
            cloned.is_const = false;
            *rc = Rc::new(RefCell::new(cloned));
        }
    }

    /// Mark a container const (shared immutable). No-op for non-containers.
    pub fn mark_const(&self) {
        match self {
            Value::Array(rc) => rc.borrow_mut().is_const = true,
            Value::Table(rc) => rc.borrow_mut().is_const = true,
            _ => {}
        }
    }

    /// Kind name used in diagnostics and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Double(_) => "double",
            Value::NaN => "nan",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::ByteArray(_) => "bytearray",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Closure(_) => "closure",
            Value::CFunction(_) => "cfunction",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) | (Undefined, Undefined) => true,
            (Bool(a), Bool(b)) => a == b,
            (NaN, _) | (_, NaN) => false,
            (String(a), String(b)) => a == b,
            (ByteArray(a), ByteArray(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (RegExp(a), RegExp(b)) => a.pattern == b.pattern && a.flags == b.flags,
            (Closure(a), Closure(b)) => a == b,
            (CFunction(a), CFunction(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Array(a), Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                a.borrow().items == b.borrow().items
            }
            (Table(a), Table(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter_all()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v == other))
            }
            // Numbers compare across integer widths and doubles.
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.as_i64(), b.as_i64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a.as_number() == b.as_number(),
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Diagnostic formatting. `Undefined` prints as `undefined`; `NaN` as
    /// `NaN`; containers print their JSON-ish shape.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{}", arith::double_to_text(*v)),
            Value::NaN => write!(f, "NaN"),
            Value::String(s) => write!(f, "{s}"),
            Value::ByteArray(_) => write!(f, "ByteArray"),
            Value::Date(ms) => write!(f, "Date({ms})"),
            Value::RegExp(re) => write!(f, "/{}/{}", re.pattern, re.flags),
            Value::Closure(id) => write!(f, "closure#{id}"),
            Value::CFunction(_) => write!(f, "cfunction"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Table(t) => {
                write!(f, "{{")?;
                for (i, (k, v)) in t.borrow().iter_all().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
