//! Dotted/bracketed value paths (`"a.b[0].c"`).
//!
//! A path is parsed once into segments and then applied to a value tree.
//! Writes clone shared or const containers copy-on-write before mutating, so
//! updates never alias into data another owner still sees.

use crate::{TableData, Value, ValueError};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse `"a.b[0].c"` into segments. Bracket indices must be unsigned
/// integers; empty keys are rejected.
pub fn parse_value_path(path: &str) -> Result<Vec<PathSegment>, ValueError> {
    let mut segments = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('.') {
            rest = stripped;
            continue;
        }
        if let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped
                .find(']')
                .ok_or_else(|| ValueError::BadPath(path.to_string()))?;
            let digits = &stripped[..close];
            let index: usize = digits
                .parse()
                .map_err(|_| ValueError::BadPath(path.to_string()))?;
            segments.push(PathSegment::Index(index));
            rest = &stripped[close + 1..];
            continue;
        }
        let end = rest
            .find(['.', '['])
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(ValueError::BadPath(path.to_string()));
        }
        segments.push(PathSegment::Key(rest[..end].to_string()));
        rest = &rest[end..];
    }
    if segments.is_empty() {
        return Err(ValueError::BadPath(path.to_string()));
    }
    Ok(segments)
}

/// Read the value at `segments`, cloning the leaf.
pub fn get_by_path(root: &Value, segments: &[PathSegment]) -> Option<Value> {
    let Some((head, tail)) = segments.split_first() else {
        return Some(root.clone());
    };
    match (head, root) {
        (PathSegment::Key(key), Value::Table(rc)) => {
            let table = rc.borrow();
            let next = table.get(key)?;
            get_by_path(next, tail)
        }
        (PathSegment::Index(i), Value::Array(rc)) => {
            let array = rc.borrow();
            let next = array.items.get(*i)?;
            get_by_path(next, tail)
        }
        _ => None,
    }
}

/// Write `value` at `segments`, creating intermediate containers as needed
/// and cloning shared/const containers before mutation.
pub fn update_by_path(
    root: &mut Value,
    value: Value,
    segments: &[PathSegment],
) -> Result<(), ValueError> {
    let Some((head, tail)) = segments.split_first() else {
        *root = value;
        return Ok(());
    };
    match head {
        PathSegment::Key(key) => {
            if !matches!(root, Value::Table(_)) {
                if root.is_nil() || root.is_undefined() {
                    *root = Value::empty_table();
                } else {
                    return Err(ValueError::PathShapeMismatch {
                        segment: key.clone(),
                    });
                }
            }
            let Value::Table(rc) = root else { unreachable!() };
            Value::make_table_mut(rc);
            let mut table = rc.borrow_mut();
            if !table.contains_key(key) {
                table.set(key.clone(), seed_for(tail));
            }
            match table.get_mut(key) {
                Some(slot) => update_by_path(slot, value, tail),
                None => Err(ValueError::PathShapeMismatch {
                    segment: key.clone(),
                }),
            }
        }
        PathSegment::Index(i) => {
            if !matches!(root, Value::Array(_)) {
                if root.is_nil() || root.is_undefined() {
                    *root = Value::array(Vec::new());
                } else {
                    return Err(ValueError::PathShapeMismatch {
                        segment: format!("[{i}]"),
                    });
                }
            }
            let Value::Array(rc) = root else { unreachable!() };
            Value::make_array_mut(rc);
            let mut array = rc.borrow_mut();
            while array.items.len() <= *i {
                array.items.push(Value::Nil);
            }
            update_by_path(&mut array.items[*i], value, tail)
        }
    }
}

fn seed_for(tail: &[PathSegment]) -> Value {
    match tail.first() {
        Some(PathSegment::Index(_)) => Value::array(Vec::new()),
        Some(PathSegment::Key(_)) => Value::table(TableData::new()),
        None => Value::Nil,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_path() {
        let segs = parse_value_path("a.b[0].c").unwrap();
        assert_eq!(
            segs,
            vec![
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Index(0),
                PathSegment::Key("c".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(parse_value_path("").is_err());
        assert!(parse_value_path("a[x]").is_err());
        assert!(parse_value_path("a[1").is_err());
    }

    #[test]
    fn update_then_get_round_trips() {
        let segs = parse_value_path("a.b[1].c").unwrap();
        let mut root = Value::empty_table();
        update_by_path(&mut root, Value::Int64(9), &segs).unwrap();
        assert_eq!(get_by_path(&root, &segs), Some(Value::Int64(9)));
    }

    #[test]
    fn write_through_const_container_does_not_alias() {
        let mut inner = TableData::new();
        inner.set("x", Value::Int32(1));
        let mut outer = TableData::new();
        outer.set("shared", Value::table(inner));
        let root_a = Value::table(outer);
        if let Value::Table(rc) = &root_a {
            if let Some(shared) = rc.borrow().get("shared") {
                shared.mark_const();
            }
        }
        let mut root_b = root_a.clone();

        let segs = parse_value_path("shared.x").unwrap();
        update_by_path(&mut root_b, Value::Int32(2), &segs).unwrap();

        assert_eq!(get_by_path(&root_a, &segs), Some(Value::Int32(1)));
        assert_eq!(get_by_path(&root_b, &segs), Some(Value::Int32(2)));
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let mut root = Value::Int32(5);
        let segs = parse_value_path("a").unwrap();
        assert!(update_by_path(&mut root, Value::Nil, &segs).is_err());
    }
}
