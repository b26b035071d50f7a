//! String built-in functions for VoidScript
//!
//! Provides functions for string manipulation:
//! - upper, lower: Case conversion
//! - trim: Whitespace removal
//! - split, join: String splitting and joining
//! - contains, starts_with, ends_with: Substring checks
//! - replace, repeat, substr

use super::NativeTable;
use crate::value::Value;

/// Longest string `repeat` may build, in bytes
pub const MAX_REPEAT_LEN: usize = 1 << 20;

/// Register string functions
pub fn register(table: &mut NativeTable) {
    register_case(table);
    register_trim(table);
    register_split(table);
    register_join(table);
    register_contains(table);
    register_affixes(table);
    register_replace(table);
    register_repeat(table);
    register_substr(table);
}

fn string<'a>(value: &'a Value, func: &str) -> Result<&'a str, String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(format!("{}() expects a string, got {}", func, other.type_name())),
    }
}

/// upper(string), lower(string)
fn register_case(table: &mut NativeTable) {
    table.register_native_with_arity("upper", 1, |args| {
        Ok(Value::String(string(&args[0], "upper")?.to_uppercase()))
    });
    table.register_native_with_arity("lower", 1, |args| {
        Ok(Value::String(string(&args[0], "lower")?.to_lowercase()))
    });
}

/// trim(string)
fn register_trim(table: &mut NativeTable) {
    table.register_native_with_arity("trim", 1, |args| {
        Ok(Value::String(string(&args[0], "trim")?.trim().to_string()))
    });
}

/// split(string, separator)
fn register_split(table: &mut NativeTable) {
    table.register_native_with_arity("split", 2, |args| {
        let s = string(&args[0], "split")?;
        let sep = string(&args[1], "split")?;
        let parts: Vec<Value> = if sep.is_empty() {
            s.chars().map(|c| Value::String(c.to_string())).collect()
        } else {
            s.split(sep).map(|p| Value::String(p.to_string())).collect()
        };
        Ok(Value::Array(parts))
    });
}

/// join(array, separator)
fn register_join(table: &mut NativeTable) {
    table.register_native_with_arity("join", 2, |args| {
        let sep = string(&args[1], "join")?;
        match &args[0] {
            Value::Array(arr) => {
                let parts: Vec<String> = arr.iter().map(Value::to_string_value).collect();
                Ok(Value::String(parts.join(sep)))
            }
            other => Err(format!("join() expects an array, got {}", other.type_name())),
        }
    });
}

/// contains(haystack, needle) - substring, array element or object key
fn register_contains(table: &mut NativeTable) {
    table.register_native_with_arity("contains", 2, |args| match (&args[0], &args[1]) {
        (Value::String(s), Value::String(needle)) => Ok(Value::Bool(s.contains(needle.as_str()))),
        (Value::Array(arr), needle) => Ok(Value::Bool(arr.contains(needle))),
        (Value::Object(obj), Value::String(key)) => Ok(Value::Bool(obj.contains_key(key))),
        (haystack, _) => Err(format!("contains() cannot search {}", haystack.type_name())),
    });
}

/// starts_with(string, prefix), ends_with(string, suffix)
fn register_affixes(table: &mut NativeTable) {
    table.register_native_with_arity("starts_with", 2, |args| {
        let s = string(&args[0], "starts_with")?;
        Ok(Value::Bool(s.starts_with(string(&args[1], "starts_with")?)))
    });
    table.register_native_with_arity("ends_with", 2, |args| {
        let s = string(&args[0], "ends_with")?;
        Ok(Value::Bool(s.ends_with(string(&args[1], "ends_with")?)))
    });
}

/// replace(string, from, to) - every occurrence
fn register_replace(table: &mut NativeTable) {
    table.register_native_with_arity("replace", 3, |args| {
        let s = string(&args[0], "replace")?;
        let from = string(&args[1], "replace")?;
        let to = string(&args[2], "replace")?;
        if from.is_empty() {
            return Err("replace() pattern must not be empty".to_string());
        }
        Ok(Value::String(s.replace(from, to)))
    });
}

/// repeat(string, count)
fn register_repeat(table: &mut NativeTable) {
    table.register_native_with_arity("repeat", 2, |args| {
        let s = string(&args[0], "repeat")?;
        let count = match &args[1] {
            Value::Int(n) => usize::try_from(*n)
                .map_err(|_| "repeat() expects a non-negative count".to_string())?,
            _ => return Err("repeat() expects a non-negative count".to_string()),
        };
        match s.len().checked_mul(count) {
            Some(len) if len <= MAX_REPEAT_LEN => Ok(Value::String(s.repeat(count))),
            _ => Err("repeat() result too large".to_string()),
        }
    });
}

/// substr(string, start, length) - by characters
fn register_substr(table: &mut NativeTable) {
    table.register_native_with_arity("substr", 3, |args| {
        let s = string(&args[0], "substr")?;
        match (&args[1], &args[2]) {
            (Value::Int(start), Value::Int(len)) if *start >= 0 && *len >= 0 => Ok(Value::String(
                s.chars().skip(*start as usize).take(*len as usize).collect(),
            )),
            _ => Err("substr() expects non-negative start and length".to_string()),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{register, NativeTable};
    use crate::builtins::tests::eval;
    use crate::value::Value;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(eval("upper(\"abc\")"), s("ABC"));
        assert_eq!(eval("lower(\"AbC\")"), s("abc"));
        assert_eq!(eval("trim(\"  x  \")"), s("x"));
    }

    #[test]
    fn test_split_join() {
        assert_eq!(
            eval("split(\"a-b\", \"-\")"),
            Value::Array(vec![s("a"), s("b")])
        );
        assert_eq!(eval("join([1, 2, 3], \"+\")"), s("1+2+3"));
    }

    #[test]
    fn test_contains() {
        assert_eq!(eval("contains(\"hello\", \"ell\")"), Value::Bool(true));
        assert_eq!(eval("contains([1, 2], 3)"), Value::Bool(false));
        assert_eq!(eval("contains({ a: 1 }, \"a\")"), Value::Bool(true));
    }

    #[test]
    fn test_replace_repeat_substr() {
        assert_eq!(eval("replace(\"a.b.c\", \".\", \"/\")"), s("a/b/c"));
        assert_eq!(eval("repeat(\"ab\", 2)"), s("abab"));
        assert_eq!(eval("substr(\"behavior\", 2, 3)"), s("hav"));
        assert_eq!(eval("starts_with(\"on_update\", \"on_\")"), Value::Bool(true));
    }

    #[test]
    fn test_repeat_is_bounded() {
        let mut table = NativeTable::new();
        register(&mut table);
        let repeat = table.get("repeat").unwrap();

        let huge = repeat.call(vec![s("ab"), Value::Int(i64::MAX)]);
        assert_eq!(huge, Err("repeat() result too large".to_string()));
        assert!(repeat.call(vec![s("ab"), Value::Int(-1)]).is_err());
    }
}
