//! Collection built-in functions for VoidScript
//!
//! Arrays and objects are values: functions that "modify" a collection
//! return a new one.

use super::NativeTable;
use crate::value::Value;

/// Register collection functions
pub fn register(table: &mut NativeTable) {
    register_len(table);
    register_push(table);
    register_pop(table);
    register_first_last(table);
    register_keys_values(table);
    register_get(table);
    register_set(table);
    register_remove(table);
    register_range(table);
    register_reverse(table);
    register_sum(table);
}

/// len(collection) - Length of string, array or object
fn register_len(table: &mut NativeTable) {
    table.register_native_with_arity("len", 1, |args| match &args[0] {
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(arr) => Ok(Value::Int(arr.len() as i64)),
        Value::Object(obj) => Ok(Value::Int(obj.len() as i64)),
        other => Err(format!("Cannot get length of {}", other.type_name())),
    });
}

/// push(array, value) - Append value to array (returns new array)
fn register_push(table: &mut NativeTable) {
    table.register_native_with_arity("push", 2, |args| match &args[0] {
        Value::Array(arr) => {
            let mut new_arr = arr.clone();
            new_arr.push(args[1].clone());
            Ok(Value::Array(new_arr))
        }
        _ => Err("push() expects an array".to_string()),
    });
}

/// pop(array) - Remove last element (returns new array)
fn register_pop(table: &mut NativeTable) {
    table.register_native_with_arity("pop", 1, |args| match &args[0] {
        Value::Array(arr) if arr.is_empty() => Err("Cannot pop from empty array".to_string()),
        Value::Array(arr) => Ok(Value::Array(arr[..arr.len() - 1].to_vec())),
        _ => Err("pop() expects an array".to_string()),
    });
}

/// first(array), last(array) - null when empty
fn register_first_last(table: &mut NativeTable) {
    table.register_native_with_arity("first", 1, |args| match &args[0] {
        Value::Array(arr) => Ok(arr.first().cloned().unwrap_or(Value::Null)),
        _ => Err("first() expects an array".to_string()),
    });
    table.register_native_with_arity("last", 1, |args| match &args[0] {
        Value::Array(arr) => Ok(arr.last().cloned().unwrap_or(Value::Null)),
        _ => Err("last() expects an array".to_string()),
    });
}

/// keys(object), values(object) - sorted by key
fn register_keys_values(table: &mut NativeTable) {
    table.register_native_with_arity("keys", 1, |args| match &args[0] {
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            Ok(Value::Array(keys.into_iter().map(|k| Value::String(k.clone())).collect()))
        }
        _ => Err("keys() expects an object".to_string()),
    });
    table.register_native_with_arity("values", 1, |args| match &args[0] {
        Value::Object(obj) => {
            let mut entries: Vec<(&String, &Value)> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Ok(Value::Array(entries.into_iter().map(|(_, v)| v.clone()).collect()))
        }
        _ => Err("values() expects an object".to_string()),
    });
}

/// get(collection, key, default?) - Lookup with optional fallback
fn register_get(table: &mut NativeTable) {
    table.register_native("get", |args| {
        if args.len() < 2 || args.len() > 3 {
            return Err("get() expects 2 or 3 arguments".to_string());
        }
        let fallback = args.get(2).cloned().unwrap_or(Value::Null);
        let found = match (&args[0], &args[1]) {
            (Value::Object(obj), Value::String(key)) => obj.get(key).cloned(),
            (Value::Array(arr), Value::Int(i)) => usize::try_from(*i).ok().and_then(|i| arr.get(i).cloned()),
            (collection, _) => return Err(format!("get() cannot index {}", collection.type_name())),
        };
        Ok(found.unwrap_or(fallback))
    });
}

/// set(collection, key, value) - Returns the updated collection
fn register_set(table: &mut NativeTable) {
    table.register_native_with_arity("set", 3, |args| match (&args[0], &args[1]) {
        (Value::Object(obj), Value::String(key)) => {
            let mut updated = obj.clone();
            updated.insert(key.clone(), args[2].clone());
            Ok(Value::Object(updated))
        }
        (Value::Array(arr), Value::Int(i)) => {
            let index = usize::try_from(*i)
                .ok()
                .filter(|i| *i < arr.len())
                .ok_or_else(|| format!("set() index {} out of bounds", i))?;
            let mut updated = arr.clone();
            updated[index] = args[2].clone();
            Ok(Value::Array(updated))
        }
        (collection, _) => Err(format!("set() cannot index {}", collection.type_name())),
    });
}

/// remove(object, key) - Returns the object without key
fn register_remove(table: &mut NativeTable) {
    table.register_native_with_arity("remove", 2, |args| match (&args[0], &args[1]) {
        (Value::Object(obj), Value::String(key)) => {
            let mut updated = obj.clone();
            updated.remove(key);
            Ok(Value::Object(updated))
        }
        _ => Err("remove() expects an object and a string key".to_string()),
    });
}

/// range(end) or range(start, end) - Half-open integer range
fn register_range(table: &mut NativeTable) {
    table.register_native("range", |args| {
        let (start, end) = match args.as_slice() {
            [Value::Int(end)] => (0, *end),
            [Value::Int(start), Value::Int(end)] => (*start, *end),
            _ => return Err("range() expects one or two integers".to_string()),
        };
        if end.saturating_sub(start) > 1_000_000 {
            return Err("range() too large".to_string());
        }
        Ok(Value::Array((start..end).map(Value::Int).collect()))
    });
}

/// reverse(array)
fn register_reverse(table: &mut NativeTable) {
    table.register_native_with_arity("reverse", 1, |args| match &args[0] {
        Value::Array(arr) => Ok(Value::Array(arr.iter().rev().cloned().collect())),
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        _ => Err("reverse() expects an array or string".to_string()),
    });
}

/// sum(array) - Int when every element is an int
fn register_sum(table: &mut NativeTable) {
    table.register_native_with_arity("sum", 1, |args| {
        let Value::Array(arr) = &args[0] else {
            return Err("sum() expects an array".to_string());
        };
        if arr.iter().all(|v| matches!(v, Value::Int(_))) {
            let total = arr.iter().filter_map(Value::to_int).fold(0i64, i64::wrapping_add);
            return Ok(Value::Int(total));
        }
        let mut total = 0.0;
        for value in arr {
            if !value.is_number() {
                return Err(format!("sum() cannot add {}", value.type_name()));
            }
            total += value.to_float().unwrap_or(0.0);
        }
        Ok(Value::Float(total))
    });
}

#[cfg(test)]
mod tests {
    use crate::builtins::tests::eval;
    use crate::value::Value;

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_len() {
        assert_eq!(eval("len([1, 2, 3])"), Value::Int(3));
        assert_eq!(eval("len(\"héllo\")"), Value::Int(5));
        assert_eq!(eval("len({ a: 1 })"), Value::Int(1));
    }

    #[test]
    fn test_push_pop() {
        assert_eq!(eval("push([1], 2)"), ints(&[1, 2]));
        assert_eq!(eval("pop([1, 2])"), ints(&[1]));
        assert_eq!(eval("first([])"), Value::Null);
        assert_eq!(eval("last([1, 2])"), Value::Int(2));
    }

    #[test]
    fn test_object_functions() {
        assert_eq!(
            eval("keys({ b: 1, a: 2 })"),
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert_eq!(eval("values({ b: 1, a: 2 })"), ints(&[2, 1]));
        assert_eq!(eval("get({ a: 1 }, \"missing\", 7)"), Value::Int(7));
        assert_eq!(eval("get(set({ a: 1 }, \"a\", 5), \"a\")"), Value::Int(5));
        assert_eq!(eval("len(remove({ a: 1, b: 2 }, \"a\"))"), Value::Int(1));
    }

    #[test]
    fn test_range_reverse_sum() {
        assert_eq!(eval("range(3)"), ints(&[0, 1, 2]));
        assert_eq!(eval("range(2, 4)"), ints(&[2, 3]));
        assert_eq!(eval("reverse([1, 2])"), ints(&[2, 1]));
        assert_eq!(eval("sum([1, 2, 3])"), Value::Int(6));
        assert_eq!(eval("sum([1, 0.5])"), Value::Float(1.5));
    }
}
