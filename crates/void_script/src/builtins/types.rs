//! Type built-in functions for VoidScript
//!
//! Provides functions for type inspection and conversion:
//! - type: Get the type name of a value
//! - str, int, float, bool: Conversions
//! - is_null, is_number, is_string, is_array, is_object, is_function: Type checks

use super::NativeTable;
use crate::value::Value;

/// Register type functions
pub fn register(table: &mut NativeTable) {
    register_type(table);
    register_str(table);
    register_int(table);
    register_float(table);
    register_bool(table);
    register_checks(table);
}

/// type(value) - Get the type name of a value
fn register_type(table: &mut NativeTable) {
    table.register_native_with_arity("type", 1, |args| {
        Ok(Value::String(args[0].type_name().to_string()))
    });
}

/// str(value) - Convert value to string
fn register_str(table: &mut NativeTable) {
    table.register_native_with_arity("str", 1, |args| {
        Ok(Value::String(args[0].to_string_value()))
    });
}

/// int(value) - Convert value to integer
fn register_int(table: &mut NativeTable) {
    table.register_native_with_arity("int", 1, |args| match args[0].to_int() {
        Some(n) => Ok(Value::Int(n)),
        None => Err(format!("Cannot convert {} to int", args[0].type_name())),
    });
}

/// float(value) - Convert value to float
fn register_float(table: &mut NativeTable) {
    table.register_native_with_arity("float", 1, |args| match args[0].to_float() {
        Some(f) => Ok(Value::Float(f)),
        None => Err(format!("Cannot convert {} to float", args[0].type_name())),
    });
}

/// bool(value) - Convert value to boolean based on truthiness
fn register_bool(table: &mut NativeTable) {
    table.register_native_with_arity("bool", 1, |args| Ok(Value::Bool(args[0].is_truthy())));
}

/// is_null, is_number, is_string, is_array, is_object, is_function
fn register_checks(table: &mut NativeTable) {
    table.register_native_with_arity("is_null", 1, |args| Ok(Value::Bool(args[0].is_null())));
    table.register_native_with_arity("is_number", 1, |args| {
        Ok(Value::Bool(args[0].is_number()))
    });
    table.register_native_with_arity("is_string", 1, |args| {
        Ok(Value::Bool(matches!(args[0], Value::String(_))))
    });
    table.register_native_with_arity("is_array", 1, |args| {
        Ok(Value::Bool(matches!(args[0], Value::Array(_))))
    });
    table.register_native_with_arity("is_object", 1, |args| {
        Ok(Value::Bool(matches!(args[0], Value::Object(_))))
    });
    table.register_native_with_arity("is_function", 1, |args| {
        Ok(Value::Bool(args[0].is_callable()))
    });
}

#[cfg(test)]
mod tests {
    use crate::builtins::tests::eval;
    use crate::value::Value;

    #[test]
    fn test_type() {
        assert_eq!(eval("type(42)"), Value::String("int".to_string()));
        assert_eq!(eval("type(\"x\")"), Value::String("string".to_string()));
        assert_eq!(eval("type([1])"), Value::String("array".to_string()));
        assert_eq!(eval("type(null)"), Value::String("null".to_string()));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(eval("str(42)"), Value::String("42".to_string()));
        assert_eq!(eval("int(\"42\")"), Value::Int(42));
        assert_eq!(eval("int(3.9)"), Value::Int(3));
        assert_eq!(eval("float(2)"), Value::Float(2.0));
        assert_eq!(eval("bool(0)"), Value::Bool(false));
    }

    #[test]
    fn test_checks() {
        assert_eq!(eval("is_null(null)"), Value::Bool(true));
        assert_eq!(eval("is_number(1.5)"), Value::Bool(true));
        assert_eq!(eval("is_string(1)"), Value::Bool(false));
        assert_eq!(eval("is_function(abs)"), Value::Bool(true));
    }
}
