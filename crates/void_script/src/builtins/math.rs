//! Math built-in functions for VoidScript
//!
//! Integer inputs stay integers where the result is exact (abs, min, max,
//! clamp); everything else works in f64.

use super::NativeTable;
use crate::value::Value;

/// Register math functions
pub fn register(table: &mut NativeTable) {
    register_abs(table);
    register_sign(table);
    register_min_max(table);
    register_clamp(table);
    register_rounding(table);
    register_unary_float(table);
    register_pow(table);
    register_atan2(table);
    register_lerp(table);
    register_constants(table);
}

fn number(value: &Value, func: &str) -> Result<f64, String> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(format!("{}() expects a number, got {}", func, other.type_name())),
    }
}

/// abs(n) - Absolute value
fn register_abs(table: &mut NativeTable) {
    table.register_native_with_arity("abs", 1, |args| match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(format!("abs() expects a number, got {}", other.type_name())),
    });
}

/// sign(n) - -1, 0 or 1
fn register_sign(table: &mut NativeTable) {
    table.register_native_with_arity("sign", 1, |args| match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.signum())),
        Value::Float(f) if *f == 0.0 => Ok(Value::Float(0.0)),
        Value::Float(f) => Ok(Value::Float(f.signum())),
        other => Err(format!("sign() expects a number, got {}", other.type_name())),
    });
}

/// Pick the extreme of a list of numbers, keeping the original value
fn extreme(args: Vec<Value>, func: &str, prefer_left: fn(f64, f64) -> bool) -> Result<Value, String> {
    // A single array argument is treated as the list
    let values = match args.as_slice() {
        [Value::Array(arr)] => arr.clone(),
        _ => args,
    };

    let mut best: Option<(f64, Value)> = None;
    for value in values {
        let n = number(&value, func)?;
        let replace = match &best {
            Some((current, _)) => prefer_left(n, *current),
            None => true,
        };
        if replace {
            best = Some((n, value));
        }
    }

    best.map(|(_, value)| value)
        .ok_or_else(|| format!("{}() requires at least one number", func))
}

/// min(...args), max(...args)
fn register_min_max(table: &mut NativeTable) {
    table.register_native("min", |args| extreme(args, "min", |a, b| a < b));
    table.register_native("max", |args| extreme(args, "max", |a, b| a > b));
}

/// clamp(value, lo, hi)
fn register_clamp(table: &mut NativeTable) {
    table.register_native_with_arity("clamp", 3, |args| match (&args[0], &args[1], &args[2]) {
        (Value::Int(v), Value::Int(lo), Value::Int(hi)) if lo <= hi => {
            Ok(Value::Int((*v).clamp(*lo, *hi)))
        }
        (v, lo, hi) => {
            let (v, lo, hi) = (number(v, "clamp")?, number(lo, "clamp")?, number(hi, "clamp")?);
            if lo > hi {
                return Err("clamp() requires lo <= hi".to_string());
            }
            Ok(Value::Float(v.clamp(lo, hi)))
        }
    });
}

/// floor, ceil, round, trunc - float to integer
fn register_rounding(table: &mut NativeTable) {
    table.register_native_with_arity("floor", 1, |args| {
        Ok(Value::Int(number(&args[0], "floor")?.floor() as i64))
    });
    table.register_native_with_arity("ceil", 1, |args| {
        Ok(Value::Int(number(&args[0], "ceil")?.ceil() as i64))
    });
    table.register_native_with_arity("round", 1, |args| {
        Ok(Value::Int(number(&args[0], "round")?.round() as i64))
    });
    table.register_native_with_arity("trunc", 1, |args| {
        Ok(Value::Int(number(&args[0], "trunc")?.trunc() as i64))
    });
}

/// sqrt, sin, cos, tan, exp, ln
fn register_unary_float(table: &mut NativeTable) {
    table.register_native_with_arity("sqrt", 1, |args| {
        let n = number(&args[0], "sqrt")?;
        if n < 0.0 {
            return Err("sqrt() of a negative number".to_string());
        }
        Ok(Value::Float(n.sqrt()))
    });
    table.register_native_with_arity("sin", 1, |args| Ok(Value::Float(number(&args[0], "sin")?.sin())));
    table.register_native_with_arity("cos", 1, |args| Ok(Value::Float(number(&args[0], "cos")?.cos())));
    table.register_native_with_arity("tan", 1, |args| Ok(Value::Float(number(&args[0], "tan")?.tan())));
    table.register_native_with_arity("exp", 1, |args| Ok(Value::Float(number(&args[0], "exp")?.exp())));
    table.register_native_with_arity("ln", 1, |args| {
        let n = number(&args[0], "ln")?;
        if n <= 0.0 {
            return Err("ln() of a non-positive number".to_string());
        }
        Ok(Value::Float(n.ln()))
    });
}

/// pow(base, exp)
fn register_pow(table: &mut NativeTable) {
    table.register_native_with_arity("pow", 2, |args| match (&args[0], &args[1]) {
        (Value::Int(base), Value::Int(exp)) if *exp >= 0 => u32::try_from(*exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .map(Value::Int)
            .ok_or_else(|| "pow() overflow".to_string()),
        (base, exp) => Ok(Value::Float(number(base, "pow")?.powf(number(exp, "pow")?))),
    });
}

/// atan2(y, x)
fn register_atan2(table: &mut NativeTable) {
    table.register_native_with_arity("atan2", 2, |args| {
        Ok(Value::Float(number(&args[0], "atan2")?.atan2(number(&args[1], "atan2")?)))
    });
}

/// lerp(a, b, t)
fn register_lerp(table: &mut NativeTable) {
    table.register_native_with_arity("lerp", 3, |args| {
        let a = number(&args[0], "lerp")?;
        let b = number(&args[1], "lerp")?;
        let t = number(&args[2], "lerp")?;
        Ok(Value::Float(a + (b - a) * t))
    });
}

/// pi(), tau()
fn register_constants(table: &mut NativeTable) {
    table.register_native_with_arity("pi", 0, |_| Ok(Value::Float(std::f64::consts::PI)));
    table.register_native_with_arity("tau", 0, |_| Ok(Value::Float(std::f64::consts::TAU)));
}

#[cfg(test)]
mod tests {
    use crate::builtins::tests::eval;
    use crate::value::Value;

    #[test]
    fn test_abs_sign() {
        assert_eq!(eval("abs(-5)"), Value::Int(5));
        assert_eq!(eval("abs(-2.5)"), Value::Float(2.5));
        assert_eq!(eval("sign(-3)"), Value::Int(-1));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(eval("min(3, 1, 2)"), Value::Int(1));
        assert_eq!(eval("max(3, 1.5, 2)"), Value::Int(3));
        assert_eq!(eval("max([4, 9, 2])"), Value::Int(9));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(eval("clamp(5, 0, 3)"), Value::Int(3));
        assert_eq!(eval("clamp(-1.5, 0, 1)"), Value::Float(0.0));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(eval("floor(2.7)"), Value::Int(2));
        assert_eq!(eval("ceil(2.1)"), Value::Int(3));
        assert_eq!(eval("round(2.5)"), Value::Int(3));
    }

    #[test]
    fn test_pow_and_sqrt() {
        assert_eq!(eval("pow(2, 10)"), Value::Int(1024));
        assert_eq!(eval("pow(4, 0.5)"), Value::Float(2.0));
        assert_eq!(eval("sqrt(16)"), Value::Float(4.0));
    }

    #[test]
    fn test_lerp() {
        assert_eq!(eval("lerp(0, 10, 0.25)"), Value::Float(2.5));
    }
}
