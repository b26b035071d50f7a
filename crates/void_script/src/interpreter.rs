//! Interpreter for VoidScript
//!
//! Executes AST nodes and manages runtime state.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::environment::{Environment, Scope};
use crate::value::{Function, Value};

/// Deepest allowed nesting of script calls
pub const MAX_CALL_DEPTH: usize = 64;

/// Runtime errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Cannot assign to module-level binding '{0}'")]
    ImmutableBinding(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Arity error: '{name}' expected {expected} arguments, got {got}")]
    ArityError {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Not callable: {0}")]
    NotCallable(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in {0}")]
    Overflow(&'static str),

    #[error("Index out of bounds: {index} (length {length})")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Native function error: {0}")]
    NativeError(String),

    #[error("Stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("Break outside loop")]
    BreakOutsideLoop,

    #[error("Continue outside loop")]
    ContinueOutsideLoop,
}

/// How a statement finished
enum Flow {
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// VoidScript interpreter
pub struct Interpreter {
    /// Variable environment
    environment: Environment,
    /// Current script call depth
    depth: usize,
}

impl Interpreter {
    /// Create an interpreter over a module's globals
    pub fn new(globals: Arc<Scope>) -> Self {
        Self {
            environment: Environment::with_globals(globals),
            depth: 0,
        }
    }

    /// Evaluate an expression against the globals
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.evaluate(expr)
    }

    /// Call any callable value
    pub fn call_function(&mut self, func: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match func {
            Value::Function(f) => self.invoke(f, None, args).map(|(result, _)| result),
            Value::Native(native) => native.call(args).map_err(RuntimeError::NativeError),
            other => Err(RuntimeError::NotCallable(other.type_name().to_string())),
        }
    }

    /// Call a method with `self` bound to `this`
    ///
    /// Returns the method's result together with the final value of
    /// `self`, carrying any field writes the method made.
    pub fn call_method(
        &mut self,
        method: &Function,
        this: Value,
        args: Vec<Value>,
    ) -> Result<(Value, Value), RuntimeError> {
        let (result, this) = self.invoke(method, Some(this), args)?;
        Ok((result, this.unwrap_or(Value::Null)))
    }

    fn invoke(
        &mut self,
        f: &Function,
        this: Option<Value>,
        args: Vec<Value>,
    ) -> Result<(Value, Option<Value>), RuntimeError> {
        if args.len() != f.params.len() {
            return Err(RuntimeError::ArityError {
                name: f.name.clone(),
                expected: f.params.len(),
                got: args.len(),
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH));
        }

        // Calls see the module globals, never the caller's locals
        let call_env = self.environment.child();
        let saved = std::mem::replace(&mut self.environment, call_env);
        self.depth += 1;

        if let Some(closure) = &f.closure {
            for (name, value) in closure.iter() {
                self.environment.define(name.clone(), value.clone());
            }
        }
        let has_self = this.is_some();
        if let Some(this) = this {
            self.environment.define("self", this);
        }
        for (param, arg) in f.params.iter().zip(args) {
            self.environment.define(param.clone(), arg);
        }

        let outcome = self.run_body(&f.body);
        let this = if has_self {
            self.environment.get("self")
        } else {
            None
        };

        self.depth -= 1;
        self.environment = saved;

        outcome.map(|result| (result, this))
    }

    fn run_body(&mut self, body: &[Stmt]) -> Result<Value, RuntimeError> {
        for stmt in body {
            match self.execute_stmt(stmt)? {
                Flow::Normal(_) => {}
                Flow::Return(value) => return Ok(value),
                Flow::Break => return Err(RuntimeError::BreakOutsideLoop),
                Flow::Continue => return Err(RuntimeError::ContinueOutsideLoop),
            }
        }
        Ok(Value::Null)
    }

    // === Statement execution ===

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => Ok(Flow::Normal(self.evaluate(expr)?)),

            Stmt::Let { name, value, .. } => {
                let val = self.evaluate(value)?;
                self.environment.define(name, val);
                Ok(Flow::Normal(Value::Null))
            }

            Stmt::Assign { name, value, .. } => {
                let val = self.evaluate(value)?;
                self.assign(name, val)?;
                Ok(Flow::Normal(Value::Null))
            }

            Stmt::AssignMember {
                object,
                member,
                value,
                ..
            } => {
                let val = self.evaluate(value)?;
                let target = self
                    .environment
                    .get(object)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(object.clone()))?;

                match target {
                    Value::Object(mut fields) => {
                        fields.insert(member.clone(), val);
                        self.assign(object, Value::Object(fields))?;
                        Ok(Flow::Normal(Value::Null))
                    }
                    other => Err(RuntimeError::TypeError(format!(
                        "Cannot assign field '{}' on {}",
                        member,
                        other.type_name()
                    ))),
                }
            }

            Stmt::Block(statements) => self.execute_block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_stmt(then_branch)
                } else if let Some(else_br) = else_branch {
                    self.execute_stmt(else_br)
                } else {
                    Ok(Flow::Normal(Value::Null))
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_stmt(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal(_) | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }

            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                let iter_value = self.evaluate(iterable)?;
                let items = match iter_value {
                    Value::Array(arr) => arr,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    _ => {
                        return Err(RuntimeError::TypeError(format!(
                            "Cannot iterate over {}",
                            iter_value.type_name()
                        )));
                    }
                };

                self.environment.push_scope();
                let mut flow = Flow::Normal(Value::Null);
                for item in items {
                    self.environment.define(variable, item);
                    match self.execute_stmt(body) {
                        Ok(Flow::Break) => break,
                        Ok(Flow::Return(value)) => {
                            flow = Flow::Return(value);
                            break;
                        }
                        Ok(Flow::Normal(_) | Flow::Continue) => {}
                        Err(e) => {
                            self.environment.pop_scope();
                            return Err(e);
                        }
                    }
                }
                self.environment.pop_scope();
                Ok(flow)
            }

            Stmt::Function(decl) => {
                let func = Function::with_closure(
                    decl.name.clone(),
                    decl.params.clone(),
                    Arc::new(decl.body.clone()),
                    self.environment.snapshot(),
                );
                self.environment.define(&decl.name, Value::Function(func));
                Ok(Flow::Normal(Value::Null))
            }

            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Break => Ok(Flow::Break),

            Stmt::Continue => Ok(Flow::Continue),
        }
    }

    fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        self.environment.push_scope();
        let mut flow = Flow::Normal(Value::Null);

        for stmt in statements {
            match self.execute_stmt(stmt) {
                Ok(Flow::Normal(value)) => flow = Flow::Normal(value),
                Ok(other) => {
                    flow = other;
                    break;
                }
                Err(e) => {
                    self.environment.pop_scope();
                    return Err(e);
                }
            }
        }

        self.environment.pop_scope();
        Ok(flow)
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if self.environment.set(name, value) {
            Ok(())
        } else if self.environment.is_global(name) {
            Err(RuntimeError::ImmutableBinding(name.to_string()))
        } else {
            Err(RuntimeError::UndefinedVariable(name.to_string()))
        }
    }

    // === Expression evaluation ===

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(literal.to_value()),

            Expr::Ident { name, .. } => self
                .environment
                .get(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),

            // Logical operators short-circuit
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => {
                let lhs = self.evaluate(left)?;
                if !lhs.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right)?.is_truthy()))
            }

            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } => {
                let lhs = self.evaluate(left)?;
                if lhs.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(right)?.is_truthy()))
            }

            Expr::Binary { left, op, right } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                self.eval_binary(lhs, *op, rhs)
            }

            Expr::Unary { op, expr } => {
                let value = self.evaluate(expr)?;
                self.eval_unary(*op, value)
            }

            Expr::Call { callee, args, .. } => {
                let func = self.evaluate(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_function(&func, arg_values)
            }

            Expr::Index { object, index } => {
                let obj = self.evaluate(object)?;
                let idx = self.evaluate(index)?;
                self.eval_index(obj, idx)
            }

            Expr::Member { object, member } => {
                let obj = self.evaluate(object)?;
                self.eval_member(obj, member)
            }

            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for elem in elements {
                    values.push(self.evaluate(elem)?);
                }
                Ok(Value::Array(values))
            }

            Expr::Object(pairs) => {
                let mut map = HashMap::new();
                for (key, value_expr) in pairs {
                    let value = self.evaluate(value_expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }

            Expr::Lambda { params, body } => {
                // Lambda body is a single expression, wrapped in a return
                let func = Function::with_closure(
                    "<lambda>",
                    params.clone(),
                    Arc::new(vec![Stmt::Return(Some((**body).clone()))]),
                    self.environment.snapshot(),
                );
                Ok(Value::Function(func))
            }
        }
    }

    fn eval_binary(&self, lhs: Value, op: BinaryOp, rhs: Value) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Add => match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b.to_string_value()))),
                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a.to_string_value(), b))),
                (Value::Array(a), Value::Array(b)) => {
                    let mut result = a.clone();
                    result.extend(b.iter().cloned());
                    Ok(Value::Array(result))
                }
                _ => self
                    .float_pair(&lhs, &rhs)
                    .map(|(a, b)| Value::Float(a + b))
                    .ok_or_else(|| self.type_error("add", &lhs, &rhs)),
            },

            BinaryOp::Sub => match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
                _ => self
                    .float_pair(&lhs, &rhs)
                    .map(|(a, b)| Value::Float(a - b))
                    .ok_or_else(|| self.type_error("subtract", &lhs, &rhs)),
            },

            BinaryOp::Mul => match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
                (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                    let count = usize::try_from(*n).map_err(|_| {
                        RuntimeError::TypeError("Cannot repeat a string a negative number of times".into())
                    })?;
                    Ok(Value::String(s.repeat(count)))
                }
                _ => self
                    .float_pair(&lhs, &rhs)
                    .map(|(a, b)| Value::Float(a * b))
                    .ok_or_else(|| self.type_error("multiply", &lhs, &rhs)),
            },

            BinaryOp::Div => match (&lhs, &rhs) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
                (Value::Int(a), Value::Int(b)) => a
                    .checked_div(*b)
                    .map(Value::Int)
                    .ok_or(RuntimeError::Overflow("division")),
                _ => match self.float_pair(&lhs, &rhs) {
                    Some((_, b)) if b == 0.0 => Err(RuntimeError::DivisionByZero),
                    Some((a, b)) => Ok(Value::Float(a / b)),
                    None => Err(self.type_error("divide", &lhs, &rhs)),
                },
            },

            BinaryOp::Mod => match (&lhs, &rhs) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
                (Value::Int(a), Value::Int(b)) => a
                    .checked_rem(*b)
                    .map(Value::Int)
                    .ok_or(RuntimeError::Overflow("modulo")),
                _ => match self.float_pair(&lhs, &rhs) {
                    Some((_, b)) if b == 0.0 => Err(RuntimeError::DivisionByZero),
                    Some((a, b)) => Ok(Value::Float(a % b)),
                    None => Err(self.type_error("modulo", &lhs, &rhs)),
                },
            },

            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),

            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                    _ => self
                        .float_pair(&lhs, &rhs)
                        .and_then(|(a, b)| a.partial_cmp(&b)),
                };
                let ordering = ordering.ok_or_else(|| self.type_error("compare", &lhs, &rhs))?;
                let result = match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }

            BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
            BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
        }
    }

    /// Both operands as floats when both are numeric
    fn float_pair(&self, lhs: &Value, rhs: &Value) -> Option<(f64, f64)> {
        if lhs.is_number() && rhs.is_number() {
            Some((lhs.to_float()?, rhs.to_float()?))
        } else {
            None
        }
    }

    fn type_error(&self, verb: &str, lhs: &Value, rhs: &Value) -> RuntimeError {
        RuntimeError::TypeError(format!(
            "Cannot {} {} and {}",
            verb,
            lhs.type_name(),
            rhs.type_name()
        ))
    }

    fn eval_unary(&self, op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
        match op {
            UnaryOp::Neg => match value {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Float(f) => Ok(Value::Float(-f)),
                _ => Err(RuntimeError::TypeError(format!(
                    "Cannot negate {}",
                    value.type_name()
                ))),
            },
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn eval_index(&self, object: Value, index: Value) -> Result<Value, RuntimeError> {
        match object {
            Value::Array(arr) => {
                let idx = match index {
                    Value::Int(i) => i,
                    _ => {
                        return Err(RuntimeError::TypeError(
                            "Array index must be an integer".to_string(),
                        ))
                    }
                };

                resolve_index(idx, arr.len())
                    .and_then(|i| arr.get(i).cloned())
                    .ok_or(RuntimeError::IndexOutOfBounds {
                        index: idx,
                        length: arr.len(),
                    })
            }

            Value::String(s) => {
                let idx = match index {
                    Value::Int(i) => i,
                    _ => {
                        return Err(RuntimeError::TypeError(
                            "String index must be an integer".to_string(),
                        ))
                    }
                };

                let chars: Vec<char> = s.chars().collect();
                resolve_index(idx, chars.len())
                    .and_then(|i| chars.get(i))
                    .map(|c| Value::String(c.to_string()))
                    .ok_or(RuntimeError::IndexOutOfBounds {
                        index: idx,
                        length: chars.len(),
                    })
            }

            Value::Object(obj) => {
                let key = match index {
                    Value::String(s) => s,
                    _ => {
                        return Err(RuntimeError::TypeError(
                            "Object key must be a string".to_string(),
                        ))
                    }
                };

                obj.get(&key)
                    .cloned()
                    .ok_or(RuntimeError::PropertyNotFound(key))
            }

            _ => Err(RuntimeError::TypeError(format!(
                "Cannot index {}",
                object.type_name()
            ))),
        }
    }

    fn eval_member(&self, object: Value, member: &str) -> Result<Value, RuntimeError> {
        match object {
            Value::Object(obj) => obj
                .get(member)
                .cloned()
                .ok_or(RuntimeError::PropertyNotFound(member.to_string())),

            Value::Entity(entity) => match member {
                "id" => Ok(Value::Int(entity.id as i64)),
                "generation" => Ok(Value::Int(entity.generation as i64)),
                _ => Err(RuntimeError::PropertyNotFound(member.to_string())),
            },

            Value::Array(arr) => match member {
                "length" | "len" => Ok(Value::Int(arr.len() as i64)),
                _ => Err(RuntimeError::PropertyNotFound(member.to_string())),
            },

            Value::String(s) => match member {
                "length" | "len" => Ok(Value::Int(s.chars().count() as i64)),
                _ => Err(RuntimeError::PropertyNotFound(member.to_string())),
            },

            _ => Err(RuntimeError::TypeError(format!(
                "Cannot access member on {}",
                object.type_name()
            ))),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Arc::new(Scope::new()))
    }
}

/// Map a possibly negative index onto 0..len
fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    let actual = if idx < 0 { len as i64 + idx } else { idx };
    usize::try_from(actual).ok().filter(|i| *i < len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Item;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::value::{EntityRef, NativeFunction};

    /// Define the unit's functions over `globals` and call its `main`
    fn run_with(mut globals: Scope, source: &str) -> Result<Value, RuntimeError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        for item in &program.items {
            if let Item::Function(decl) = item {
                let function =
                    Function::new(decl.name.clone(), decl.params.clone(), Arc::new(decl.body.clone()));
                globals.define(decl.name.clone(), Value::Function(function));
            }
        }
        let main = globals.get("main").cloned().expect("unit defines main");
        Interpreter::new(Arc::new(globals)).call_function(&main, Vec::new())
    }

    fn run(source: &str) -> Result<Value, RuntimeError> {
        run_with(Scope::new(), source)
    }

    fn eval(expr: &str) -> Result<Value, RuntimeError> {
        run(&format!("fn main() {{ return {}; }}", expr))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3").unwrap(), Value::Int(5));
        assert_eq!(eval("10 - 4").unwrap(), Value::Int(6));
        assert_eq!(eval("3 * 4").unwrap(), Value::Int(12));
        assert_eq!(eval("15 / 3").unwrap(), Value::Int(5));
        assert_eq!(eval("17 % 5").unwrap(), Value::Int(2));
        assert_eq!(eval("1 + 0.5").unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Int(14));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), Value::Int(20));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("5 > 3").unwrap(), Value::Bool(true));
        assert_eq!(eval("5 < 3").unwrap(), Value::Bool(false));
        assert_eq!(eval("5 <= 5.0").unwrap(), Value::Bool(true));
        assert_eq!(eval("5 == 5").unwrap(), Value::Bool(true));
        assert_eq!(eval("5 != 5").unwrap(), Value::Bool(false));
        assert!(matches!(eval("1 < \"a\""), Err(RuntimeError::TypeError(_))));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(eval("true && true").unwrap(), Value::Bool(true));
        assert_eq!(eval("false || true").unwrap(), Value::Bool(true));
        assert_eq!(eval("!true").unwrap(), Value::Bool(false));
        // The right-hand side would fail if evaluated
        assert_eq!(eval("false && missing").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || missing").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            eval(r#""hello" + " " + "world""#).unwrap(),
            Value::String("hello world".to_string())
        );
        assert_eq!(eval(r#""n=" + 3"#).unwrap(), Value::String("n=3".to_string()));
    }

    #[test]
    fn test_locals() {
        assert_eq!(run("fn main() { let x = 10; return x + 5; }").unwrap(), Value::Int(15));
        assert_eq!(run("fn main() { let x = 10; }").unwrap(), Value::Null);
    }

    #[test]
    fn test_function_call() {
        let code = r#"
            fn double(x) {
                return x * 2;
            }
            fn main() { return double(5); }
        "#;
        assert_eq!(run(code).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_return_inside_loop() {
        let code = r#"
            fn first_over(items, limit) {
                for item in items {
                    if item > limit {
                        return item;
                    }
                }
                return null;
            }
            fn main() { return first_over([1, 5, 9], 4); }
        "#;
        assert_eq!(run(code).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_while_loop() {
        let code = r#"
            fn main() {
                let sum = 0;
                let i = 0;
                while true {
                    i = i + 1;
                    if i > 5 { break; }
                    if i == 3 { continue; }
                    sum = sum + i;
                }
                return sum;
            }
        "#;
        assert_eq!(run(code).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_calls_do_not_see_caller_locals() {
        let code = r#"
            fn main() {
                let secret = 1;
                fn peek() { return secret; }
                return peek();
            }
        "#;
        // `peek` captured `secret` at definition, so this succeeds
        assert_eq!(run(code).unwrap(), Value::Int(1));

        let code = r#"
            fn main() {
                fn peek() { return hidden; }
                let hidden = 2;
                return peek();
            }
        "#;
        assert!(matches!(run(code), Err(RuntimeError::UndefinedVariable(name)) if name == "hidden"));

        let code = r#"
            fn peek() { return local; }
            fn main() { let local = 3; return peek(); }
        "#;
        assert!(matches!(run(code), Err(RuntimeError::UndefinedVariable(name)) if name == "local"));
    }

    #[test]
    fn test_lambda_closure() {
        let code = r#"
            fn main() {
                let base = 10;
                let add = |x| x + base;
                return add(5);
            }
        "#;
        assert_eq!(run(code).unwrap(), Value::Int(15));
    }

    #[test]
    fn test_method_binds_self() {
        let tokens = Lexer::new("fn bump(step) { self.count = self.count + step; return self.count; }")
            .tokenize()
            .unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let decl = program.functions().next().unwrap();
        let method = Function::new("bump", decl.params.clone(), Arc::new(decl.body.clone()));
        let this = Value::Object(HashMap::from([("count".to_string(), Value::Int(1))]));

        let mut interpreter = Interpreter::default();
        let (result, this) = interpreter
            .call_method(&method, this, vec![Value::Int(2)])
            .unwrap();

        assert_eq!(result, Value::Int(3));
        assert!(matches!(this, Value::Object(fields) if fields.get("count") == Some(&Value::Int(3))));
    }

    #[test]
    fn test_globals_are_immutable() {
        let mut scope = Scope::new();
        scope.define("LIMIT", Value::Int(3));

        assert_eq!(
            run_with(scope, "fn main() { LIMIT = 4; }"),
            Err(RuntimeError::ImmutableBinding("LIMIT".into()))
        );
    }

    #[test]
    fn test_stack_overflow() {
        let code = r#"
            fn forever(n) { return forever(n + 1); }
            fn main() { return forever(0); }
        "#;
        assert_eq!(run(code), Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH)));
    }

    #[test]
    fn test_array_and_object() {
        assert_eq!(eval("[1, 2, 3][1]").unwrap(), Value::Int(2));
        assert_eq!(eval("[1, 2, 3][-1]").unwrap(), Value::Int(3));
        assert_eq!(eval("[1, 2, 3].len").unwrap(), Value::Int(3));
        assert_eq!(eval("{ x: 10, y: 20 }.x").unwrap(), Value::Int(10));
        assert!(matches!(
            eval("[1][-5]"),
            Err(RuntimeError::IndexOutOfBounds { index: -5, length: 1 })
        ));
    }

    #[test]
    fn test_entity_members() {
        let mut scope = Scope::new();
        scope.define("e", Value::Entity(EntityRef::new(4, 2)));
        assert_eq!(
            run_with(scope, "fn main() { return e.id + e.generation; }").unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_native_function() {
        let mut scope = Scope::new();
        let triple = NativeFunction::new("triple", -1, |args| match args.first() {
            Some(Value::Int(n)) => Ok(Value::Int(n * 3)),
            _ => Err("Expected integer".to_string()),
        });
        scope.define("triple", Value::Native(triple));

        assert_eq!(run_with(scope, "fn main() { return triple(7); }").unwrap(), Value::Int(21));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(eval("10 / 0"), Err(RuntimeError::DivisionByZero)));
        assert!(matches!(eval("1.0 % 0"), Err(RuntimeError::DivisionByZero)));
    }

    #[test]
    fn test_undefined_variable() {
        assert!(matches!(eval("undefined_var"), Err(RuntimeError::UndefinedVariable(_))));
    }
}
