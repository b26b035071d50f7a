//! Abstract Syntax Tree for VoidScript
//!
//! Defines the AST nodes for source units, behaviors, statements and
//! expressions. Every node is serializable so a compiled unit can be
//! carried inside a module image.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Line/column position in a source unit (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parsed source unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Host modules imported with `use`
    pub fn imports(&self) -> impl Iterator<Item = (&str, Span)> {
        self.items.iter().filter_map(|item| match item {
            Item::Use { module, span } => Some((module.as_str(), *span)),
            _ => None,
        })
    }

    /// Behavior declarations in this unit
    pub fn behaviors(&self) -> impl Iterator<Item = &BehaviorDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Behavior(decl) => Some(decl),
            _ => None,
        })
    }

    /// Free function declarations in this unit
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(decl) => Some(decl),
            _ => None,
        })
    }
}

/// Top-level item of a source unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// Host module import: use core;
    Use { module: String, span: Span },

    /// Module-level constant: let name = expr;
    Const { name: String, value: Expr, span: Span },

    /// Free function visible to every unit
    Function(FunctionDecl),

    /// Behavior type: behavior Name { fields and methods }
    Behavior(BehaviorDecl),
}

/// Function or method declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Per-instance field with its initializer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// Behavior type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub span: Span,
}

impl BehaviorDecl {
    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&FunctionDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Statement types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression statement
    Expr(Expr),

    /// Variable declaration: let x = expr;
    Let { name: String, value: Expr, span: Span },

    /// Assignment: x = expr;
    Assign { name: String, value: Expr, span: Span },

    /// Field assignment: object.member = expr;
    AssignMember {
        object: String,
        member: String,
        value: Expr,
        span: Span,
    },

    /// Block: { statements }
    Block(Vec<Stmt>),

    /// If statement: if cond { } else { }
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// While loop: while cond { }
    While { condition: Expr, body: Box<Stmt> },

    /// For loop: for x in iter { }
    For {
        variable: String,
        iterable: Expr,
        body: Box<Stmt>,
    },

    /// Local function declaration: fn name(params) { }
    Function(FunctionDecl),

    /// Return statement: return expr;
    Return(Option<Expr>),

    /// Break statement
    Break,

    /// Continue statement
    Continue,
}

/// Literal constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Runtime value of this literal
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::Int(*n),
            Self::Float(f) => Value::Float(*f),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

/// Expression types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),

    /// Variable reference
    Ident { name: String, span: Span },

    /// Binary operation: left op right
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Function call: callee(args)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// Index access: expr[index]
    Index { object: Box<Expr>, index: Box<Expr> },

    /// Member access: expr.member
    Member { object: Box<Expr>, member: String },

    /// Array literal: [a, b, c]
    Array(Vec<Expr>),

    /// Object literal: { key: value }
    Object(Vec<(String, Expr)>),

    /// Lambda: |params| expr
    Lambda { params: Vec<String>, body: Box<Expr> },
}

impl Expr {
    /// Shorthand for an identifier expression
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::Ident {
            name: name.into(),
            span,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Get operator precedence (higher = binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }

    /// Get operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation: -x
    Neg,
    /// Logical not: !x
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}
