//! # VoidScript
//!
//! A small scripting language for behaviors attached to engine entities:
//! - Variable bindings
//! - Functions and closures
//! - Control flow (if/else, loops)
//! - Behavior types with per-instance fields and callbacks
//! - Host modules imported with `use`
//!
//! ## Syntax Overview
//!
//! ```text
//! use core;
//!
//! let MAX_SPEED = 10.0;
//!
//! fn clamp_speed(v) {
//!     return clamp(v, 0.0, MAX_SPEED);
//! }
//!
//! behavior Mover {
//!     let speed = 1.0;
//!
//!     fn on_create() {
//!         print("created");
//!     }
//!
//!     fn on_update(dt) {
//!         self.speed = clamp_speed(self.speed + dt);
//!     }
//! }
//! ```
//!
//! Source units are parsed with [`parse_unit`]; executing them is up to
//! the host that links their imports.

pub mod ast;
pub mod builtins;
pub mod environment;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{BehaviorDecl, Expr, FunctionDecl, Item, Program, Span, Stmt};
pub use builtins::{standard_library, NativeTable};
pub use environment::{Environment, Scope};
pub use interpreter::{Interpreter, RuntimeError};
pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use value::{EntityRef, Function, NativeFunction, SerializableValue, Value};

use thiserror::Error;

/// VoidScript errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl ScriptError {
    /// Source location of a lexing or parsing failure
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lex(e) => Some(e.span),
            Self::Parse(e) => e.span(),
            Self::Runtime(_) => None,
        }
    }
}

/// Script execution result
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Lex and parse one source unit
pub fn parse_unit(source: &str) -> ScriptResult<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse()?)
}
