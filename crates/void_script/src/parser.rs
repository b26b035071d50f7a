//! Parser for VoidScript
//!
//! Converts a stream of tokens into an AST.

use thiserror::Error;

use crate::ast::{
    BehaviorDecl, BinaryOp, Expr, FieldDecl, FunctionDecl, Item, Literal, Program, Span, Stmt,
    UnaryOp,
};
use crate::lexer::{Token, TokenKind};

/// Parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected {found} at {span}")]
    UnexpectedToken { found: String, span: Span },

    #[error("{expected}, found {found} at {span}")]
    Expected {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Invalid assignment target at {span}")]
    InvalidAssignment { span: Span },

    #[error("Too many arguments (max 255) at {span}")]
    TooManyArguments { span: Span },

    #[error("Too many parameters (max 255) at {span}")]
    TooManyParameters { span: Span },
}

impl ParseError {
    /// Location of the failure, if known
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::Expected { span, .. }
            | Self::InvalidAssignment { span }
            | Self::TooManyArguments { span }
            | Self::TooManyParameters { span } => Some(*span),
            Self::UnexpectedEof => None,
        }
    }
}

/// Parser for VoidScript
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a new parser
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse a source unit made of top-level items
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();

        while !self.is_at_end() {
            items.push(self.item()?);
        }

        Ok(Program::new(items))
    }

    // === Item parsing ===

    fn item(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();

        if self.match_token(&[TokenKind::Use]) {
            let module = self.consume_ident("Expected module name after 'use'")?;
            self.consume(&TokenKind::Semicolon, "Expected ';' after use declaration")?;
            Ok(Item::Use { module, span })
        } else if self.match_token(&[TokenKind::Let]) {
            let (name, value) = self.binding()?;
            Ok(Item::Const { name, value, span })
        } else if self.match_token(&[TokenKind::Fn]) {
            Ok(Item::Function(self.function(span)?))
        } else if self.match_token(&[TokenKind::Behavior]) {
            Ok(Item::Behavior(self.behavior(span)?))
        } else {
            Err(self.expected("Expected 'use', 'let', 'fn' or 'behavior'"))
        }
    }

    fn behavior(&mut self, span: Span) -> Result<BehaviorDecl, ParseError> {
        let name = self.consume_ident("Expected behavior name")?;
        self.consume(&TokenKind::LBrace, "Expected '{' after behavior name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let member_span = self.current_span();
            if self.match_token(&[TokenKind::Let]) {
                let (name, value) = self.binding()?;
                fields.push(FieldDecl {
                    name,
                    value,
                    span: member_span,
                });
            } else if self.match_token(&[TokenKind::Fn]) {
                methods.push(self.function(member_span)?);
            } else {
                return Err(self.expected("Expected 'let' or 'fn' in behavior body"));
            }
        }

        self.consume(&TokenKind::RBrace, "Expected '}' after behavior body")?;

        Ok(BehaviorDecl {
            name,
            fields,
            methods,
            span,
        })
    }

    // === Declaration parsing ===

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        let span = self.current_span();

        if self.match_token(&[TokenKind::Let]) {
            let (name, value) = self.binding()?;
            Ok(Stmt::Let { name, value, span })
        } else if self.match_token(&[TokenKind::Fn]) {
            Ok(Stmt::Function(self.function(span)?))
        } else {
            self.statement()
        }
    }

    /// name = expr;
    fn binding(&mut self) -> Result<(String, Expr), ParseError> {
        let name = self.consume_ident("Expected variable name")?;

        self.consume(&TokenKind::Eq, "Expected '=' after variable name")?;
        let value = self.expression()?;
        self.consume(&TokenKind::Semicolon, "Expected ';' after variable declaration")?;

        Ok((name, value))
    }

    fn function(&mut self, span: Span) -> Result<FunctionDecl, ParseError> {
        let name = self.consume_ident("Expected function name")?;

        self.consume(&TokenKind::LParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if params.len() >= 255 {
                    return Err(ParseError::TooManyParameters {
                        span: self.current_span(),
                    });
                }
                params.push(self.consume_ident("Expected parameter name")?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        self.consume(&TokenKind::RParen, "Expected ')' after parameters")?;
        self.consume(&TokenKind::LBrace, "Expected '{' before function body")?;

        let body = self.block_statements()?;

        Ok(FunctionDecl {
            name,
            params,
            body,
            span,
        })
    }

    // === Statement parsing ===

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&[TokenKind::If]) {
            self.if_statement()
        } else if self.match_token(&[TokenKind::While]) {
            self.while_statement()
        } else if self.match_token(&[TokenKind::For]) {
            self.for_statement()
        } else if self.match_token(&[TokenKind::Return]) {
            self.return_statement()
        } else if self.match_token(&[TokenKind::Break]) {
            self.consume(&TokenKind::Semicolon, "Expected ';' after 'break'")?;
            Ok(Stmt::Break)
        } else if self.match_token(&[TokenKind::Continue]) {
            self.consume(&TokenKind::Semicolon, "Expected ';' after 'continue'")?;
            Ok(Stmt::Continue)
        } else if self.match_token(&[TokenKind::LBrace]) {
            Ok(Stmt::Block(self.block_statements()?))
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let condition = self.expression()?;
        self.consume(&TokenKind::LBrace, "Expected '{' after if condition")?;
        let then_branch = Box::new(Stmt::Block(self.block_statements()?));

        let else_branch = if self.match_token(&[TokenKind::Else]) {
            if self.match_token(&[TokenKind::If]) {
                Some(Box::new(self.if_statement()?))
            } else {
                self.consume(&TokenKind::LBrace, "Expected '{' after 'else'")?;
                Some(Box::new(Stmt::Block(self.block_statements()?)))
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let condition = self.expression()?;
        self.consume(&TokenKind::LBrace, "Expected '{' after while condition")?;
        let body = Box::new(Stmt::Block(self.block_statements()?));

        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let variable = self.consume_ident("Expected variable name")?;
        self.consume(&TokenKind::In, "Expected 'in' after variable")?;
        let iterable = self.expression()?;
        self.consume(&TokenKind::LBrace, "Expected '{' after iterable")?;
        let body = Box::new(Stmt::Block(self.block_statements()?));

        Ok(Stmt::For {
            variable,
            iterable,
            body,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = if !self.check(&TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenKind::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt::Return(value))
    }

    fn block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenKind::RBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.current_span();
        let expr = self.expression()?;

        if self.match_token(&[TokenKind::Eq]) {
            let value = self.expression()?;
            self.consume(&TokenKind::Semicolon, "Expected ';' after assignment")?;

            match expr {
                Expr::Ident { name, .. } => Ok(Stmt::Assign { name, value, span }),
                Expr::Member { object, member } => match *object {
                    Expr::Ident { name, .. } => Ok(Stmt::AssignMember {
                        object: name,
                        member,
                        value,
                        span,
                    }),
                    _ => Err(ParseError::InvalidAssignment { span }),
                },
                _ => Err(ParseError::InvalidAssignment { span }),
            }
        } else {
            self.consume(&TokenKind::Semicolon, "Expected ';' after expression")?;
            Ok(Stmt::Expr(expr))
        }
    }

    // === Expression parsing (Pratt parser) ===

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_precedence(1)
    }

    fn parse_precedence(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;

        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }

            self.advance();
            let right = self.parse_precedence(precedence + 1)?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenKind::Bang]) {
            let expr = self.unary()?;
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            })
        } else if self.match_token(&[TokenKind::Minus]) {
            let expr = self.unary()?;
            Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            let span = self.current_span();
            if self.match_token(&[TokenKind::LParen]) {
                expr = self.finish_call(expr, span)?;
            } else if self.match_token(&[TokenKind::Dot]) {
                let member = self.consume_ident("Expected property name after '.'")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    member,
                };
            } else if self.match_token(&[TokenKind::LBracket]) {
                let index = self.expression()?;
                self.consume(&TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr, span: Span) -> Result<Expr, ParseError> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RParen) {
            loop {
                if args.len() >= 255 {
                    return Err(ParseError::TooManyArguments {
                        span: self.current_span(),
                    });
                }
                args.push(self.expression()?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        self.consume(&TokenKind::RParen, "Expected ')' after arguments")?;

        let span = match &callee {
            Expr::Ident { span, .. } => *span,
            _ => span,
        };

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();

        // Literals
        if let Some(token) = self.advance_if(|k| {
            matches!(
                k,
                TokenKind::Int(_)
                    | TokenKind::Float(_)
                    | TokenKind::String(_)
                    | TokenKind::Bool(_)
                    | TokenKind::Null
            )
        }) {
            let literal = match token.kind {
                TokenKind::Int(n) => Literal::Int(n),
                TokenKind::Float(f) => Literal::Float(f),
                TokenKind::String(s) => Literal::String(s),
                TokenKind::Bool(b) => Literal::Bool(b),
                _ => Literal::Null,
            };
            return Ok(Expr::Literal(literal));
        }

        // Identifier
        if let Some(token) = self.advance_if(|k| matches!(k, TokenKind::Ident(_))) {
            if let TokenKind::Ident(name) = token.kind {
                return Ok(Expr::Ident { name, span });
            }
        }

        // Grouped expression
        if self.match_token(&[TokenKind::LParen]) {
            let expr = self.expression()?;
            self.consume(&TokenKind::RParen, "Expected ')' after expression")?;
            return Ok(expr);
        }

        // Array literal
        if self.match_token(&[TokenKind::LBracket]) {
            return self.array_literal();
        }

        // Object literal
        if self.match_token(&[TokenKind::LBrace]) {
            return self.object_literal();
        }

        // Lambda: |params| expr
        if self.match_token(&[TokenKind::Pipe]) {
            return self.lambda();
        }

        // Lambda without parameters: || expr
        if self.match_token(&[TokenKind::Or]) {
            let body = self.expression()?;
            return Ok(Expr::Lambda {
                params: Vec::new(),
                body: Box::new(body),
            });
        }

        Err(self.unexpected())
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elements = Vec::new();

        if !self.check(&TokenKind::RBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
                // Allow trailing comma
                if self.check(&TokenKind::RBracket) {
                    break;
                }
            }
        }

        self.consume(&TokenKind::RBracket, "Expected ']' after array elements")?;
        Ok(Expr::Array(elements))
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = Vec::new();

        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.consume_ident("Expected property name")?;
                self.consume(&TokenKind::Colon, "Expected ':' after property name")?;
                let value = self.expression()?;
                pairs.push((key, value));

                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
                // Allow trailing comma
                if self.check(&TokenKind::RBrace) {
                    break;
                }
            }
        }

        self.consume(&TokenKind::RBrace, "Expected '}' after object")?;
        Ok(Expr::Object(pairs))
    }

    fn lambda(&mut self) -> Result<Expr, ParseError> {
        // Already consumed the opening |
        let mut params = Vec::new();

        if !self.check(&TokenKind::Pipe) {
            loop {
                params.push(self.consume_ident("Expected parameter name")?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        self.consume(&TokenKind::Pipe, "Expected '|' after lambda parameters")?;

        let body = self.expression()?;

        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    // === Helper methods ===

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let token = self.peek()?;
        match &token.kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::BangEq => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::Ge),
            TokenKind::And => Some(BinaryOp::And),
            TokenKind::Or => Some(BinaryOp::Or),
            _ => None,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn current_span(&self) -> Span {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(Token::span)
            .unwrap_or_default()
    }

    fn found(&self) -> String {
        self.peek()
            .map(|t| t.kind.describe())
            .unwrap_or_else(|| "end of file".to_string())
    }

    fn expected(&self, message: &str) -> ParseError {
        ParseError::Expected {
            expected: message.to_string(),
            found: self.found(),
            span: self.current_span(),
        }
    }

    fn unexpected(&self) -> ParseError {
        if self.is_at_end() {
            return ParseError::UnexpectedEof;
        }
        ParseError::UnexpectedToken {
            found: self.found(),
            span: self.current_span(),
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek()
            .map(|t| matches!(t.kind, TokenKind::Eof))
            .unwrap_or(true)
    }

    fn advance(&mut self) -> Option<Token> {
        if !self.is_at_end() {
            self.current += 1;
            self.tokens.get(self.current - 1).cloned()
        } else {
            None
        }
    }

    fn advance_if<F>(&mut self, predicate: F) -> Option<Token>
    where
        F: FnOnce(&TokenKind) -> bool,
    {
        if let Some(token) = self.peek() {
            if predicate(&token.kind) {
                return self.advance();
            }
        }
        None
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek()
            .map(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
            .unwrap_or(false)
    }

    fn match_token(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            self.advance().ok_or(ParseError::UnexpectedEof)
        } else {
            Err(self.expected(message))
        }
    }

    fn consume_ident(&mut self, message: &str) -> Result<String, ParseError> {
        if let Some(token) = self.peek() {
            if let TokenKind::Ident(name) = &token.kind {
                let name = name.clone();
                self.advance();
                return Ok(name);
            }
        }
        Err(self.expected(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse()
    }

    /// Body of a function wrapping `source`
    fn parse_stmts(source: &str) -> Result<Vec<Stmt>, ParseError> {
        let program = parse(&format!("fn test() {{ {} }}", source))?;
        match program.items.into_iter().next() {
            Some(Item::Function(decl)) => Ok(decl.body),
            other => panic!("Expected function, got {:?}", other),
        }
    }

    /// Initializer of a constant bound to `source`
    fn parse_expr(source: &str) -> Result<Expr, ParseError> {
        let program = parse(&format!("let value = {};", source))?;
        match program.items.into_iter().next() {
            Some(Item::Const { value, .. }) => Ok(value),
            other => panic!("Expected constant, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literal() {
        let expr = parse_expr("42").unwrap();
        assert!(matches!(expr, Expr::Literal(Literal::Int(42))));
    }

    #[test]
    fn test_parse_binary() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        // Should be: Add(1, Mul(2, 3))
        if let Expr::Binary { op, right, .. } = expr {
            assert_eq!(op, BinaryOp::Add);
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
        } else {
            panic!("Expected binary expression");
        }
    }

    #[test]
    fn test_parse_items() {
        let program = parse(
            "use core;\nlet SPEED = 2;\nfn add(a, b) { return a + b; }\nbehavior Foo { }",
        )
        .unwrap();
        assert_eq!(program.items.len(), 4);
        assert!(matches!(&program.items[0], Item::Use { module, span } if module == "core" && span.line == 1));
        assert!(matches!(&program.items[1], Item::Const { name, .. } if name == "SPEED"));
        if let Item::Function(decl) = &program.items[2] {
            assert_eq!(decl.name, "add");
            assert_eq!(decl.params, vec!["a", "b"]);
            assert_eq!(decl.body.len(), 1);
            assert_eq!(decl.span, Span::new(3, 1));
        } else {
            panic!("Expected function");
        }
        assert!(matches!(&program.items[3], Item::Behavior(b) if b.name == "Foo"));
    }

    #[test]
    fn test_parse_behavior() {
        let program = parse(
            r#"
behavior Spinner {
    let angle = 0.0;
    let speed = 90.0;

    fn on_update(dt) {
        self.angle = self.angle + self.speed * dt;
    }
}
"#,
        )
        .unwrap();

        let decl = program.behaviors().next().unwrap();
        assert_eq!(decl.name, "Spinner");
        assert_eq!(decl.fields.len(), 2);
        assert_eq!(decl.fields[1].name, "speed");
        let update = decl.method("on_update").unwrap();
        assert_eq!(update.params, vec!["dt"]);
        assert_eq!(update.span, Span::new(6, 5));
        assert!(matches!(
            &update.body[0],
            Stmt::AssignMember { object, member, .. } if object == "self" && member == "angle"
        ));
    }

    #[test]
    fn test_statement_at_top_level_is_rejected() {
        let err = parse("print(1);").unwrap_err();
        assert!(matches!(err, ParseError::Expected { span, .. } if span == Span::new(1, 1)));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse("behavior Foo {\n    fn on_create() {\n        let x = ;\n    }\n}").unwrap_err();
        assert_eq!(err.span(), Some(Span::new(3, 17)));
    }

    #[test]
    fn test_parse_let() {
        let stmts = parse_stmts("let x = 10;").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(&stmts[0], Stmt::Let { name, .. } if name == "x"));
    }

    #[test]
    fn test_parse_if() {
        let stmts = parse_stmts("if true { x = 1; } else if false { x = 2; } else { x = 3; }").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(&stmts[0], Stmt::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn test_parse_while() {
        let stmts = parse_stmts("while x > 0 { x = x - 1; }").unwrap();
        assert!(matches!(&stmts[0], Stmt::While { .. }));
    }

    #[test]
    fn test_parse_for() {
        let stmts = parse_stmts("for i in items { print(i); }").unwrap();
        assert!(matches!(&stmts[0], Stmt::For { variable, .. } if variable == "i"));
    }

    #[test]
    fn test_invalid_assignment() {
        let err = parse_stmts("1 = 2;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAssignment { .. }));
    }

    #[test]
    fn test_parse_array() {
        let expr = parse_expr("[1, 2, 3,]").unwrap();
        if let Expr::Array(elements) = expr {
            assert_eq!(elements.len(), 3);
        } else {
            panic!("Expected array");
        }
    }

    #[test]
    fn test_parse_object() {
        let expr = parse_expr("{ x: 1, y: 2 }").unwrap();
        if let Expr::Object(pairs) = expr {
            assert_eq!(pairs.len(), 2);
        } else {
            panic!("Expected object");
        }
    }

    #[test]
    fn test_parse_call() {
        let expr = parse_expr("foo(1, 2)").unwrap();
        if let Expr::Call { args, span, .. } = expr {
            assert_eq!(args.len(), 2);
            assert_eq!(span, Span::new(1, 13));
        } else {
            panic!("Expected call");
        }
    }

    #[test]
    fn test_parse_member_and_index() {
        assert!(matches!(parse_expr("obj.field").unwrap(), Expr::Member { member, .. } if member == "field"));
        assert!(matches!(parse_expr("arr[0]").unwrap(), Expr::Index { .. }));
    }

    #[test]
    fn test_parse_lambda() {
        assert!(matches!(
            parse_expr("|a, b| a + b").unwrap(),
            Expr::Lambda { params, .. } if params.len() == 2
        ));
        assert!(matches!(
            parse_expr("|| 1").unwrap(),
            Expr::Lambda { params, .. } if params.is_empty()
        ));
    }

    #[test]
    fn test_parse_unary() {
        let expr = parse_expr("-5").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Neg, .. }));
    }
}
