//! Lexer/Tokenizer for VoidScript
//!
//! Converts source code into a stream of tokens.

use thiserror::Error;

use crate::ast::Span;

/// Tokenization failure with its location
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {span}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            span: Span::new(line as u32, column as u32),
        }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,

    // Identifiers and keywords
    Ident(String),
    Let,
    Fn,
    Return,
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Behavior,
    Use,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Pipe,
    Bang,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,

    // Special
    Eof,
}

impl TokenKind {
    /// Short description used in parse errors
    pub fn describe(&self) -> String {
        match self {
            Self::Int(n) => format!("integer {}", n),
            Self::Float(f) => format!("float {}", f),
            Self::String(_) => "string literal".to_string(),
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::Eof => "end of file".to_string(),
            other => format!("{:?}", other),
        }
    }
}

/// A token with position information
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    pub fn span(&self) -> Span {
        Span::new(self.line as u32, self.column as u32)
    }
}

/// Lexer for VoidScript
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        let (line, column) = (self.line, self.column);

        let Some((pos, c)) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, line, column));
        };

        let kind = match c {
            // Single-character tokens
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            // Two-character tokens
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::And
                } else {
                    return Err(LexError::new("Unexpected character '&'", line, column));
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::Or
                } else {
                    TokenKind::Pipe
                }
            }

            // String literals
            '"' => self.string(line, column)?,

            // Numbers
            c if c.is_ascii_digit() => self.number(pos, line, column)?,

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => self.identifier(pos),

            _ => {
                return Err(LexError::new(
                    format!("Unexpected character '{}'", c),
                    line,
                    column,
                ));
            }
        };

        Ok(Token::new(kind, line, column))
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((_, c)) = result {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    /// Peek at the next character
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Peek one character past the next
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().map(|(_, c)| c)
    }

    /// Match and consume a specific character
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Byte offset of the next unread character
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(pos, _)| *pos)
            .unwrap_or(self.source.len())
    }

    /// Skip whitespace, line comments and block comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => {
                    self.advance();
                }
                Some('/') => match self.peek_second() {
                    Some('/') => {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let (line, column) = (self.line, self.column);
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some((_, '*')) if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some(_) => {}
                                None => {
                                    return Err(LexError::new(
                                        "Unterminated block comment",
                                        line,
                                        column,
                                    ));
                                }
                            }
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(())
    }

    /// Parse a string literal
    fn string(&mut self, start_line: usize, start_column: usize) -> Result<TokenKind, LexError> {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => {
                        return Err(LexError::new(
                            "Unterminated string",
                            start_line,
                            start_column,
                        ));
                    }
                },
                Some((_, c)) => value.push(c),
                None => {
                    return Err(LexError::new(
                        "Unterminated string",
                        start_line,
                        start_column,
                    ));
                }
            }
        }

        Ok(TokenKind::String(value))
    }

    /// Parse a number
    fn number(&mut self, start: usize, line: usize, column: usize) -> Result<TokenKind, LexError> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // A dot followed by a digit makes a float, otherwise it is member access
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }

            let end = self.offset();
            let num_str = &self.source[start..end];
            let value: f64 = num_str.parse().map_err(|_| {
                LexError::new(format!("Invalid number '{}'", num_str), line, column)
            })?;

            return Ok(TokenKind::Float(value));
        }

        let end = self.offset();
        let num_str = &self.source[start..end];
        let value: i64 = num_str
            .parse()
            .map_err(|_| LexError::new(format!("Invalid number '{}'", num_str), line, column))?;

        Ok(TokenKind::Int(value))
    }

    /// Parse an identifier or keyword
    fn identifier(&mut self, start: usize) -> TokenKind {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let end = self.offset();
        let ident = &self.source[start..end];

        match ident {
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "behavior" => TokenKind::Behavior,
            "use" => TokenKind::Use,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(ident.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let tokens = Lexer::new("+ - * /").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Plus));
        assert!(matches!(tokens[1].kind, TokenKind::Minus));
        assert!(matches!(tokens[2].kind, TokenKind::Star));
        assert!(matches!(tokens[3].kind, TokenKind::Slash));
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.14").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Int(42)));
        assert!(matches!(tokens[1].kind, TokenKind::Float(f) if (f - 3.14).abs() < 0.001));
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new(r#""hello world""#).tokenize().unwrap();
        assert!(matches!(&tokens[0].kind, TokenKind::String(s) if s == "hello world"));
    }

    #[test]
    fn test_keywords() {
        let tokens = Lexer::new("let fn behavior use while").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Let));
        assert!(matches!(tokens[1].kind, TokenKind::Fn));
        assert!(matches!(tokens[2].kind, TokenKind::Behavior));
        assert!(matches!(tokens[3].kind, TokenKind::Use));
        assert!(matches!(tokens[4].kind, TokenKind::While));
    }

    #[test]
    fn test_comparison() {
        let tokens = Lexer::new("== != < <= > >=").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::EqEq));
        assert!(matches!(tokens[1].kind, TokenKind::BangEq));
        assert!(matches!(tokens[2].kind, TokenKind::Lt));
        assert!(matches!(tokens[3].kind, TokenKind::LtEq));
        assert!(matches!(tokens[4].kind, TokenKind::Gt));
        assert!(matches!(tokens[5].kind, TokenKind::GtEq));
    }

    #[test]
    fn test_pipes() {
        let tokens = Lexer::new("| ||").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Pipe));
        assert!(matches!(tokens[1].kind, TokenKind::Or));
    }

    #[test]
    fn test_comments() {
        let tokens = Lexer::new("1 // comment\n/* block\n */ 2").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Int(1)));
        assert!(matches!(tokens[1].kind, TokenKind::Int(2)));
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_member_after_int() {
        let tokens = Lexer::new("1.foo").tokenize().unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Int(1)));
        assert!(matches!(tokens[1].kind, TokenKind::Dot));
    }

    #[test]
    fn test_error_location() {
        let err = Lexer::new("let x = 1;\n  @").tokenize().unwrap_err();
        assert_eq!(err.span, Span::new(2, 3));
        assert!(err.to_string().contains("'@'"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err.span, Span::new(1, 1));
    }
}
