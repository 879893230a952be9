//! Lexer for JavaScript source code.
//!
//! Converts source text into a stream of tokens. Each token records whether a
//! line terminator preceded it, which the parser uses for statement
//! termination when a semicolon is omitted.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::value::JsString;

/// Source span information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Token types for the supported JavaScript subset.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    True,
    False,
    Null,

    Identifier(JsString),

    // Keywords
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Super,
    Class,
    Extends,
    Static,
    Typeof,
    Instanceof,
    In,
    Of,
    Get,
    Set,
    Void,
    Delete,
    Infinity,

    // Operators
    Plus,             // +
    Minus,            // -
    Star,             // *
    Slash,            // /
    Percent,          // %
    StarStar,         // **
    PlusPlus,         // ++
    MinusMinus,       // --
    Eq,               // =
    EqEq,             // ==
    EqEqEq,           // ===
    BangEq,           // !=
    BangEqEq,         // !==
    Lt,               // <
    LtEq,             // <=
    Gt,               // >
    GtEq,             // >=
    LtLt,             // <<
    GtGt,             // >>
    GtGtGt,           // >>>
    Amp,              // &
    AmpAmp,           // &&
    Pipe,             // |
    PipePipe,         // ||
    Caret,            // ^
    Tilde,            // ~
    Bang,             // !
    Question,         // ?
    QuestionQuestion, // ??

    // Assignment operators
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=
    StarStarEq, // **=
    AmpEq,     // &=
    PipeEq,    // |=
    CaretEq,   // ^=
    LtLtEq,    // <<=
    GtGtEq,    // >>=
    GtGtGtEq,  // >>>=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    DotDotDot, // ...
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    Arrow,     // =>

    Eof,
    Invalid(char),
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether at least one line terminator appeared before this token.
    pub newline_before: bool,
}

impl Token {
    pub fn eof(pos: usize, line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(pos, pos, line, column),
            newline_before: false,
        }
    }
}

/// Streaming lexer over source text.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    pending_newline: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pending_newline: false,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' {
                        self.pending_newline = true;
                    }
                    self.bump();
                }
                Some('/') => {
                    // Line or block comment, or a division operator.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek().map(|(_, c)| *c) {
                        Some('/') => {
                            while let Some(c) = self.peek_char() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = ' ';
                            while let Some((_, c)) = self.bump() {
                                if c == '\n' {
                                    self.pending_newline = true;
                                }
                                if prev == '*' && c == '/' {
                                    break;
                                }
                                prev = c;
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let newline_before = std::mem::take(&mut self.pending_newline);
        let line = self.line;
        let column = self.column;

        let Some((start, c)) = self.bump() else {
            let mut token = Token::eof(self.source.len(), line, column);
            token.newline_before = newline_before;
            return token;
        };

        let kind = match c {
            '0'..='9' => self.lex_number(start, c),
            '"' | '\'' => self.lex_string(c),
            c if is_identifier_start(c) => self.lex_identifier(start),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            '.' => {
                if self.eat('.') {
                    if self.eat('.') {
                        TokenKind::DotDotDot
                    } else {
                        TokenKind::Invalid('.')
                    }
                } else if matches!(self.peek_char(), Some('0'..='9')) {
                    self.lex_number(start, '.')
                } else {
                    TokenKind::Dot
                }
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::StarStarEq
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::LtLtEq
                    } else {
                        TokenKind::LtLt
                    }
                } else if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    } else if self.eat('=') {
                        TokenKind::GtGtEq
                    } else {
                        TokenKind::GtGt
                    }
                } else if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AmpAmp
                } else if self.eat('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::PipePipe
                } else if self.eat('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            '?' => {
                if self.eat('?') {
                    TokenKind::QuestionQuestion
                } else {
                    TokenKind::Question
                }
            }
            other => TokenKind::Invalid(other),
        };

        let end = self
            .chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len());

        Token {
            kind,
            span: Span::new(start, end, line, column),
            newline_before,
        }
    }

    fn lex_number(&mut self, start: usize, first: char) -> TokenKind {
        // Hex / binary / octal prefixes.
        if first == '0' {
            if let Some(c) = self.peek_char() {
                let radix = match c {
                    'x' | 'X' => Some(16),
                    'b' | 'B' => Some(2),
                    'o' | 'O' => Some(8),
                    _ => None,
                };
                if let Some(radix) = radix {
                    self.bump();
                    let mut value: f64 = 0.0;
                    while let Some(d) = self.peek_char().and_then(|c| c.to_digit(radix)) {
                        self.bump();
                        value = value * f64::from(radix) + f64::from(d);
                    }
                    return TokenKind::Number(value);
                }
            }
        }

        let mut seen_dot = first == '.';
        let mut seen_exp = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' => {
                    self.bump();
                }
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.bump();
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    self.bump();
                    if matches!(self.peek_char(), Some('+' | '-')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let end = self
            .chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len());
        let text = self.source.get(start..end).unwrap_or_default();
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn lex_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();
        while let Some((_, c)) = self.bump() {
            if c == quote {
                return TokenKind::String(JsString::from(value));
            }
            if c == '\\' {
                match self.bump() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, '0')) => value.push('\0'),
                    Some((_, '\n')) => {} // line continuation
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                }
            } else {
                value.push(c);
            }
        }
        TokenKind::Invalid(quote)
    }

    fn lex_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(c) = self.peek_char() {
            if is_identifier_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        let end = self
            .chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len());
        let text = self.source.get(start..end).unwrap_or_default();

        match text {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "super" => TokenKind::Super,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "static" => TokenKind::Static,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "of" => TokenKind::Of,
            "get" => TokenKind::Get,
            "set" => TokenKind::Set,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "Infinity" => TokenKind::Infinity,
            _ => TokenKind::Identifier(JsString::from(text)),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
        assert_eq!(lex("3.14"), vec![TokenKind::Number(3.14)]);
        assert_eq!(lex("1e3"), vec![TokenKind::Number(1000.0)]);
        assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            lex("'hi' \"a\\nb\""),
            vec![
                TokenKind::String(JsString::from("hi")),
                TokenKind::String(JsString::from("a\nb")),
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            lex("=== !== >>> ** => ??"),
            vec![
                TokenKind::EqEqEq,
                TokenKind::BangEqEq,
                TokenKind::GtGtGt,
                TokenKind::StarStar,
                TokenKind::Arrow,
                TokenKind::QuestionQuestion,
            ]
        );
    }

    #[test]
    fn newline_flag() {
        let mut lexer = Lexer::new("a\nb");
        let a = lexer.next_token();
        let b = lexer.next_token();
        assert!(!a.newline_before);
        assert!(b.newline_before);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("1 // line\n/* block */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(
            lex("let letx Infinity"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier(JsString::from("letx")),
                TokenKind::Infinity,
            ]
        );
    }
}
