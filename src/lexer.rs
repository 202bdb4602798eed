//! Handwritten, indentation-aware lexer for slate
//!
//! Tokens are produced on demand. Leading whitespace at the start of a
//! logical line is compared against an indent stack and turned into
//! `Indent`/`Dedent` tokens; inside brackets line breaks are ignored.

use std::collections::VecDeque;
use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    BigInt(BigInt),
    Single(f32),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    Char(char),
    Null,
    True,
    False,

    Ident(String),

    // Keywords
    Def,
    Return,
    Print,
    Pass,
    And,
    Or,
    Not,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Question,

    // Operators
    Assign,     // =
    EqEq,       // ==
    NotEq,      // !=
    EqEqEq,     // ===
    NotEqEq,    // !==
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    AmpAmp,
    PipePipe,
    Shl,
    Shr,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl Token {
    /// How the token is named in syntax errors
    pub fn describe(&self) -> String {
        match self {
            Token::Int(n) => n.to_string(),
            Token::BigInt(n) => n.to_string(),
            Token::Single(n) => format!("{n}f"),
            Token::Float(n) => n.to_string(),
            Token::Decimal(n) => format!("{n}m"),
            Token::Str(s) => format!("{s:?}"),
            Token::Char(c) => format!("{c:?}"),
            Token::Ident(name) => name.clone(),
            Token::Newline => "end of line".to_string(),
            Token::Indent => "indent".to_string(),
            Token::Dedent => "dedent".to_string(),
            Token::Eof => "end of input".to_string(),
            other => other.symbol().unwrap_or("?").to_string(),
        }
    }

    fn symbol(&self) -> Option<&'static str> {
        Some(match self {
            Token::Null => "null",
            Token::True => "true",
            Token::False => "false",
            Token::Def => "def",
            Token::Return => "return",
            Token::Print => "print",
            Token::Pass => "pass",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Question => "?",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::EqEqEq => "===",
            Token::NotEqEq => "!==",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::StarStar => "**",
            Token::Slash => "/",
            Token::SlashSlash => "//",
            Token::Percent => "%",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Bang => "!",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Shl => "<<",
            Token::Shr => ">>",
            _ => return None,
        })
    }

    fn keyword(word: &str) -> Option<Token> {
        Some(match word {
            "def" => Token::Def,
            "return" => Token::Return,
            "print" => Token::Print,
            "pass" => Token::Pass,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "null" => Token::Null,
            "true" => Token::True,
            "false" => Token::False,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char, Span),
    #[error("unterminated string literal")]
    UnterminatedString(Span),
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char, Span),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String, Span),
    #[error("unexpected dedent")]
    UnexpectedDedent(Span),
}

impl LexError {
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedChar(_, span)
            | LexError::UnterminatedString(span)
            | LexError::InvalidEscape(_, span)
            | LexError::InvalidNumber(_, span)
            | LexError::UnexpectedDedent(span) => span,
        }
    }
}

/// Immutable copy of everything the lexer mutates.
///
/// Restoring a state replaces the live one wholesale, so a failed
/// speculative parse cannot leak partial progress.
#[derive(Debug, Clone)]
pub struct LexerState {
    pos: usize,
    indents: Vec<usize>,
    pending: VecDeque<SpannedToken>,
    depth: usize,
    at_line_start: bool,
    line_has_tokens: bool,
    finished: bool,
}

pub struct Lexer<'a> {
    input: &'a str,
    state: LexerState,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            state: LexerState {
                pos: 0,
                indents: vec![0],
                pending: VecDeque::new(),
                depth: 0,
                at_line_start: true,
                line_has_tokens: false,
                finished: false,
            },
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn snapshot(&self) -> LexerState {
        self.state.clone()
    }

    pub fn restore(&mut self, state: LexerState) {
        self.state = state;
    }

    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.state.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.state.pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.state.pos += c.len_utf8();
        Some(c)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.state.pos)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Measure the indentation of the next non-blank line and queue the
    /// layout tokens it implies.
    fn read_indentation(&mut self) -> Result<(), LexError> {
        let width = loop {
            let mut width = 0;
            while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
                width += 1;
                self.advance();
            }
            match self.peek() {
                Some('\n') | Some('\r') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                None => return Ok(()),
                Some(_) => break width,
            }
        };

        let here = Span::new(self.state.pos, self.state.pos);
        let top = self.state.indents.last().copied().unwrap_or(0);
        if width > top {
            self.state.indents.push(width);
            self.queue(Token::Indent, here);
        } else if width < top {
            while self.state.indents.last().is_some_and(|&level| level > width) {
                self.state.indents.pop();
                self.queue(Token::Dedent, here.clone());
            }
            if self.state.indents.last().copied().unwrap_or(0) != width {
                return Err(LexError::UnexpectedDedent(here));
            }
        }
        Ok(())
    }

    fn queue(&mut self, token: Token, span: Span) {
        self.state.pending.push_back(SpannedToken { token, span });
    }

    fn finish(&mut self) -> SpannedToken {
        let here = Span::new(self.state.pos, self.state.pos);
        if !self.state.finished {
            self.state.finished = true;
            if self.state.line_has_tokens {
                self.queue(Token::Newline, here.clone());
            }
            while self.state.indents.len() > 1 {
                self.state.indents.pop();
                self.queue(Token::Dedent, here.clone());
            }
        }
        self.state.pending.pop_front().unwrap_or(SpannedToken {
            token: Token::Eof,
            span: here,
        })
    }

    pub fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        if let Some(tok) = self.state.pending.pop_front() {
            return Ok(tok);
        }
        if self.state.at_line_start && self.state.depth == 0 && !self.state.finished {
            self.state.at_line_start = false;
            self.read_indentation()?;
            if let Some(tok) = self.state.pending.pop_front() {
                self.state.line_has_tokens = true;
                return Ok(tok);
            }
        }

        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\x0c') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                Some('\\') if matches!(self.peek_nth(1), Some('\n')) => {
                    self.advance();
                    self.advance();
                }
                Some('\n') => {
                    let start = self.state.pos;
                    self.advance();
                    if self.state.depth > 0 {
                        continue;
                    }
                    self.state.at_line_start = true;
                    if self.state.line_has_tokens {
                        self.state.line_has_tokens = false;
                        return Ok(SpannedToken {
                            token: Token::Newline,
                            span: self.span_from(start),
                        });
                    }
                    return self.next_token();
                }
                None => return Ok(self.finish()),
                Some(_) => break,
            }
        }

        let start = self.state.pos;
        let token = self.read_token(start)?;
        self.state.line_has_tokens = true;
        Ok(SpannedToken {
            token,
            span: self.span_from(start),
        })
    }

    fn read_token(&mut self, start: usize) -> Result<Token, LexError> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let tok = match c {
            '(' | '[' => {
                self.state.depth += 1;
                if c == '(' { Token::LParen } else { Token::LBracket }
            }
            ')' | ']' => {
                self.state.depth = self.state.depth.saturating_sub(1);
                if c == ')' { Token::RParen } else { Token::RBracket }
            }
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            '?' => Token::Question,
            '~' => Token::Tilde,
            '^' => Token::Caret,
            '%' => Token::Percent,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => {
                if self.eat('=') {
                    if self.eat('=') { Token::EqEqEq } else { Token::EqEq }
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') { Token::NotEqEq } else { Token::NotEq }
                } else {
                    Token::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::LtEq
                } else if self.eat('<') {
                    Token::Shl
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::GtEq
                } else if self.eat('>') {
                    Token::Shr
                } else {
                    Token::Gt
                }
            }
            '*' => if self.eat('*') { Token::StarStar } else { Token::Star },
            '/' => if self.eat('/') { Token::SlashSlash } else { Token::Slash },
            '&' => if self.eat('&') { Token::AmpAmp } else { Token::Amp },
            '|' => if self.eat('|') { Token::PipePipe } else { Token::Pipe },
            '"' | '\'' => self.read_string(c, start)?,
            c if c.is_ascii_digit() => self.read_number(start)?,
            c if c.is_alphabetic() || c == '_' => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.advance();
                }
                let word = &self.input[start..self.state.pos];
                Token::keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()))
            }
            other => return Err(LexError::UnexpectedChar(other, self.span_from(start))),
        };
        Ok(tok)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut has_point = false;
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            has_point = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let digits_end = self.state.pos;

        let suffix = match self.peek() {
            Some(c) if is_ident_continue(c) => {
                self.advance();
                if self.peek().is_some_and(is_ident_continue) {
                    while self.peek().is_some_and(is_ident_continue) {
                        self.advance();
                    }
                    return Err(self.invalid_number(start));
                }
                Some(c.to_ascii_lowercase())
            }
            _ => None,
        };

        let text = &self.input[start..digits_end];
        let token = match suffix {
            Some('f') => text.parse().map(Token::Single).ok(),
            Some('d') => text.parse().map(Token::Float).ok(),
            Some('m') => Decimal::from_str(text).map(Token::Decimal).ok(),
            Some(_) => None,
            None if has_point => text.parse().map(Token::Float).ok(),
            None => match text.parse::<i64>() {
                Ok(n) => Some(Token::Int(n)),
                Err(_) => BigInt::from_str(text).map(Token::BigInt).ok(),
            },
        };
        token.ok_or_else(|| self.invalid_number(start))
    }

    fn invalid_number(&self, start: usize) -> LexError {
        LexError::InvalidNumber(self.input[start..self.state.pos].to_string(), self.span_from(start))
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        let mut text = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => return Err(LexError::UnterminatedString(self.span_from(start))),
                Some(c) if c == quote => break,
                Some('\\') => text.push(self.read_escape()?),
                Some(c) => text.push(c),
            }
        }

        let mut chars = text.chars();
        match (quote, chars.next(), chars.next()) {
            ('\'', Some(c), None) => Ok(Token::Char(c)),
            _ => Ok(Token::Str(text)),
        }
    }

    fn read_escape(&mut self) -> Result<char, LexError> {
        let start = self.state.pos.saturating_sub(1);
        let c = self
            .advance()
            .ok_or_else(|| LexError::UnterminatedString(self.span_from(start)))?;
        let decoded = match c {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\x08',
            'e' => '\x1b',
            'a' => '\x07',
            'f' => '\x0c',
            'v' => '\x0b',
            'x' => self.read_code_point(16, 2, c, start)?,
            'u' => self.read_code_point(16, 4, c, start)?,
            'c' => match self.advance() {
                Some(ctl) if ctl.is_ascii() => char::from(ctl as u8 & 0x1f),
                _ => return Err(LexError::InvalidEscape(c, self.span_from(start))),
            },
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                char::from_u32(value).ok_or_else(|| LexError::InvalidEscape(c, self.span_from(start)))?
            }
            other => return Err(LexError::InvalidEscape(other, self.span_from(start))),
        };
        Ok(decoded)
    }

    /// `\x` and `\u`: between one and `max_digits` digits
    fn read_code_point(&mut self, radix: u32, max_digits: usize, escape: char, start: usize) -> Result<char, LexError> {
        let mut value = 0u32;
        let mut count = 0;
        while count < max_digits {
            match self.peek().and_then(|d| d.to_digit(radix)) {
                Some(d) => {
                    value = value * radix + d;
                    self.advance();
                    count += 1;
                }
                None => break,
            }
        }
        if count == 0 {
            return Err(LexError::InvalidEscape(escape, self.span_from(start)));
        }
        char::from_u32(value).ok_or_else(|| LexError::InvalidEscape(escape, self.span_from(start)))
    }
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
