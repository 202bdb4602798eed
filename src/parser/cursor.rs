//! Token stream cursor: one token of lookahead, one of pushback,
//! and value snapshots for backtracking

use std::rc::Rc;

use crate::ast::{SourceMap, Span};
use crate::lexer::{Lexer, LexerState, SpannedToken, Token};

use super::error::{ParseResult, SyntaxError};

/// Restore point covering the lexer and the cursor's own buffers
#[derive(Debug, Clone)]
pub struct Snapshot {
    lexer: LexerState,
    current: SpannedToken,
    pushed: Option<SpannedToken>,
}

pub struct TokenCursor<'a> {
    lexer: Lexer<'a>,
    current: SpannedToken,
    /// Token displaced by `push_back`, handed out again before lexing resumes
    pushed: Option<SpannedToken>,
    map: SourceMap,
    source_name: Rc<str>,
}

impl<'a> TokenCursor<'a> {
    pub fn new(input: &'a str, source_name: &str) -> ParseResult<Self> {
        let map = SourceMap::new(input);
        let source_name: Rc<str> = Rc::from(source_name);
        let mut lexer = Lexer::new(input);
        let current = lexer
            .next_token()
            .map_err(|e| SyntaxError::from_lex(e, &map, &source_name))?;
        Ok(Self {
            lexer,
            current,
            pushed: None,
            map,
            source_name,
        })
    }

    pub fn source_name(&self) -> &Rc<str> {
        &self.source_name
    }

    // ========================================================================
    // Lookahead
    // ========================================================================

    pub fn peek(&self) -> &Token {
        &self.current.token
    }

    pub fn current_span(&self) -> Span {
        self.current.span.clone()
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    pub fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    // ========================================================================
    // Consumption
    // ========================================================================

    /// Move to the next token and return the one just passed
    pub fn advance(&mut self) -> ParseResult<SpannedToken> {
        let next = match self.pushed.take() {
            Some(tok) => tok,
            None if self.is_at_end() => self.current.clone(),
            None => self
                .lexer
                .next_token()
                .map_err(|e| SyntaxError::from_lex(e, &self.map, &self.source_name))?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Undo one `advance`: `token` becomes current again
    pub fn push_back(&mut self, token: SpannedToken) {
        let displaced = std::mem::replace(&mut self.current, token);
        self.pushed = Some(displaced);
    }

    pub fn match_token(&mut self, token: &Token) -> ParseResult<bool> {
        if self.check(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn consume(&mut self, expected: Token) -> ParseResult<SpannedToken> {
        if self.check(&expected) {
            self.advance()
        } else {
            Err(self.unexpected(&format!("'{}'", expected.describe())))
        }
    }

    // ========================================================================
    // Backtracking
    // ========================================================================

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            lexer: self.lexer.snapshot(),
            current: self.current.clone(),
            pushed: self.pushed.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.lexer.restore(snapshot.lexer);
        self.current = snapshot.current;
        self.pushed = snapshot.pushed;
    }

    // ========================================================================
    // Errors
    // ========================================================================

    pub fn error_at(&self, message: impl Into<String>, span: Span) -> SyntaxError {
        let construct = self.map.span_text(&span).to_string();
        SyntaxError::new(message, construct, span, &self.map, &self.source_name)
    }

    pub fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let mut err = self.error_at(message, self.current_span());
        if err.construct.is_empty() {
            err.construct = self.peek().describe();
        }
        err
    }

    pub fn unexpected(&self, expected: &str) -> SyntaxError {
        self.error_here(format!("expected {expected}, found '{}'", self.peek().describe()))
    }
}
