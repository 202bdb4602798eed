//! Syntax errors with source location

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{SourceMap, Span};
use crate::lexer::LexError;

/// A failed parse. There is no recovery: the first error aborts the unit.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} near {source_name}({line},{column})")]
pub struct SyntaxError {
    pub message: String,
    /// Source text of the offending token or construct
    pub construct: String,
    pub source_name: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(
        message: impl Into<String>,
        construct: impl Into<String>,
        span: Span,
        map: &SourceMap,
        source_name: &Rc<str>,
    ) -> Self {
        let pos = map.position(span.start);
        Self {
            message: message.into(),
            construct: construct.into(),
            source_name: source_name.clone(),
            line: pos.line,
            column: pos.column,
            span,
        }
    }

    pub fn from_lex(err: LexError, map: &SourceMap, source_name: &Rc<str>) -> Self {
        let span = err.span().clone();
        let construct = map.span_text(&span).to_string();
        Self::new(err.to_string(), construct, span, map, source_name)
    }
}

pub type ParseResult<T> = Result<T, SyntaxError>;
