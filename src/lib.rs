//! Slate - an embeddable, indentation-sensitive scripting language.
//!
//! One parsed syntax tree runs two ways: directly in the tree interpreter
//! (`eval`) or lowered to routines for the stack VM (`codegen`). Both share
//! the numeric tower (`numeric`) and the call-binding protocol (`binding`).

pub mod ast;
pub mod binding;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod eval;
pub mod frame;
pub mod function;
pub mod lexer;
pub mod numeric;
pub mod parser;
pub mod resolve;
pub mod test_support;
pub mod value;

use thiserror::Error;

pub use ast::{Position, Program, SourceMap, Span};
pub use binding::BindError;
pub use codegen::{compile, CompileError, Unit, Vm};
pub use config::{Config, Output};
pub use errors::{find_similar, levenshtein_distance, Colors, ErrorConfig};
pub use eval::{EvalError, Interpreter};
pub use frame::{Frame, FrameInner};
pub use lexer::Lexer;
pub use parser::{parse, Parser, SyntaxError};
pub use value::{HostObject, Value};

/// Which engine runs a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Interpret,
    Compile,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Parse and run `source` in a fresh global frame
pub fn run_source(source: &str, mode: Mode, config: Config) -> Result<Value, Error> {
    let program = parse(source, &config.source_name)?;
    match mode {
        Mode::Interpret => Ok(Interpreter::new(config).run(&program)?),
        Mode::Compile => {
            let unit = compile(&program)?;
            Ok(Vm::new(config).run(&unit)?)
        }
    }
}
