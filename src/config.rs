//! Runtime configuration shared by both execution engines

use std::cell::RefCell;
use std::env;
use std::io::{self, Write};
use std::rc::Rc;

use crate::eval::EvalError;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Where `print` output goes
#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    Buffer(Rc<RefCell<String>>),
}

impl Output {
    /// A capturing sink and a handle for reading what was written
    pub fn buffer() -> (Output, Rc<RefCell<String>>) {
        let buf = Rc::new(RefCell::new(String::new()));
        (Output::Buffer(buf.clone()), buf)
    }

    pub fn write_str(&self, text: &str) -> Result<(), EvalError> {
        match self {
            Output::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| EvalError::Output(e.to_string()))
            }
            Output::Buffer(buf) => {
                buf.borrow_mut().push_str(text);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Nested calls allowed before `RecursionLimit`
    pub max_call_depth: usize,
    pub source_name: String,
    pub output: Output,
}

impl Config {
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            source_name: "<input>".to_string(),
            output: Output::Stdout,
        }
    }

    /// Defaults, overridden by `SLATE_MAX_DEPTH` when it holds a number
    pub fn from_env() -> Self {
        let config = Self::new();
        match env::var("SLATE_MAX_DEPTH").ok().and_then(|v| v.trim().parse().ok()) {
            Some(depth) => config.with_max_call_depth(depth),
            None => config,
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
