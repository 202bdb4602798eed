//! Test support for driving slate source through both engines.
//!
//! Every run captures `print` output in a buffer, so tests can assert on
//! printed text as well as on the program's result. The `*_both` helpers
//! run the interpreter and the compiled backend side by side and fail
//! when their observable behavior differs.

use crate::ast::{Expr, ExprKind, Program};
use crate::codegen::{compile, Unit, Vm};
use crate::config::{Config, Output};
use crate::eval::{EvalError, Interpreter};
use crate::parser::{parse, Parser};
use crate::value::Value;
use crate::Mode;

// ============================================================================
// Pipeline Inspection
// ============================================================================

/// Parse a program and return the resolved AST
pub fn parse_program(input: &str) -> Result<Program, String> {
    parse(input, "<test>").map_err(|e| format!("Parse error: {e}"))
}

/// Parse a single expression, without scope resolution
pub fn parse_expr(input: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(input, "<test>").map_err(|e| format!("Parse error: {e}"))?;
    parser.parse_expr().map_err(|e| format!("Parse error: {e}"))
}

pub fn compile_program(input: &str) -> Result<Unit, String> {
    let program = parse_program(input)?;
    compile(&program).map_err(|e| format!("Lowering error: {e}"))
}

/// Disassembly of a program's compiled form
pub fn disassemble(input: &str) -> Result<String, String> {
    compile_program(input).map(|unit| unit.disassemble())
}

// ============================================================================
// Running Programs
// ============================================================================

/// Result and printed output of one run
#[derive(Debug)]
pub struct Outcome {
    pub result: Result<Value, EvalError>,
    pub output: String,
}

/// Run `input` in `mode`; panics if it does not parse or lower
pub fn run_with(input: &str, mode: Mode, config: Config) -> Outcome {
    let program = parse_program(input).unwrap_or_else(|e| panic!("{e}\nsource:\n{input}"));
    let (output, buffer) = Output::buffer();
    let config = config.with_output(output);
    let result = match mode {
        Mode::Interpret => Interpreter::new(config).run(&program),
        Mode::Compile => {
            let unit = compile(&program).unwrap_or_else(|e| panic!("Lowering error: {e}"));
            Vm::new(config).run(&unit)
        }
    };
    let output = buffer.borrow().clone();
    Outcome { result, output }
}

pub fn run_interpreted(input: &str) -> Outcome {
    run_with(input, Mode::Interpret, Config::default())
}

pub fn run_compiled(input: &str) -> Outcome {
    run_with(input, Mode::Compile, Config::default())
}

/// Run in both engines and assert they agree
pub fn run_both(input: &str) -> Outcome {
    run_both_with(input, Config::default())
}

pub fn run_both_with(input: &str, config: Config) -> Outcome {
    let interpreted = run_with(input, Mode::Interpret, config.clone());
    let compiled = run_with(input, Mode::Compile, config);
    assert!(
        outcomes_agree(&interpreted, &compiled),
        "Engines disagree for:\n{input}\nInterpreted: {interpreted:?}\nCompiled: {compiled:?}"
    );
    interpreted
}

// ============================================================================
// Value Comparison and Assertions
// ============================================================================

/// Equality across engines: functions match by name, NaN matches NaN,
/// sequences and mappings compare element-wise
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Function(x), Value::Function(y)) => x.name() == y.name(),
        (Value::F64(x), Value::F64(y)) if x.is_nan() && y.is_nan() => true,
        (Value::F32(x), Value::F32(y)) if x.is_nan() && y.is_nan() => true,
        (Value::Seq(xs), Value::Seq(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| same_value(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|((kx, x), (ky, y))| kx == ky && same_value(x, y))
        }
        _ => a == b,
    }
}

/// Same printed output, and the same value or the same error message
pub fn outcomes_agree(a: &Outcome, b: &Outcome) -> bool {
    a.output == b.output
        && match (&a.result, &b.result) {
            (Ok(x), Ok(y)) => same_value(x, y),
            (Err(x), Err(y)) => x.to_string() == y.to_string(),
            _ => false,
        }
}

/// Value of a program in both engines; panics on any error
pub fn eval_both(input: &str) -> Value {
    match run_both(input).result {
        Ok(value) => value,
        Err(e) => panic!("Evaluation failed for:\n{input}\nError: {e:?}"),
    }
}

pub fn assert_eval_value(input: &str, expected: Value) {
    let actual = eval_both(input);
    assert!(
        same_value(&actual, &expected),
        "Value mismatch for:\n{input}\nExpected: {expected:?}\nActual: {actual:?}"
    );
}

pub fn assert_eval_int(input: &str, expected: i64) {
    assert_eval_value(input, Value::I64(expected));
}

pub fn assert_eval_bool(input: &str, expected: bool) {
    assert_eval_value(input, Value::Bool(expected));
}

/// Assert both engines fail and the error satisfies `check`
pub fn assert_eval_error<F>(input: &str, check: F) -> EvalError
where
    F: Fn(&EvalError) -> bool,
{
    match run_both(input).result {
        Ok(v) => panic!("Expected error for:\n{input}\nBut got value: {v:?}"),
        Err(e) => {
            assert!(check(&e), "Error mismatch for:\n{input}\nActual error: {e:?}");
            e
        }
    }
}

/// Printed output of a program, checked in both engines
pub fn output_of(input: &str) -> String {
    let outcome = run_both(input);
    if let Err(e) = &outcome.result {
        panic!("Evaluation failed for:\n{input}\nError: {e:?}");
    }
    outcome.output
}

// ============================================================================
// AST Inspection Helpers
// ============================================================================

pub fn expr_matches<F>(input: &str, predicate: F) -> bool
where
    F: FnOnce(&ExprKind) -> bool,
{
    match parse_expr(input) {
        Ok(expr) => predicate(&expr.node),
        Err(_) => false,
    }
}

// ============================================================================
// Test Macros
// ============================================================================

/// Assert a program evaluates to an `i64` in both engines
#[macro_export]
macro_rules! assert_evals_to_int {
    ($input:expr, $expected:expr) => {
        $crate::test_support::assert_eval_int($input, $expected)
    };
}

#[macro_export]
macro_rules! assert_evals_to_bool {
    ($input:expr, $expected:expr) => {
        $crate::test_support::assert_eval_bool($input, $expected)
    };
}
