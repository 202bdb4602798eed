//! Conformance between the tree interpreter and the stack machine
//!
//! Every program here runs through both engines; `run_both` fails the
//! test if their values, errors or printed output differ.

use slate::test_support::{
    assert_eval_bool, assert_eval_error, assert_eval_int, assert_eval_value, disassemble, eval_both, output_of,
    run_both, run_both_with,
};
use slate::{compile, parse, run_source, Config, Error, EvalError, FrameInner, Interpreter, Mode, Value, Vm};

// ============================================================================
// Conformance corpus
// ============================================================================

mod corpus {
    use super::*;

    #[test]
    fn module_result_is_the_last_expression_statement() {
        assert_eval_int("1\nx = 2", 1);
        assert_eval_int("x = 2\nx * 3\ny = 0", 6);
    }

    #[test]
    fn program_without_expressions_yields_null() {
        assert_eval_value("x = 1", Value::Null);
        assert_eval_value("", Value::Null);
    }

    #[test]
    fn function_without_return_yields_null() {
        assert_eval_value("def f(): pass\nf()", Value::Null);
    }

    #[test]
    fn return_leaves_nested_blocks() {
        let src = "def f(n):\n    def g(): return n\n    return g() + 1\n    print 'unreachable'\nf(4)";
        let outcome = run_both(src);
        assert_eq!(outcome.result.unwrap(), Value::I64(5));
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn closure_keeps_its_argument() {
        let src = "def adder(n):\n    def add(x): return x + n\n    return add\nplus3 = adder(3)\nplus3(4)";
        assert_eval_int(src, 7);
    }

    #[test]
    fn captures_thread_through_intermediate_functions() {
        let src = "\
def outer(a):
    def middle(b):
        def inner(c): return a * 100 + b * 10 + c
        return inner
    return middle
outer(1)(2)(3)";
        assert_eval_int(src, 123);
    }

    #[test]
    fn distinct_closures_do_not_share_state() {
        let src = "\
def make(n):
    def get(): return n
    return get
a = make(1)
b = make(2)
a() * 10 + b()";
        assert_eval_int(src, 12);
    }

    #[test]
    fn closure_takes_keyword_arguments() {
        let src = "def wrap(k):\n    def f(a, b=0): return a * k + b\n    return f\nwrap(10)(b=1, a=2)";
        assert_eval_int(src, 21);
    }

    #[test]
    fn globals_are_read_at_call_time() {
        assert_eval_int("g = 1\ndef f(): return g\ng = 5\nf()", 5);
    }

    #[test]
    fn assignment_in_a_function_is_local() {
        assert_eval_int("g = 1\ndef f():\n    g = 2\n    return g\nf() + g", 3);
    }

    #[test]
    fn recursion() {
        assert_eval_int("def fib(n): return n < 2 ? n : fib(n - 1) + fib(n - 2)\nfib(15)", 610);
    }

    #[test]
    fn mutual_recursion_through_globals() {
        let src = "\
def even(n): return n == 0 ? true : odd(n - 1)
def odd(n): return n == 0 ? false : even(n - 1)
even(10)";
        assert_eval_bool(src, true);
    }

    #[test]
    fn nested_function_calls_itself() {
        let src = "\
def outer(n):
    def count(k): return k == 0 ? 0 : 1 + count(k - 1)
    return count(n)
outer(12)";
        assert_eval_int(src, 12);
    }

    #[test]
    fn functions_are_values() {
        let src = "def twice(f, x): return f(f(x))\ndef inc(x): return x + 1\ntwice(inc, 5)";
        assert_eval_int(src, 7);
        assert_eq!(eval_both("def f(): pass\nf").to_string(), "<function f>");
    }

    #[test]
    fn logical_operators_return_the_deciding_operand() {
        assert_eval_int("0 || 5", 5);
        assert_eval_int("3 && 0", 0);
        assert_eval_int("2 and 7", 7);
        assert_eq!(eval_both("null or \"x\"").to_string(), "x");
        assert_eval_value("\"\" && 1", Value::str(""));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let src = "def loud(x):\n    print x\n    return x\nloud(0) && loud(1)\nloud(2) || loud(3)";
        assert_eq!(output_of(src), "0\n2\n");
    }

    #[test]
    fn ternary_evaluates_one_branch() {
        let src = "def loud(x):\n    print x\n    return x\ntrue ? loud(1) : loud(2)";
        let outcome = run_both(src);
        assert_eq!(outcome.result.unwrap(), Value::I64(1));
        assert_eq!(outcome.output, "1\n");
    }

    #[test]
    fn chained_comparison_evaluates_the_middle_once() {
        let src = "def mid():\n    print 'm'\n    return 2\n1 < mid() < 3";
        let outcome = run_both(src);
        assert_eq!(outcome.result.unwrap(), Value::Bool(true));
        assert_eq!(outcome.output, "m\n");
    }

    #[test]
    fn chained_comparison_stops_at_the_first_failure() {
        let src = "def last():\n    print 'last'\n    return 9\n3 < 1 < last()";
        let outcome = run_both(src);
        assert_eq!(outcome.result.unwrap(), Value::Bool(false));
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn print_formats() {
        assert_eq!(output_of("print"), "\n");
        assert_eq!(output_of("print 1, 2.5, 'c', \"s\", null, true"), "1 2.5 c s null true\n");
        assert_eq!(output_of("print 1,\nprint 2"), "1 2\n");
    }

    #[test]
    fn print_inside_functions_interleaves_in_order() {
        let src = "def f(x):\n    print 'in', x\n    return x * 2\nprint 'before'\nprint f(3)";
        assert_eq!(output_of(src), "before\nin 3\n6\n");
    }

    #[test]
    fn typed_assignment_runs_like_plain_assignment() {
        assert_eval_int("x: i64 = 4\nx + 1", 5);
    }
}

// ============================================================================
// Errors raised identically by both engines
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn unbound_name_suggests_close_spellings() {
        let err = assert_eval_error("count = 1\ncoutn + 1", |e| matches!(e, EvalError::UnboundName { .. }));
        assert_eq!(err.to_string(), "name 'coutn' is not defined");
        match err {
            EvalError::UnboundName { suggestions, .. } => assert_eq!(suggestions, ["count"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unbound_local_before_assignment() {
        let err = assert_eval_error(
            "def f():\n    x = x + 1\n    return x\nf()",
            |e| matches!(e, EvalError::UnboundLocal(_)),
        );
        assert_eq!(err.to_string(), "local variable 'x' referenced before assignment");
    }

    #[test]
    fn error_stops_the_program_after_earlier_output() {
        let outcome = run_both("print 'one'\nx = 1 / 0\nprint 'two'");
        assert_eq!(outcome.output, "one\n");
        assert!(matches!(outcome.result, Err(EvalError::DivideByZero(_))));
    }

    #[test]
    fn member_access_is_unsupported() {
        let err = assert_eval_error("x = 1\nx.y", |e| matches!(e, EvalError::Unsupported(_)));
        assert_eq!(err.to_string(), "member access is not supported");
    }

    #[test]
    fn indexing_is_unsupported() {
        let err = assert_eval_error("x = 1\nx[0]", |e| matches!(e, EvalError::Unsupported(_)));
        assert_eq!(err.to_string(), "indexing is not supported");
    }

    #[test]
    fn tuple_literal_is_unsupported() {
        let err = assert_eval_error("(1, 2)", |e| matches!(e, EvalError::Unsupported(_)));
        assert_eq!(err.to_string(), "tuple literal is not supported");
    }

    #[test]
    fn unsupported_code_that_never_runs_is_harmless() {
        assert_eval_int("def f(x): return x.field\n3", 3);
    }

    #[test]
    fn runaway_recursion_hits_the_limit() {
        let config = Config::default().with_max_call_depth(50);
        let outcome = run_both_with("def f(n): return f(n + 1)\nf(0)", config);
        let err = outcome.result.unwrap_err();
        assert!(matches!(err, EvalError::RecursionLimit(50)));
        assert_eq!(err.to_string(), "maximum recursion depth exceeded");
    }

    #[test]
    fn default_limit_holds_on_a_small_thread_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let deep = run_both("def d(n): return n <= 0 ? 0 : 1 + d(n - 1)\nd(195)");
                let runaway = run_both("def f(n): return f(n + 1)\nf(0)");
                (format!("{:?}", deep.result), runaway.result.err().map(|e| e.to_string()))
            })
            .unwrap();
        let (deep, runaway) = handle.join().unwrap();
        assert_eq!(deep, "Ok(i64(195))");
        assert_eq!(runaway.as_deref(), Some("maximum recursion depth exceeded"));
    }

    #[test]
    fn recursion_within_the_limit_succeeds() {
        let config = Config::default().with_max_call_depth(50);
        let outcome = run_both_with("def f(n): return n == 0 ? 0 : 1 + f(n - 1)\nf(40)", config);
        assert_eq!(outcome.result.unwrap(), Value::I64(40));
    }
}

// ============================================================================
// Calls across engines
// ============================================================================

mod cross_engine {
    use super::*;

    #[test]
    fn interpreter_calls_compiled_function() {
        let globals = FrameInner::new();
        let defs = parse("def f(x, y=10): return x * y\n", "<defs>").unwrap();
        let unit = compile(&defs).unwrap();
        Vm::with_globals(Config::default(), globals.clone()).run(&unit).unwrap();

        let call = parse("f(2) + f(1, y=3)", "<call>").unwrap();
        let value = Interpreter::with_globals(Config::default(), globals).run(&call).unwrap();
        assert_eq!(value, Value::I64(23));
    }

    #[test]
    fn compiled_code_calls_interpreted_closure() {
        let globals = FrameInner::new();
        let defs = parse("def scale(k):\n    def f(x): return x * k\n    return f\ntriple = scale(3)", "<defs>").unwrap();
        Interpreter::with_globals(Config::default(), globals.clone()).run(&defs).unwrap();

        let call = parse("triple(5) + triple(x=1)", "<call>").unwrap();
        let unit = compile(&call).unwrap();
        let value = Vm::with_globals(Config::default(), globals).run(&unit).unwrap();
        assert_eq!(value, Value::I64(18));
    }

    #[test]
    fn functions_pass_between_engines_as_arguments() {
        let globals = FrameInner::new();
        let apply = parse("def apply(f, x): return f(x) + 1", "<apply>").unwrap();
        Vm::with_globals(Config::default(), globals.clone())
            .run(&compile(&apply).unwrap())
            .unwrap();

        let use_it = parse("def sq(n): return n * n\napply(sq, 6)", "<use>").unwrap();
        let value = Interpreter::with_globals(Config::default(), globals).run(&use_it).unwrap();
        assert_eq!(value, Value::I64(37));
    }

    #[test]
    fn binding_errors_match_across_engines() {
        let globals = FrameInner::new();
        let defs = parse("def f(a): return a", "<defs>").unwrap();
        Vm::with_globals(Config::default(), globals.clone())
            .run(&compile(&defs).unwrap())
            .unwrap();

        let call = parse("f(1, a=2)", "<call>").unwrap();
        let err = Interpreter::with_globals(Config::default(), globals).run(&call).unwrap_err();
        assert_eq!(err.to_string(), "f() got multiple values for argument 'a'");
    }
}

// ============================================================================
// Entry points
// ============================================================================

mod entry_points {
    use super::*;

    #[test]
    fn run_source_in_each_mode() {
        for mode in [Mode::Interpret, Mode::Compile] {
            let value = run_source("def f(a, b=10): return a+b\nf(5)", mode, Config::default()).unwrap();
            assert_eq!(value, Value::I64(15), "{mode:?}");
        }
    }

    #[test]
    fn run_source_reports_syntax_errors() {
        let config = Config::default().with_source_name("bad.sl");
        let err = run_source("def f(a):\nreturn a\n", Mode::Compile, config).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
        assert_eq!(err.to_string(), "expected indent near bad.sl(2,1)");
    }

    #[test]
    fn run_source_reports_evaluation_errors() {
        let err = run_source("7.0 / 0", Mode::Interpret, Config::default()).unwrap_err();
        assert!(matches!(err, Error::Eval(EvalError::DivideByZero(_))));
        assert_eq!(err.to_string(), "float division by zero");
    }

    #[test]
    fn disassembly_lists_nested_routines() {
        let listing = disassemble("def f(a): return a + 1\nf(2)").unwrap();
        assert!(listing.starts_with("routine "), "{listing}");
        assert!(listing.contains("MAKE_FUNCTION f defaults=0"), "{listing}");
        assert!(listing.contains("CALL 1"), "{listing}");
        assert!(listing.contains("  routine f"), "{listing}");
        assert!(listing.contains("BINARY +"), "{listing}");
        assert!(listing.contains("RETURN"), "{listing}");
    }

    #[test]
    fn disassembly_shows_keyword_names() {
        let listing = disassemble("def f(a, b=1): return b\nf(1, b=2)").unwrap();
        assert!(listing.contains("CALL 1 [b]"), "{listing}");
        assert!(listing.contains("MAKE_FUNCTION f defaults=1"), "{listing}");
    }
}
