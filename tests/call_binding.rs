//! Call binding through whole programs, checked in both engines

use slate::test_support::{assert_eval_error, assert_eval_int, assert_eval_value, eval_both, run_both};
use slate::{BindError, EvalError, Value};

fn binding_error(err: &EvalError) -> &BindError {
    match err {
        EvalError::Binding(e) => e,
        other => panic!("expected a binding error, got {other:?}"),
    }
}

// ============================================================================
// Defaults and keywords
// ============================================================================

mod defaults_and_keywords {
    use super::*;

    const ADD: &str = "def f(a, b=10): return a+b\n";

    #[test]
    fn default_fills_missing_argument() {
        assert_eval_int(&format!("{ADD}f(5)"), 15);
    }

    #[test]
    fn keyword_overrides_default() {
        assert_eval_int(&format!("{ADD}f(5, b=1)"), 6);
    }

    #[test]
    fn keywords_in_any_order() {
        assert_eval_int(&format!("{ADD}f(b=2, a=3)"), 5);
    }

    #[test]
    fn no_arguments_names_the_first_missing_parameter() {
        let err = assert_eval_error(&format!("{ADD}f()"), EvalError::is_type_error);
        assert_eq!(
            binding_error(&err),
            &BindError::MissingArgument {
                function: "f".into(),
                name: "a".into()
            }
        );
        assert_eq!(err.to_string(), "f() missing required argument 'a'");
    }

    #[test]
    fn keyword_fills_a_later_slot() {
        assert_eval_int("def f(a, b, c=3): return a*100 + b*10 + c\nf(1, c=5, b=2)", 125);
    }

    #[test]
    fn missing_middle_parameter_is_named() {
        let err = assert_eval_error("def f(a, b, c=3): return a\nf(1, c=5)", |_| true);
        assert!(matches!(binding_error(&err), BindError::MissingArgument { name, .. } if &**name == "b"));
    }

    #[test]
    fn defaults_are_evaluated_once_at_definition() {
        assert_eval_int("n = 1\ndef f(a=n): return a\nn = 2\nf()", 1);
    }

    #[test]
    fn default_can_be_any_expression() {
        assert_eval_value("def f(a, b=2.5 * 2): return b\nf(1)", Value::F64(5.0));
    }
}

// ============================================================================
// Catch-all parameters
// ============================================================================

mod catch_alls {
    use super::*;

    #[test]
    fn list_catch_all_collects_every_argument() {
        assert_eval_value(
            "def g(*rest): return rest\ng(1, 2, 3)",
            Value::seq(vec![Value::I64(1), Value::I64(2), Value::I64(3)]),
        );
    }

    #[test]
    fn list_catch_all_is_empty_without_arguments() {
        assert_eval_value("def g(*rest): return rest\ng()", Value::seq(vec![]));
    }

    #[test]
    fn list_catch_all_takes_the_surplus() {
        let value = eval_both("def f(a, b=0, *rest): return rest\nf(1, 2, 3, 4)");
        assert_eq!(value.to_string(), "[3, 4]");
    }

    #[test]
    fn map_catch_all_collects_unknown_keywords() {
        let value = eval_both("def h(a, **opts): return opts\nh(1, x=2, y=3)");
        assert_eq!(value.to_string(), "{x: 2, y: 3}");
    }

    #[test]
    fn map_catch_all_is_empty_without_keywords() {
        let value = eval_both("def h(**opts): return opts\nh()");
        assert_eq!(value.to_string(), "{}");
    }

    #[test]
    fn both_catch_alls() {
        let src = "def f(a, *rest, **opts):\n    print rest, opts\n    return a\nf(1, 2, 3, k=4)";
        let outcome = run_both(src);
        assert_eq!(outcome.result.unwrap(), Value::I64(1));
        assert_eq!(outcome.output, "[2, 3] {k: 4}\n");
    }

    #[test]
    fn catch_all_name_is_not_a_keyword_target() {
        let value = eval_both("def f(*rest, **opts): return opts\nf(rest=1)");
        assert_eq!(value.to_string(), "{rest: 1}");

        let err = assert_eval_error("def g(*rest): return rest\ng(rest=1)", EvalError::is_type_error);
        assert!(matches!(
            binding_error(&err),
            BindError::UnexpectedKeywordArgument { name, .. } if &**name == "rest"
        ));
    }
}

// ============================================================================
// Rejected calls
// ============================================================================

mod rejected {
    use super::*;

    #[test]
    fn keyword_repeats_a_positional_argument() {
        let err = assert_eval_error("def f(a): pass\nf(1, a=2)", EvalError::is_type_error);
        assert_eq!(
            binding_error(&err),
            &BindError::DuplicateArgument {
                function: "f".into(),
                name: "a".into()
            }
        );
        assert_eq!(err.to_string(), "f() got multiple values for argument 'a'");
    }

    #[test]
    fn too_many_positional_arguments() {
        let err = assert_eval_error("def f(a): pass\nf(1, 2)", EvalError::is_type_error);
        assert_eq!(err.to_string(), "f() takes at most 1 positional argument(s) (2 given)");
    }

    #[test]
    fn too_many_alongside_keywords() {
        let err = assert_eval_error("def f(a, **k): pass\nf(1, 2, x=3)", |_| true);
        assert!(matches!(
            binding_error(&err),
            BindError::TooManyArguments { allowed: 1, given: 2, .. }
        ));
    }

    #[test]
    fn map_catch_all_does_not_absorb_positionals() {
        let err = assert_eval_error("def f(a, **kw): return kw\nf(1, 2)", EvalError::is_type_error);
        assert_eq!(
            binding_error(&err),
            &BindError::TooManyArguments {
                function: "f".into(),
                allowed: 1,
                given: 2
            }
        );
    }

    #[test]
    fn unexpected_keyword() {
        let err = assert_eval_error("def f(a): pass\nf(z=1)", EvalError::is_type_error);
        assert_eq!(err.to_string(), "f() got an unexpected keyword argument 'z'");
    }

    #[test]
    fn calling_a_non_function() {
        let err = assert_eval_error("x = 1\nx(2)", EvalError::is_type_error);
        assert_eq!(err.to_string(), "'i64' object is not callable");
    }

    #[test]
    fn failed_binding_runs_no_part_of_the_body() {
        let outcome = run_both("def f(a):\n    print 'ran'\n    return a\nf(1, 2)");
        assert!(outcome.result.is_err());
        assert_eq!(outcome.output, "");
    }
}

// ============================================================================
// Recursion through binding
// ============================================================================

#[test]
fn recursive_calls_bind_each_time() {
    let src = "def fact(n, acc=1): return n <= 1 ? acc : fact(n - 1, acc=acc * n)\nfact(10)";
    assert_eval_int(src, 3628800);
}
