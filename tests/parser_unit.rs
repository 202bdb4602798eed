//! Parser unit tests - the shape of the tree for each construct

use slate::ast::*;
use slate::parse;
use slate::test_support::{expr_matches, parse_expr};

fn program(input: &str) -> Program {
    parse(input, "<test>").unwrap_or_else(|e| panic!("parse failed for {input:?}: {e}"))
}

fn only_stmt(input: &str) -> StmtKind {
    let mut body = program(input).body;
    assert_eq!(body.len(), 1, "expected one statement in {input:?}");
    body.remove(0).node
}

fn int_literal(expr: &Expr) -> Option<i64> {
    match &expr.node {
        ExprKind::Literal(Literal::Int(n)) => Some(*n),
        _ => None,
    }
}

fn name_of(expr: &Expr) -> Option<&str> {
    match &expr.node {
        ExprKind::Name(name) => Some(&name.ident),
        _ => None,
    }
}

// ============================================================================
// Literals
// ============================================================================

mod literals {
    use super::*;

    #[test]
    fn numeric_literal_kinds() {
        assert!(expr_matches("42", |k| matches!(k, ExprKind::Literal(Literal::Int(42)))));
        assert!(expr_matches("2.5", |k| matches!(k, ExprKind::Literal(Literal::Float(_)))));
        assert!(expr_matches("2.5f", |k| matches!(k, ExprKind::Literal(Literal::Single(_)))));
        assert!(expr_matches("3d", |k| matches!(k, ExprKind::Literal(Literal::Float(_)))));
        assert!(expr_matches("1.25m", |k| matches!(k, ExprKind::Literal(Literal::Decimal(_)))));
        assert!(expr_matches("99999999999999999999", |k| {
            matches!(k, ExprKind::Literal(Literal::BigInt(_)))
        }));
    }

    #[test]
    fn text_and_keyword_literals() {
        assert!(expr_matches("'a'", |k| matches!(k, ExprKind::Literal(Literal::Char('a')))));
        assert!(expr_matches("\"a\"", |k| matches!(k, ExprKind::Literal(Literal::Str(s)) if &**s == "a")));
        assert!(expr_matches("'ab'", |k| matches!(k, ExprKind::Literal(Literal::Str(_)))));
        assert!(expr_matches("null", |k| matches!(k, ExprKind::Literal(Literal::Null))));
        assert!(expr_matches("true", |k| matches!(k, ExprKind::Literal(Literal::Bool(true)))));
    }
}

// ============================================================================
// Operator precedence
// ============================================================================

mod precedence {
    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        let ExprKind::Binary { op: BinOp::Add, left, right } = &expr.node else {
            panic!("expected addition, got {expr:?}");
        };
        assert_eq!(int_literal(left), Some(1));
        assert!(matches!(right.node, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_expr("10 - 4 - 3").unwrap();
        let ExprKind::Binary { op: BinOp::Sub, left, right } = &expr.node else {
            panic!("expected subtraction");
        };
        assert!(matches!(left.node, ExprKind::Binary { op: BinOp::Sub, .. }));
        assert_eq!(int_literal(right), Some(3));
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse_expr("2 ** 3 ** 2").unwrap();
        let ExprKind::Binary { op: BinOp::Pow, left, right } = &expr.node else {
            panic!("expected power");
        };
        assert_eq!(int_literal(left), Some(2));
        assert!(matches!(right.node, ExprKind::Binary { op: BinOp::Pow, .. }));
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        let expr = parse_expr("-2 ** 2").unwrap();
        let ExprKind::Binary { op: BinOp::Pow, left, .. } = &expr.node else {
            panic!("expected power");
        };
        assert!(matches!(left.node, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn shifts_sit_between_bitwise_and_additive() {
        let expr = parse_expr("1 | 2 << 3 + 4").unwrap();
        let ExprKind::Binary { op: BinOp::BitOr, right, .. } = &expr.node else {
            panic!("expected bitwise or");
        };
        let ExprKind::Binary { op: BinOp::Shl, right: shifted, .. } = &right.node else {
            panic!("expected shift");
        };
        assert!(matches!(shifted.node, ExprKind::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn word_and_sits_below_symbol_and() {
        // `a && b and c` groups as `a && (b and c)`
        let expr = parse_expr("a && b and c").unwrap();
        let ExprKind::Logical { op: LogicOp::And, left, right } = &expr.node else {
            panic!("expected and at the root");
        };
        assert_eq!(name_of(left), Some("a"));
        assert!(matches!(right.node, ExprKind::Logical { op: LogicOp::And, .. }));
    }

    #[test]
    fn word_or_shares_the_symbol_or_level() {
        let expr = parse_expr("a or b && c").unwrap();
        let ExprKind::Logical { op: LogicOp::Or, right, .. } = &expr.node else {
            panic!("expected or at the root");
        };
        assert!(matches!(right.node, ExprKind::Logical { op: LogicOp::And, .. }));
    }

    #[test]
    fn word_not_wraps_comparison() {
        let expr = parse_expr("not a == b").unwrap();
        let ExprKind::Unary { op: UnaryOp::Not, operand } = &expr.node else {
            panic!("expected not");
        };
        assert!(matches!(operand.node, ExprKind::Compare { .. }));
    }

    #[test]
    fn bang_binds_to_its_operand() {
        let expr = parse_expr("!a == b").unwrap();
        let ExprKind::Compare { first, .. } = &expr.node else {
            panic!("expected comparison");
        };
        assert!(matches!(first.node, ExprKind::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn ternary_nests_to_the_right() {
        let expr = parse_expr("a ? b : c ? d : e").unwrap();
        let ExprKind::Ternary { else_branch, .. } = &expr.node else {
            panic!("expected ternary");
        };
        assert!(matches!(else_branch.node, ExprKind::Ternary { .. }));
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse_expr("(1 + 2) * 3").unwrap();
        let ExprKind::Binary { op: BinOp::Mul, left, .. } = &expr.node else {
            panic!("expected multiplication");
        };
        assert!(matches!(left.node, ExprKind::Binary { op: BinOp::Add, .. }));
    }
}

// ============================================================================
// Comparisons
// ============================================================================

mod comparisons {
    use super::*;

    #[test]
    fn chain_keeps_every_operator() {
        let expr = parse_expr("a < b <= c != d").unwrap();
        let ExprKind::Compare { first, rest } = &expr.node else {
            panic!("expected comparison");
        };
        assert_eq!(name_of(first), Some("a"));
        let ops: Vec<CmpOp> = rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, [CmpOp::Lt, CmpOp::Le, CmpOp::Ne]);
    }

    #[test]
    fn identity_operators() {
        let expr = parse_expr("a === b !== c").unwrap();
        let ExprKind::Compare { rest, .. } = &expr.node else {
            panic!("expected comparison");
        };
        assert_eq!(rest[0].0, CmpOp::Is);
        assert_eq!(rest[1].0, CmpOp::IsNot);
    }
}

// ============================================================================
// Postfix forms
// ============================================================================

mod postfix {
    use super::*;

    #[test]
    fn call_with_positional_and_keyword_arguments() {
        let expr = parse_expr("f(1, b=2)").unwrap();
        let ExprKind::Call { callee, args } = &expr.node else {
            panic!("expected call");
        };
        assert_eq!(name_of(callee), Some("f"));
        assert!(matches!(&args[0], Arg::Positional(e) if int_literal(e) == Some(1)));
        assert!(matches!(&args[1], Arg::Keyword(name, e) if &**name == "b" && int_literal(e) == Some(2)));
    }

    #[test]
    fn keyword_value_can_compare() {
        let expr = parse_expr("f(a=x == y)").unwrap();
        let ExprKind::Call { args, .. } = &expr.node else {
            panic!("expected call");
        };
        assert!(matches!(&args[0], Arg::Keyword(_, e) if matches!(e.node, ExprKind::Compare { .. })));
    }

    #[test]
    fn calls_chain() {
        let expr = parse_expr("make(1)(2)").unwrap();
        let ExprKind::Call { callee, .. } = &expr.node else {
            panic!("expected call");
        };
        assert!(matches!(callee.node, ExprKind::Call { .. }));
    }

    #[test]
    fn member_index_and_tuple_parse() {
        assert!(expr_matches("a.b", |k| matches!(k, ExprKind::Member { name, .. } if &**name == "b")));
        assert!(expr_matches("a[0]", |k| matches!(k, ExprKind::Index { .. })));
        assert!(expr_matches("(1, 2)", |k| matches!(k, ExprKind::Tuple(items) if items.len() == 2)));
        assert!(expr_matches("()", |k| matches!(k, ExprKind::Tuple(items) if items.is_empty())));
        assert!(expr_matches("(1,)", |k| matches!(k, ExprKind::Tuple(items) if items.len() == 1)));
    }
}

// ============================================================================
// Statements
// ============================================================================

mod statements {
    use super::*;

    #[test]
    fn plain_assignment() {
        let StmtKind::Assign { target, type_hint, value } = only_stmt("x = 5") else {
            panic!("expected assignment");
        };
        assert_eq!(&*target.ident, "x");
        assert!(type_hint.is_none());
        assert_eq!(int_literal(&value), Some(5));
    }

    #[test]
    fn typed_assignment_keeps_the_hint() {
        let StmtKind::Assign { target, type_hint, .. } = only_stmt("int x = 5") else {
            panic!("expected assignment");
        };
        assert_eq!(&*target.ident, "x");
        assert_eq!(type_hint.as_deref(), Some("int"));
    }

    #[test]
    fn name_followed_by_expression_is_not_an_assignment() {
        assert!(matches!(only_stmt("x == 5"), StmtKind::Expr(_)));
        assert!(matches!(only_stmt("f(x)"), StmtKind::Expr(_)));
    }

    #[test]
    fn print_with_and_without_trailing_comma() {
        let StmtKind::Print { values, newline } = only_stmt("print 1, 2") else {
            panic!("expected print");
        };
        assert_eq!(values.len(), 2);
        assert!(newline);

        let StmtKind::Print { values, newline } = only_stmt("print 1,") else {
            panic!("expected print");
        };
        assert_eq!(values.len(), 1);
        assert!(!newline);

        let StmtKind::Print { values, newline } = only_stmt("print") else {
            panic!("expected print");
        };
        assert!(values.is_empty());
        assert!(newline);
    }

    #[test]
    fn pass_and_bare_return() {
        assert!(matches!(only_stmt("pass"), StmtKind::Pass));
        let StmtKind::Def(def) = only_stmt("def f():\n    return\n") else {
            panic!("expected def");
        };
        assert!(matches!(def.body[0].node, StmtKind::Return(None)));
    }
}

// ============================================================================
// Function definitions
// ============================================================================

mod definitions {
    use super::*;

    #[test]
    fn parameter_kinds_defaults_and_hints() {
        let StmtKind::Def(def) = only_stmt("def f(int a, b=2, *rest, **opts): pass") else {
            panic!("expected def");
        };
        assert_eq!(&*def.name.ident, "f");
        let kinds: Vec<ParamKind> = def.params.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, [ParamKind::Plain, ParamKind::Plain, ParamKind::List, ParamKind::Map]);
        assert_eq!(def.params[0].type_hint.as_deref(), Some("int"));
        assert!(def.params[0].default.is_none());
        assert!(def.params[1].default.as_ref().and_then(int_literal) == Some(2));
        assert!(def.has_list_param());
        assert!(def.has_map_param());
        assert_eq!(def.defaults().count(), 1);
    }

    #[test]
    fn indented_body_collects_statements() {
        let StmtKind::Def(def) = only_stmt("def f(a):\n    b = a\n\n    # gap\n    return b\n") else {
            panic!("expected def");
        };
        assert_eq!(def.body.len(), 2);
        assert!(matches!(def.body[1].node, StmtKind::Return(Some(_))));
    }

    #[test]
    fn nested_definition_stays_in_the_body() {
        let body = program("def outer():\n    def inner():\n        pass\n    return inner\nx = 1\n").body;
        assert_eq!(body.len(), 2);
        let StmtKind::Def(outer) = &body[0].node else {
            panic!("expected def");
        };
        assert!(matches!(outer.body[0].node, StmtKind::Def(_)));
    }

    #[test]
    fn only_catch_all_parameters() {
        let StmtKind::Def(def) = only_stmt("def g(*rest): pass") else {
            panic!("expected def");
        };
        assert_eq!(def.params.len(), 1);
        assert_eq!(def.params[0].kind, ParamKind::List);
    }
}

// ============================================================================
// Spans
// ============================================================================

#[test]
fn spans_cover_the_expression() {
    let map = SourceMap::new("x = alpha + beta\n");
    let StmtKind::Assign { value, .. } = only_stmt("x = alpha + beta\n") else {
        panic!("expected assignment");
    };
    assert_eq!(map.span_text(&value.span), "alpha + beta");
}
