//! Unit tests for the Stellar parser module

use stellar_dsl::ast::{BinaryOperator, Expr, UnaryOperator};
use stellar_dsl::parser::{parse, parse_with_depth, Parser};
use stellar_dsl::token::{Token, TokenKind};
use stellar_dsl::{Error, ErrorKind, Value};

fn root(source: &str) -> Expr {
    parse(source)
        .unwrap_or_else(|e| panic!("parsing {source:?} failed: {e}"))
        .root()
        .clone()
}

fn var(name: &str) -> Expr {
    Expr::variable(name)
}

#[test]
fn test_literals() {
    assert_eq!(root("42"), Expr::literal(42i64));
    assert_eq!(root("-7"), Expr::literal(-7i64));
    assert_eq!(root("1.5"), Expr::literal(1.5));
    assert_eq!(root("'text'"), Expr::literal("text"));
    assert_eq!(root("TRUE"), Expr::literal(true));
    assert_eq!(root("null"), Expr::Literal(Value::Null));
}

#[test]
fn test_precedence_multiplicative_over_additive() {
    assert_eq!(
        root("1 + 2 * 3"),
        Expr::binary(
            BinaryOperator::Add,
            Expr::literal(1i64),
            Expr::binary(BinaryOperator::Multiply, Expr::literal(2i64), Expr::literal(3i64)),
        )
    );
}

#[test]
fn test_left_associativity() {
    assert_eq!(
        root("10 - 4 - 3"),
        Expr::binary(
            BinaryOperator::Subtract,
            Expr::binary(BinaryOperator::Subtract, Expr::literal(10i64), Expr::literal(4i64)),
            Expr::literal(3i64),
        )
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(
        root("a or b and c"),
        Expr::binary(
            BinaryOperator::Or,
            var("a"),
            Expr::binary(BinaryOperator::And, var("b"), var("c")),
        )
    );
}

#[test]
fn test_not_applies_to_comparison() {
    assert_eq!(
        root("not a == 1"),
        Expr::unary(
            UnaryOperator::Not,
            Expr::binary(BinaryOperator::Equal, var("a"), Expr::literal(1i64)),
        )
    );
}

#[test]
fn test_function_calls() {
    assert_eq!(
        root("REGEXP_MATCH(numbers, '\\d+')"),
        Expr::call("REGEXP_MATCH", vec![var("numbers"), Expr::literal("\\d+")])
    );
    assert_eq!(root("NOW()"), Expr::call("NOW", vec![]));
    // Reserved words become calls when followed by '('
    assert_eq!(root("FALSE()"), Expr::call("FALSE", vec![]));
}

#[test]
fn test_function_names_are_not_checked_at_parse_time() {
    assert!(parse("NO_SUCH_FUNCTION(1, 2, 3)").is_ok());
}

#[test]
fn test_conditionals() {
    let expected = Expr::Conditional {
        condition: Box::new(var("a")),
        then_branch: Box::new(Expr::literal(1i64)),
        else_branch: Some(Box::new(Expr::literal(2i64))),
    };
    assert_eq!(root("a ? 1 : 2"), expected);
    assert_eq!(root("if a then 1 else 2"), expected);

    assert_eq!(
        root("IF a THEN 1"),
        Expr::Conditional {
            condition: Box::new(var("a")),
            then_branch: Box::new(Expr::literal(1i64)),
            else_branch: None,
        }
    );
}

#[test]
fn test_ternary_is_right_associative() {
    let Expr::Conditional { else_branch, .. } = root("a ? 1 : b ? 2 : 3") else {
        panic!("expected conditional");
    };
    assert!(matches!(else_branch.as_deref(), Some(Expr::Conditional { .. })));
}

#[test]
fn test_in_and_exists() {
    assert_eq!(
        root("x in ['a', 'b']"),
        Expr::binary(
            BinaryOperator::In,
            var("x"),
            Expr::List(vec![Expr::literal("a"), Expr::literal("b")]),
        )
    );
    assert_eq!(root("exists(x)"), Expr::unary(UnaryOperator::Exists, var("x")));
}

#[test]
fn test_map_literal_keeps_entry_order() {
    assert_eq!(
        root("{'b': 1, a: 2}"),
        Expr::Map(vec![
            ("b".to_string(), Expr::literal(1i64)),
            ("a".to_string(), Expr::literal(2i64)),
        ])
    );
    assert_eq!(root("{}"), Expr::Map(vec![]));
}

#[test]
fn test_grammar_errors() {
    for source in ["1 +", "(a", "f(a,", "a b", "{'a' 1}", "", "if a 1", ")"] {
        let err = parse(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{source:?} gave {err:?}");
    }
}

#[test]
fn test_parse_error_carries_position() {
    match parse("a == == b").unwrap_err() {
        Error::Parse { token, position, .. } => {
            assert_eq!(token, "==");
            assert_eq!(position, 5);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_lex_errors_surface_through_parse() {
    assert_eq!(parse("a == 'open").unwrap_err().kind(), ErrorKind::Lex);
}

#[test]
fn test_recursion_limit() {
    let deep = format!("{}1{}", "(".repeat(50), ")".repeat(50));
    assert!(parse(&deep).is_ok());
    assert!(parse_with_depth(&deep, 10).is_err());
}

#[test]
fn test_referenced_names() {
    let expr = parse("TO_UPPER(a) == b or TO_UPPER(a) == TO_LOWER(c)").unwrap();
    assert_eq!(expr.variables(), vec!["a", "b", "c"]);
    assert_eq!(expr.functions(), vec!["TO_UPPER", "TO_LOWER"]);
}

#[test]
fn test_parse_is_deterministic() {
    let source = "if exists(a.b) then MAP_GET('k', m, 0) + 1 else -1";
    assert_eq!(parse(source).unwrap().root(), parse(source).unwrap().root());
}

#[test]
fn test_implicit_eof_offset_counts_characters() {
    let tokens = vec![
        Token::new(TokenKind::LParen, "(", 0),
        Token::new(TokenKind::String, "été", 1),
    ];
    let err = Parser::new(tokens).parse().unwrap_err();
    assert!(matches!(err, Error::Parse { position: 4, .. }));
}
