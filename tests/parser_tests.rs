// tests/parser_tests.rs

use bindexpr::ast::{ARITY_CALLEE, Expr, Operator, PathRoot, Token, TokenValue};
use bindexpr::error::{ParseError, ResourceError};
use bindexpr::options::ParserOptions;
use bindexpr::parser::{CompileError, Parser, compile, parse};
use bindexpr::value::Value;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn lit(value: Value) -> Box<Expr> {
    Box::new(Expr::Literal(value))
}

fn int(n: i64) -> Box<Expr> {
    lit(Value::Integer(n))
}

fn path(dotted: &str) -> Expr {
    Expr::context_path(dotted.split('.'))
}

// ============================================================================
// Tree shape
// ============================================================================

#[test]
fn test_precedence_shapes_tree() {
    let expr = parse("2 + 3 * 4").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Binary {
            op: Operator::Add,
            left: int(2),
            right: Box::new(Expr::Binary {
                op: Operator::Multiply,
                left: int(3),
                right: int(4),
            }),
        }
    );
}

#[test]
fn test_nested_conditional_is_right_associative() {
    let expr = parse("a ? b : c ? d : e").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Conditional {
            condition: Box::new(path("a")),
            then: Box::new(path("b")),
            otherwise: Box::new(Expr::Conditional {
                condition: Box::new(path("c")),
                then: Box::new(path("d")),
                otherwise: Box::new(path("e")),
            }),
        }
    );
}

#[test]
fn test_unary_operand() {
    let expr = parse("-x").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Unary {
            op: Operator::Negate,
            operand: Box::new(path("x")),
        }
    );
}

#[test]
fn test_array_and_object_literals() {
    assert_eq!(parse("[]").unwrap().root(), &Expr::Array(vec![]));
    assert_eq!(parse("{}").unwrap().root(), &Expr::Object(vec![]));
    assert_eq!(
        parse("[1, 2, a]").unwrap().root(),
        &Expr::Array(vec![*int(1), *int(2), path("a")])
    );
    assert_eq!(
        parse("{x: a, y: 2}").unwrap().root(),
        &Expr::Object(vec![("x".into(), path("a")), ("y".into(), *int(2))])
    );
}

#[test]
fn test_call_keeps_full_callee_path() {
    let expr = parse("user.name.trim()").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Call {
            callee: Box::new(path("user.name.trim")),
            args: vec![],
        }
    );
}

#[test]
fn test_alias_path_root() {
    let expr = parse("@ctx.user").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Path {
            root: PathRoot::Alias("ctx".into()),
            segments: vec!["user".into()],
        }
    );
}

#[test]
fn test_string_index_extends_path() {
    let expr = parse("row['first name']").unwrap();
    assert_eq!(expr.root(), &Expr::context_path(["row", "first name"]));
}

#[test]
fn test_member_of_call_result_is_index() {
    let expr = parse("f().total").unwrap();
    assert_eq!(
        expr.root(),
        &Expr::Index {
            object: Box::new(Expr::Call {
                callee: Box::new(path("f")),
                args: vec![],
            }),
            key: lit(Value::from("total")),
        }
    );
}

// ============================================================================
// Identifier and alias extraction
// ============================================================================

#[rstest]
#[case("a.b + c", &["a.b", "c"])]
#[case("a.b + a.b * a", &["a.b", "a"])]
#[case("user.name.trim()", &["user.name"])]
#[case("f(x, y)", &["f", "x", "y"])]
#[case("b[a]", &["b", "a"])]
#[case("items[0].name", &["items.0.name"])]
#[case("items[0].name.trim()", &["items.0.name"])]
#[case("items['x'].trim()", &["items.x"])]
#[case("[x, {k: y}]", &["x", "y"])]
#[case("cond ? yes : no", &["cond", "yes", "no"])]
#[case("1 + 'a'", &[])]
fn test_identifiers(#[case] source: &str, #[case] expected: &[&str]) {
    assert_eq!(parse(source).unwrap().identifiers(), expected);
}

#[rstest]
fn test_identifiers_across_positions(
    #[values("user.name", "rows[0].label", "user.name.trim()")] read: &str,
    #[values("{}", "f({})", "[{}][0]", "c ? {} : d", "!{}")] wrap: &str,
) {
    let watched = parse(read).unwrap().identifiers().to_vec();
    let wrapped = wrap.replace("{}", read);
    let source = format!("{} + {} + {}", wrapped, read, wrapped);
    let identifiers = parse(&source).unwrap().identifiers().to_vec();

    let mut expected: Vec<String> = Vec::new();
    for name in ["f", "c"] {
        if wrap.starts_with(name) && !expected.iter().any(|e| e == name) {
            expected.push(name.to_string());
        }
    }
    expected.extend(watched.iter().cloned());
    if wrap.starts_with('c') {
        expected.push("d".to_string());
    }
    assert_eq!(identifiers, expected);
}

#[test]
fn test_alias_records_full_path() {
    let expr = parse("@ctx.user.name").unwrap();
    assert_eq!(expr.aliases(), ["ctx.user.name"]);
    assert!(expr.identifiers().is_empty());
}

#[test]
fn test_aliases_and_identifiers_are_separate() {
    let expr = parse("@row.index + offset + @row.index + @fmt(total)").unwrap();
    assert_eq!(expr.identifiers(), ["offset", "total"]);
    assert_eq!(expr.aliases(), ["row.index", "fmt"]);
}

#[test]
fn test_source_is_kept() {
    assert_eq!(parse("a  +  b").unwrap().source(), "a  +  b");
}

// ============================================================================
// Compiling hand-built token streams
// ============================================================================

#[test]
fn test_compile_token_stream() {
    let tokens = vec![
        Token::identifier("price"),
        Token::leaf(TokenValue::Integer(2)),
        Token::operator(Operator::Multiply),
    ];
    let expr = compile(&tokens).unwrap();
    assert_eq!(expr.source(), "");
    assert_eq!(expr.identifiers(), ["price"]);
    assert_eq!(
        expr.root(),
        &Expr::Binary {
            op: Operator::Multiply,
            left: Box::new(path("price")),
            right: int(2),
        }
    );
}

#[test]
fn test_compile_call_stream() {
    let tokens = vec![
        Token::new(TokenValue::Identifier("math.max".into()), ARITY_CALLEE),
        Token::leaf(TokenValue::Integer(1)),
        Token::identifier("n"),
        Token::new(TokenValue::Call, 2),
    ];
    let expr = compile(&tokens).unwrap();
    assert_eq!(expr.identifiers(), ["math", "n"]);
}

#[test]
fn test_compile_empty_stream() {
    assert_eq!(compile(&[]).unwrap_err(), ParseError::Compile(CompileError::EmptyStream));
}

#[test]
fn test_compile_missing_operands() {
    let tokens = vec![Token::identifier("a"), Token::operator(Operator::Add)];
    assert_eq!(
        compile(&tokens).unwrap_err(),
        ParseError::Compile(CompileError::MissingOperands {
            token: "+".into(),
            expected: 2,
            found: 1,
        })
    );
}

#[test]
fn test_compile_leftover_operands() {
    let tokens = vec![Token::identifier("a"), Token::identifier("b")];
    assert_eq!(
        compile(&tokens).unwrap_err(),
        ParseError::Compile(CompileError::LeftoverOperands { count: 1 })
    );
}

#[rstest]
#[case(Token::new(TokenValue::Integer(1), 3))]
#[case(Token::new(TokenValue::Identifier("a".into()), 0))]
#[case(Token::new(TokenValue::Operator(Operator::Add), 1))]
#[case(Token::new(TokenValue::Call, -1))]
fn test_compile_invalid_arity(#[case] token: Token) {
    let tokens = vec![Token::identifier("x"), Token::identifier("y"), token];
    assert!(matches!(
        compile(&tokens),
        Err(ParseError::Compile(CompileError::InvalidArity { .. }))
    ));
}

#[test]
fn test_compile_key_outside_object() {
    let tokens = vec![Token::leaf(TokenValue::Key("k".into()))];
    assert_eq!(
        compile(&tokens).unwrap_err(),
        ParseError::Compile(CompileError::MisplacedKey { key: "k".into() })
    );
}

#[test]
fn test_compile_object_without_key() {
    let tokens = vec![
        Token::leaf(TokenValue::Integer(1)),
        Token::leaf(TokenValue::Integer(2)),
        Token::new(TokenValue::Object, 1),
    ];
    assert_eq!(
        compile(&tokens).unwrap_err(),
        ParseError::Compile(CompileError::MissingKey { index: 0 })
    );
}

#[test]
fn test_compile_rejects_malformed_identifier() {
    let tokens = vec![Token::identifier("a..b")];
    assert_eq!(
        compile(&tokens).unwrap_err(),
        ParseError::Compile(CompileError::InvalidIdentifier { text: "a..b".into() })
    );
}

// ============================================================================
// Limits and independence
// ============================================================================

#[test]
fn test_tree_depth_limit_applies_after_lexing() {
    let parser = Parser::new(ParserOptions::default().with_max_depth(3));
    assert_eq!(
        parser.parse("[[[1]]]").unwrap_err(),
        ParseError::Resource(ResourceError::ExpressionTooDeep { limit: 3 })
    );
    assert!(parser.parse("[[1]]").is_ok());
}

#[test]
fn test_long_operator_chain_is_rejected_not_overflowed() {
    let source = vec!["1"; 300].join(" + ");
    assert_eq!(
        parse(&source).unwrap_err(),
        ParseError::Resource(ResourceError::ExpressionTooDeep {
            limit: ParserOptions::DEFAULT_MAX_DEPTH
        })
    );
}

#[test]
fn test_parses_are_independent() {
    let first = parse("a + b").unwrap();
    let second = parse("a + b").unwrap();
    assert!(!first.shares_tree_with(&second));
    assert_eq!(first.root(), second.root());
}

#[test]
fn test_one_time_copy_shares_tree() {
    let parsed = parse("user.name").unwrap();
    let once = parsed.as_one_time();
    assert!(once.is_one_time());
    assert!(!parsed.is_one_time());
    assert!(once.shares_tree_with(&parsed));
    assert_eq!(once.identifiers(), parsed.identifiers());
}
