// tests/lexer_tests.rs

use bindexpr::ast::{ARITY_CALLEE, ARITY_REFERENCE, Operator, Token, TokenValue};
use bindexpr::error::{ParseError, ResourceError};
use bindexpr::lexer::{LexError, Lexer, SyntaxError, tokenize, tokenize_with};
use bindexpr::options::ParserOptions;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn rendered(input: &str) -> Vec<String> {
    tokenize(input)
        .unwrap_or_else(|e| panic!("failed to tokenize {:?}: {}", input, e))
        .iter()
        .map(|t| t.to_string())
        .collect()
}

// ============================================================================
// Literals
// ============================================================================

#[rstest]
#[case("42", TokenValue::Integer(42))]
#[case("3.14", TokenValue::Float(3.14))]
#[case(".5", TokenValue::Float(0.5))]
#[case("1e3", TokenValue::Float(1000.0))]
#[case("2E-2", TokenValue::Float(0.02))]
#[case("'single'", TokenValue::String("single".into()))]
#[case("\"double\"", TokenValue::String("double".into()))]
#[case("true", TokenValue::Boolean(true))]
#[case("false", TokenValue::Boolean(false))]
#[case("null", TokenValue::Null)]
#[case("undefined", TokenValue::Undefined)]
fn test_literal_tokens(#[case] input: &str, #[case] expected: TokenValue) {
    let tokens = tokenize(input).unwrap();
    assert_eq!(tokens, vec![Token::leaf(expected)]);
}

#[test]
fn test_integer_too_large_becomes_float() {
    let tokens = tokenize("99999999999999999999").unwrap();
    assert_eq!(tokens, vec![Token::leaf(TokenValue::Float(1e20))]);
}

#[test]
fn test_string_escapes() {
    let tokens = tokenize(r#""a\n\t\"b\" \u00e9 \q""#).unwrap();
    assert_eq!(
        tokens,
        vec![Token::leaf(TokenValue::String("a\n\t\"b\" \u{e9} q".into()))]
    );
}

#[test]
fn test_other_quote_needs_no_escape() {
    let tokens = tokenize(r#"'say "hi"'"#).unwrap();
    assert_eq!(tokens, vec![Token::leaf(TokenValue::String("say \"hi\"".into()))]);
}

// ============================================================================
// Identifiers and paths
// ============================================================================

#[test]
fn test_dotted_path_is_one_token() {
    let tokens = tokenize("user.address.city").unwrap();
    assert_eq!(tokens, vec![Token::identifier("user.address.city")]);
    assert_eq!(tokens[0].arity, ARITY_REFERENCE);
}

#[test]
fn test_alias_keeps_sigil() {
    let tokens = tokenize("@ctx.user.name").unwrap();
    assert_eq!(tokens, vec![Token::identifier("@ctx.user.name")]);
}

#[test]
fn test_dollar_and_underscore_identifiers() {
    assert_eq!(rendered("$index + _count"), ["$index/-1", "_count/-1", "+/2"]);
}

#[test]
fn test_property_after_call_and_group() {
    assert_eq!(rendered("f().name"), ["f/-2", "call/0", ".name/0"]);
    assert_eq!(rendered("(a).b.c"), ["a/-1", ".b/0", ".c/0"]);
}

#[test]
fn test_index_access() {
    assert_eq!(rendered("items[0]"), ["items/-1", "0/0", "[]/0"]);
    assert_eq!(rendered("rows[i].label"), ["rows/-1", "i/-1", "[]/0", ".label/0"]);
}

// ============================================================================
// Operators and precedence
// ============================================================================

#[rstest]
#[case("2 + 3 * 4", &["2/0", "3/0", "4/0", "*/2", "+/2"])]
#[case("(2 + 3) * 4", &["2/0", "3/0", "+/2", "4/0", "*/2"])]
#[case("a < b == c > d", &["a/-1", "b/-1", "</2", "c/-1", "d/-1", ">/2", "==/2"])]
#[case("a || b && c", &["a/-1", "b/-1", "c/-1", "&&/2", "||/2"])]
#[case("a ?? b || c", &["a/-1", "b/-1", "??/2", "c/-1", "||/2"])]
#[case("a % b - c / d", &["a/-1", "b/-1", "%/2", "c/-1", "d/-1", "//2", "-/2"])]
#[case("a === b !== c", &["a/-1", "b/-1", "===/2", "c/-1", "!==/2"])]
fn test_precedence(#[case] input: &str, #[case] expected: &[&str]) {
    assert_eq!(rendered(input), expected);
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(rendered("2 ** 3 ** 2"), ["2/0", "3/0", "2/0", "**/2", "**/2"]);
}

#[test]
fn test_unary_operators() {
    assert_eq!(rendered("!a"), ["a/-1", "!/1"]);
    assert_eq!(rendered("-a * b"), ["a/-1", "neg/1", "b/-1", "*/2"]);
    assert_eq!(rendered("a - -b"), ["a/-1", "b/-1", "neg/1", "-/2"]);
    assert_eq!(rendered("!!+x"), ["x/-1", "pos/1", "!/1", "!/1"]);
}

#[test]
fn test_unary_token_carries_operand_count() {
    let tokens = tokenize("-1").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::leaf(TokenValue::Integer(1)),
            Token::operator(Operator::Negate)
        ]
    );
    assert_eq!(tokens[1].arity, 1);
}

#[test]
fn test_conditional() {
    assert_eq!(rendered("a ? b : c"), ["a/-1", "b/-1", "c/-1", "?:/3"]);
    assert_eq!(
        rendered("true ? 1 : false ? 2 : 3"),
        ["true/0", "1/0", "false/0", "2/0", "3/0", "?:/3", "?:/3"]
    );
    assert_eq!(
        rendered("a ? b ? c : d : e"),
        ["a/-1", "b/-1", "c/-1", "d/-1", "?:/3", "e/-1", "?:/3"]
    );
}

#[test]
fn test_conditional_binds_loosest() {
    assert_eq!(
        rendered("a || b ? c + 1 : d"),
        ["a/-1", "b/-1", "||/2", "c/-1", "1/0", "+/2", "d/-1", "?:/3"]
    );
}

// ============================================================================
// Calls, arrays and objects
// ============================================================================

#[test]
fn test_call_arity() {
    assert_eq!(rendered("f()"), ["f/-2", "call/0"]);
    assert_eq!(rendered("f(1, 2, 3)"), ["f/-2", "1/0", "2/0", "3/0", "call/3"]);
    assert_eq!(
        rendered("f(a + 1, g(b))"),
        ["f/-2", "a/-1", "1/0", "+/2", "g/-2", "b/-1", "call/1", "call/2"]
    );
}

#[test]
fn test_method_call_marks_path_as_callee() {
    let tokens = tokenize("user.name.trim()").unwrap();
    assert_eq!(tokens[0], Token::new(TokenValue::Identifier("user.name.trim".into()), ARITY_CALLEE));
}

#[test]
fn test_arrays() {
    assert_eq!(rendered("[]"), ["array/-1"]);
    assert_eq!(rendered("[1, 2, a]"), ["1/0", "2/0", "a/-1", "array/3"]);
    assert_eq!(rendered("[[1], []]"), ["1/0", "array/1", "array/-1", "array/2"]);
}

#[test]
fn test_objects() {
    assert_eq!(rendered("{}"), ["object/0"]);
    assert_eq!(rendered("{x: a, y: 2}"), ["x:/0", "a/-1", "y:/0", "2/0", "object/2"]);
    assert_eq!(
        rendered("{'quoted key': 1, 2: b}"),
        ["quoted key:/0", "1/0", "2:/0", "b/-1", "object/2"]
    );
}

#[test]
fn test_conditional_inside_object_value() {
    assert_eq!(
        rendered("{k: a ? 1 : 2}"),
        ["k:/0", "a/-1", "1/0", "2/0", "?:/3", "object/1"]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_input() {
    assert_eq!(tokenize(""), Err(ParseError::Syntax(SyntaxError::EmptyExpression)));
    assert_eq!(tokenize("   "), Err(ParseError::Syntax(SyntaxError::EmptyExpression)));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        tokenize("a + 'abc"),
        Err(ParseError::Lex(LexError::UnterminatedString { position: 4 }))
    );
}

#[test]
fn test_unclosed_paren() {
    assert_eq!(
        tokenize("(a + b"),
        Err(ParseError::Lex(LexError::UnclosedBracket { open: '(', position: 0 }))
    );
    assert_eq!(
        tokenize("f("),
        Err(ParseError::Lex(LexError::UnclosedBracket { open: '(', position: 1 }))
    );
}

#[test]
fn test_unexpected_closer() {
    assert_eq!(
        tokenize("a)"),
        Err(ParseError::Lex(LexError::UnexpectedCloser { found: ')', position: 1 }))
    );
}

#[test]
fn test_mismatched_bracket() {
    assert_eq!(
        tokenize("[1)"),
        Err(ParseError::Lex(LexError::MismatchedBracket {
            expected: ']',
            found: ')',
            position: 2
        }))
    );
}

#[test]
fn test_colon_without_question() {
    assert_eq!(
        tokenize("a : b"),
        Err(ParseError::Syntax(SyntaxError::DanglingColon { position: 2 }))
    );
    assert_eq!(
        tokenize("(a : b)"),
        Err(ParseError::Syntax(SyntaxError::DanglingColon { position: 3 }))
    );
}

#[test]
fn test_question_without_colon() {
    assert_eq!(
        tokenize("a ? b"),
        Err(ParseError::Syntax(SyntaxError::MissingColon { position: 2 }))
    );
}

#[rstest]
#[case("a +")]
#[case("* a")]
#[case("a b")]
#[case("f(1,)")]
#[case("[1,,2]")]
#[case("()")]
#[case("a[]")]
#[case("{a: }")]
fn test_malformed_expressions(#[case] input: &str) {
    assert!(
        matches!(tokenize(input), Err(ParseError::Syntax(_))),
        "{:?} should be a syntax error",
        input
    );
}

#[test]
fn test_comma_outside_list() {
    assert_eq!(
        tokenize("a, b"),
        Err(ParseError::Syntax(SyntaxError::UnexpectedComma { position: 1 }))
    );
    assert_eq!(
        tokenize("(a, b)"),
        Err(ParseError::Syntax(SyntaxError::UnexpectedComma { position: 2 }))
    );
}

#[test]
fn test_object_key_errors() {
    assert_eq!(
        tokenize("{a 1}"),
        Err(ParseError::Syntax(SyntaxError::MissingKeyColon {
            key: "a".into(),
            position: 3
        }))
    );
    assert_eq!(
        tokenize("{+: 1}"),
        Err(ParseError::Syntax(SyntaxError::ExpectedObjectKey { position: 1 }))
    );
}

#[test]
fn test_unexpected_character() {
    assert_eq!(
        tokenize("a # b"),
        Err(ParseError::Lex(LexError::UnexpectedCharacter {
            character: '#',
            position: 2
        }))
    );
}

#[test]
fn test_invalid_numbers_and_paths() {
    assert!(matches!(
        tokenize("12abc"),
        Err(ParseError::Lex(LexError::InvalidNumber { position: 0, .. }))
    ));
    assert!(matches!(
        tokenize("a..b"),
        Err(ParseError::Lex(LexError::InvalidIdentifier { position: 1, .. }))
    ));
    assert!(matches!(
        tokenize("@ + 1"),
        Err(ParseError::Lex(LexError::InvalidIdentifier { position: 0, .. }))
    ));
}

#[test]
fn test_invalid_unicode_escape() {
    assert_eq!(
        tokenize(r#""\u12""#),
        Err(ParseError::Lex(LexError::InvalidEscape {
            sequence: "\\u12".into(),
            position: 1
        }))
    );
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_input_length_limit() {
    let options = ParserOptions::default().with_max_length(5);
    assert!(tokenize_with("a + b", &options).is_ok());
    assert_eq!(
        tokenize_with("a + bc", &options),
        Err(ParseError::Resource(ResourceError::InputTooLong { length: 6, limit: 5 }))
    );
}

#[test]
fn test_nesting_limit_reports_position() {
    let options = ParserOptions::default().with_max_depth(2);
    assert_eq!(
        tokenize_with("[[[1]]]", &options),
        Err(ParseError::Resource(ResourceError::NestingTooDeep { limit: 2, position: 2 }))
    );
}

#[test]
fn test_lexer_struct_matches_free_function() {
    let options = ParserOptions::default();
    let direct = Lexer::new("a.b(1) ?? [c]", &options).tokenize().unwrap();
    assert_eq!(direct, tokenize("a.b(1) ?? [c]").unwrap());
}
