use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{ARITY_CALLEE, ARITY_REFERENCE, Operator, Token, TokenValue},
    error::{ParseError, ResourceError},
    options::ParserOptions,
};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("number pattern is valid")
});

/// Operator spellings, longest first so lookahead picks the longest match.
const OPERATOR_SYMBOLS: [&str; 18] = [
    "===", "!==", "**", "<=", ">=", "==", "!=", "&&", "||", "??", "+", "-", "*", "/", "%", "<",
    ">", "!",
];

/// Character-level failures. Positions are byte offsets into the source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("invalid escape sequence '{sequence}' at position {position}")]
    InvalidEscape { sequence: String, position: usize },

    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("invalid identifier at position {position}: {message}")]
    InvalidIdentifier { message: String, position: usize },

    #[error("expected '{expected}' but found '{found}' at position {position}")]
    MismatchedBracket {
        expected: char,
        found: char,
        position: usize,
    },

    #[error("'{open}' opened at position {position} is never closed")]
    UnclosedBracket { open: char, position: usize },

    #[error("'{found}' at position {position} closes nothing")]
    UnexpectedCloser { found: char, position: usize },
}

/// Grammar-level failures detected while arranging tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("empty expression")]
    EmptyExpression,

    #[error("unexpected operand at position {position}, expected an operator")]
    UnexpectedOperand { position: usize },

    #[error("expected an operand but found {found} at position {position}")]
    ExpectedOperand { found: String, position: usize },

    #[error("unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("':' at position {position} has no matching '?'")]
    DanglingColon { position: usize },

    #[error("'?' at position {position} has no matching ':'")]
    MissingColon { position: usize },

    #[error("',' at position {position} is outside of a call, array or object")]
    UnexpectedComma { position: usize },

    #[error("expected an object key at position {position}")]
    ExpectedObjectKey { position: usize },

    #[error("expected ':' after object key '{key}' at position {position}")]
    MissingKeyColon { key: String, position: usize },
}

/// Tokenizes `input` with default limits.
///
/// # Examples
///
/// ```
/// use bindexpr::lexer::tokenize;
///
/// let tokens = tokenize("a.b + c * 2").unwrap();
/// let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
/// assert_eq!(rendered, ["a.b/-1", "c/-1", "2/0", "*/2", "+/2"]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    tokenize_with(input, &ParserOptions::default())
}

pub fn tokenize_with(input: &str, options: &ParserOptions) -> Result<Vec<Token>, ParseError> {
    let length = input.chars().count();
    if length > options.max_length {
        return Err(ResourceError::InputTooLong {
            length,
            limit: options.max_length,
        }
        .into());
    }
    let tokens = Lexer::new(input, options).tokenize()?;
    log::trace!("tokenized {:?} into {} tokens", input, tokens.len());
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Group,
    Call,
    Array,
    Index,
    Object,
}

impl ScopeKind {
    fn opener(self) -> char {
        match self {
            ScopeKind::Group | ScopeKind::Call => '(',
            ScopeKind::Array | ScopeKind::Index => '[',
            ScopeKind::Object => '{',
        }
    }

    fn closer(self) -> char {
        match self {
            ScopeKind::Group | ScopeKind::Call => ')',
            ScopeKind::Array | ScopeKind::Index => ']',
            ScopeKind::Object => '}',
        }
    }

    fn allows_comma(self) -> bool {
        matches!(self, ScopeKind::Call | ScopeKind::Array | ScopeKind::Object)
    }
}

/// An open bracket together with its element counter.
#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    position: usize,
    /// Commas seen at this scope's top level
    commas: i32,
    /// Object scopes only: the next token must be a key
    expect_key: bool,
}

/// Entries of the operator stack.
#[derive(Debug)]
enum Pending {
    Operator(Operator),
    /// Bracket boundary; the matching [`Scope`] sits on the scope stack
    Open,
    /// `?` still waiting for its `:`
    Question { position: usize },
    /// `?` and `:` both seen; completes into a conditional token
    Colon,
}

/// Per-call shunting-yard state.
#[derive(Debug, Default)]
struct Shunt {
    output: Vec<Token>,
    operators: Vec<Pending>,
    scopes: Vec<Scope>,
    expect_operand: bool,
    /// The previous token was an opening bracket
    just_opened: bool,
}

impl Shunt {
    fn new() -> Self {
        Shunt {
            expect_operand: true,
            ..Default::default()
        }
    }

    fn emit_operand(&mut self, token: Token, position: usize) -> Result<(), SyntaxError> {
        if !self.expect_operand {
            return Err(SyntaxError::UnexpectedOperand { position });
        }
        self.output.push(token);
        self.expect_operand = false;
        self.just_opened = false;
        Ok(())
    }

    fn push_unary(&mut self, op: Operator) {
        self.operators.push(Pending::Operator(op));
        self.just_opened = false;
    }

    fn push_binary(&mut self, op: Operator) {
        while let Some(Pending::Operator(top)) = self.operators.last() {
            if !top.yields_to(op) {
                break;
            }
            let top = *top;
            self.operators.pop();
            self.output.push(Token::operator(top));
        }
        self.operators.push(Pending::Operator(op));
        self.expect_operand = true;
        self.just_opened = false;
    }

    fn push_question(&mut self, position: usize) {
        // Every binary operator binds tighter than the conditional.
        while let Some(Pending::Operator(top)) = self.operators.last() {
            let top = *top;
            self.operators.pop();
            self.output.push(Token::operator(top));
        }
        self.operators.push(Pending::Question { position });
        self.expect_operand = true;
        self.just_opened = false;
    }

    fn push_colon(&mut self, position: usize) -> Result<(), SyntaxError> {
        loop {
            match self.operators.pop() {
                Some(Pending::Operator(op)) => self.output.push(Token::operator(op)),
                Some(Pending::Colon) => self.output.push(Token::operator(Operator::Conditional)),
                Some(Pending::Question { .. }) => {
                    self.operators.push(Pending::Colon);
                    break;
                }
                Some(Pending::Open) => {
                    self.operators.push(Pending::Open);
                    return Err(SyntaxError::DanglingColon { position });
                }
                None => return Err(SyntaxError::DanglingColon { position }),
            }
        }
        self.expect_operand = true;
        self.just_opened = false;
        Ok(())
    }

    /// Emits everything above the innermost bracket (or the whole stack).
    fn flush_to_scope(&mut self) -> Result<(), SyntaxError> {
        while let Some(top) = self.operators.pop() {
            match top {
                Pending::Operator(op) => self.output.push(Token::operator(op)),
                Pending::Colon => self.output.push(Token::operator(Operator::Conditional)),
                Pending::Question { position } => {
                    return Err(SyntaxError::MissingColon { position });
                }
                Pending::Open => {
                    self.operators.push(Pending::Open);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Marks the identifier just emitted as a callee.
    fn mark_callee(&mut self) {
        if let Some(last) = self.output.last_mut()
            && matches!(last.value, TokenValue::Identifier(_))
            && last.arity == ARITY_REFERENCE
        {
            last.arity = ARITY_CALLEE;
        }
    }

    fn open(&mut self, kind: ScopeKind, position: usize, options: &ParserOptions) -> Result<(), ParseError> {
        if self.scopes.len() >= options.max_depth {
            return Err(ResourceError::NestingTooDeep {
                limit: options.max_depth,
                position,
            }
            .into());
        }
        if kind == ScopeKind::Call {
            self.mark_callee();
        }
        self.operators.push(Pending::Open);
        self.scopes.push(Scope {
            kind,
            position,
            commas: 0,
            expect_key: kind == ScopeKind::Object,
        });
        self.expect_operand = true;
        self.just_opened = true;
        Ok(())
    }

    fn comma(&mut self, position: usize) -> Result<(), SyntaxError> {
        if self.expect_operand {
            return Err(SyntaxError::ExpectedOperand {
                found: "','".to_string(),
                position,
            });
        }
        self.flush_to_scope()?;
        let scope = match self.scopes.last_mut() {
            Some(scope) if scope.kind.allows_comma() => scope,
            _ => return Err(SyntaxError::UnexpectedComma { position }),
        };
        scope.commas += 1;
        scope.expect_key = scope.kind == ScopeKind::Object;
        self.expect_operand = true;
        self.just_opened = false;
        Ok(())
    }

    fn close(&mut self, found: char, position: usize) -> Result<(), ParseError> {
        let empty = self.expect_operand && self.just_opened;
        if self.expect_operand && !empty {
            return Err(SyntaxError::ExpectedOperand {
                found: format!("'{}'", found),
                position,
            }
            .into());
        }
        self.flush_to_scope()?;
        let scope = self
            .scopes
            .pop()
            .ok_or(LexError::UnexpectedCloser { found, position })?;
        if scope.kind.closer() != found {
            return Err(LexError::MismatchedBracket {
                expected: scope.kind.closer(),
                found,
                position,
            }
            .into());
        }
        self.operators.pop();

        // Non-empty scopes hold one more element than they have commas.
        let elements = if empty { 0 } else { scope.commas + 1 };
        let token = match scope.kind {
            ScopeKind::Group if empty => {
                return Err(SyntaxError::ExpectedOperand {
                    found: "')'".to_string(),
                    position,
                }
                .into());
            }
            ScopeKind::Index if empty => {
                return Err(SyntaxError::ExpectedOperand {
                    found: "']'".to_string(),
                    position,
                }
                .into());
            }
            ScopeKind::Group => None,
            ScopeKind::Index => Some(Token::leaf(TokenValue::Index)),
            ScopeKind::Call => Some(Token::new(TokenValue::Call, elements)),
            ScopeKind::Array if empty => Some(Token::new(TokenValue::Array, ARITY_REFERENCE)),
            ScopeKind::Array => Some(Token::new(TokenValue::Array, elements)),
            ScopeKind::Object => Some(Token::new(TokenValue::Object, elements)),
        };
        self.output.extend(token);
        self.expect_operand = false;
        self.just_opened = false;
        Ok(())
    }

    fn finish(mut self, position: usize) -> Result<Vec<Token>, ParseError> {
        if self.expect_operand && !self.just_opened {
            if self.output.is_empty() && self.operators.is_empty() {
                return Err(SyntaxError::EmptyExpression.into());
            }
            return Err(SyntaxError::ExpectedOperand {
                found: "end of input".to_string(),
                position,
            }
            .into());
        }
        if let Some(scope) = self.scopes.last() {
            return Err(LexError::UnclosedBracket {
                open: scope.kind.opener(),
                position: scope.position,
            }
            .into());
        }
        self.flush_to_scope()?;
        Ok(self.output)
    }

    fn expecting_key(&self) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.kind == ScopeKind::Object && scope.expect_key)
    }

    fn key_read(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.expect_key = false;
        }
        self.just_opened = false;
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Scans an expression and arranges its tokens in evaluation order.
///
/// Each `Lexer` tokenizes a single input; all intermediate state lives in the
/// call to [`Lexer::tokenize`].
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
    options: ParserOptions,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, options: &ParserOptions) -> Self {
        Lexer {
            source,
            position: 0,
            options: *options,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.source[self.position..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if is_identifier_part(ch) {
                self.advance();
            } else {
                break;
            }
        }
        self.source[start..self.position].to_string()
    }

    /// Reads `name(.name)*`; the current char must start an identifier.
    fn read_path(&mut self) -> Result<String, LexError> {
        let mut path = self.read_name();
        while self.current_char() == Some('.') {
            let dot = self.position;
            match self.peek_char(1) {
                Some(ch) if is_identifier_start(ch) => {
                    self.advance();
                    path.push('.');
                    path.push_str(&self.read_name());
                }
                _ => {
                    return Err(LexError::InvalidIdentifier {
                        message: format!("'{}.' must be followed by a property name", path),
                        position: dot,
                    });
                }
            }
        }
        Ok(path)
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.position;
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('b') => result.push('\u{8}'),
                        Some('f') => result.push('\u{c}'),
                        Some('v') => result.push('\u{b}'),
                        Some('0') => result.push('\0'),
                        Some('u') => {
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        // Unknown escapes stand for the escaped character.
                        Some(other) => result.push(other),
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    /// Reads the `uXXXX` part of a `\uXXXX` escape, leaving the cursor after it.
    fn read_unicode_escape(&mut self, escape_at: usize) -> Result<char, LexError> {
        self.advance(); // 'u'
        let start = self.position;
        for _ in 0..4 {
            match self.current_char() {
                Some(ch) if ch.is_ascii_hexdigit() => self.advance(),
                _ => break,
            }
        }
        let digits = &self.source[start..self.position];
        let invalid = || LexError::InvalidEscape {
            sequence: format!("\\u{}", digits),
            position: escape_at,
        };
        if digits.len() != 4 {
            return Err(invalid());
        }
        u32::from_str_radix(digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(invalid)
    }

    fn read_number(&mut self) -> Result<TokenValue, LexError> {
        let start = self.position;
        let text = NUMBER
            .find(&self.source[start..])
            .map(|m| m.as_str())
            .ok_or_else(|| LexError::InvalidNumber {
                text: self.source[start..].chars().take(1).collect(),
                position: start,
            })?;
        self.position += text.len();

        if self.current_char().is_some_and(is_identifier_part) {
            let tail = self.read_name();
            return Err(LexError::InvalidNumber {
                text: format!("{}{}", text, tail),
                position: start,
            });
        }

        let integral = !text.contains(['.', 'e', 'E']);
        if integral && let Ok(n) = text.parse::<i64>() {
            return Ok(TokenValue::Integer(n));
        }
        text.parse::<f64>()
            .map(TokenValue::Float)
            .map_err(|_| LexError::InvalidNumber {
                text: text.to_string(),
                position: start,
            })
    }

    fn read_operator(&mut self) -> Option<&'static str> {
        let rest = &self.source[self.position..];
        let symbol = OPERATOR_SYMBOLS
            .iter()
            .copied()
            .find(|symbol| rest.starts_with(symbol))?;
        self.position += symbol.len();
        Some(symbol)
    }

    /// Reads `key :` inside an object literal.
    fn read_key(&mut self) -> Result<TokenValue, ParseError> {
        let start = self.position;
        let key = match self.current_char() {
            Some(ch) if is_identifier_start(ch) => self.read_name(),
            Some(q @ ('"' | '\'')) => self.read_string(q)?,
            Some(ch) if ch.is_ascii_digit() => match self.read_number()? {
                TokenValue::Float(n) => crate::value::format_number(n),
                other => other.to_string(),
            },
            _ => return Err(SyntaxError::ExpectedObjectKey { position: start }.into()),
        };
        self.skip_whitespace();
        if self.current_char() != Some(':') {
            return Err(SyntaxError::MissingKeyColon {
                key,
                position: self.position,
            }
            .into());
        }
        self.advance();
        Ok(TokenValue::Key(key))
    }

    /// Produces the whole token stream in postfix order.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut shunt = Shunt::new();

        loop {
            self.skip_whitespace();
            let position = self.position;

            if shunt.expecting_key() && self.current_char() != Some('}') {
                let key = self.read_key()?;
                shunt.output.push(Token::leaf(key));
                shunt.key_read();
                continue;
            }

            let Some(ch) = self.current_char() else {
                return shunt.finish(position);
            };

            match ch {
                '"' | '\'' => {
                    let s = self.read_string(ch)?;
                    shunt.emit_operand(Token::leaf(TokenValue::String(s)), position)?;
                }
                '0'..='9' => {
                    let n = self.read_number()?;
                    shunt.emit_operand(Token::leaf(n), position)?;
                }
                '.' if shunt.expect_operand => {
                    if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                        let n = self.read_number()?;
                        shunt.emit_operand(Token::leaf(n), position)?;
                    } else {
                        return Err(LexError::UnexpectedCharacter {
                            character: '.',
                            position,
                        }
                        .into());
                    }
                }
                '.' => {
                    self.advance();
                    self.skip_whitespace();
                    if !self.current_char().is_some_and(is_identifier_start) {
                        return Err(LexError::InvalidIdentifier {
                            message: "'.' must be followed by a property name".to_string(),
                            position,
                        }
                        .into());
                    }
                    let path = self.read_path()?;
                    for segment in path.split('.') {
                        shunt
                            .output
                            .push(Token::leaf(TokenValue::Property(segment.to_string())));
                    }
                    shunt.just_opened = false;
                }
                '@' => {
                    self.advance();
                    if !self.current_char().is_some_and(is_identifier_start) {
                        return Err(LexError::InvalidIdentifier {
                            message: "'@' must be followed by an alias name".to_string(),
                            position,
                        }
                        .into());
                    }
                    let path = self.read_path()?;
                    shunt.emit_operand(Token::identifier(format!("@{}", path)), position)?;
                }
                c if is_identifier_start(c) => {
                    let path = self.read_path()?;
                    let token = match path.as_str() {
                        "true" => Token::leaf(TokenValue::Boolean(true)),
                        "false" => Token::leaf(TokenValue::Boolean(false)),
                        "null" => Token::leaf(TokenValue::Null),
                        "undefined" => Token::leaf(TokenValue::Undefined),
                        _ => Token::identifier(path),
                    };
                    shunt.emit_operand(token, position)?;
                }
                '(' => {
                    self.advance();
                    let kind = if shunt.expect_operand {
                        ScopeKind::Group
                    } else {
                        ScopeKind::Call
                    };
                    shunt.open(kind, position, &self.options)?;
                }
                '[' => {
                    self.advance();
                    let kind = if shunt.expect_operand {
                        ScopeKind::Array
                    } else {
                        ScopeKind::Index
                    };
                    shunt.open(kind, position, &self.options)?;
                }
                '{' => {
                    self.advance();
                    if !shunt.expect_operand {
                        return Err(SyntaxError::UnexpectedToken {
                            token: "{".to_string(),
                            position,
                        }
                        .into());
                    }
                    shunt.open(ScopeKind::Object, position, &self.options)?;
                }
                ')' | ']' | '}' => {
                    self.advance();
                    shunt.close(ch, position)?;
                }
                ',' => {
                    self.advance();
                    shunt.comma(position)?;
                }
                ':' => {
                    self.advance();
                    if shunt.expect_operand {
                        return Err(SyntaxError::ExpectedOperand {
                            found: "':'".to_string(),
                            position,
                        }
                        .into());
                    }
                    shunt.push_colon(position)?;
                }
                '?' if self.peek_char(1) != Some('?') => {
                    self.advance();
                    if shunt.expect_operand {
                        return Err(SyntaxError::ExpectedOperand {
                            found: "'?'".to_string(),
                            position,
                        }
                        .into());
                    }
                    shunt.push_question(position);
                }
                _ => {
                    let Some(symbol) = self.read_operator() else {
                        return Err(LexError::UnexpectedCharacter {
                            character: ch,
                            position,
                        }
                        .into());
                    };
                    if shunt.expect_operand {
                        let op = Operator::unary(symbol).ok_or_else(|| SyntaxError::ExpectedOperand {
                            found: format!("'{}'", symbol),
                            position,
                        })?;
                        shunt.push_unary(op);
                    } else {
                        let op = Operator::binary(symbol).ok_or_else(|| SyntaxError::UnexpectedToken {
                            token: symbol.to_string(),
                            position,
                        })?;
                        shunt.push_binary(op);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn test_precedence_reorders_operators() {
        assert_eq!(rendered("2 + 3 * 4"), ["2/0", "3/0", "4/0", "*/2", "+/2"]);
        assert_eq!(rendered("(2 + 3) * 4"), ["2/0", "3/0", "+/2", "4/0", "*/2"]);
    }

    #[test]
    fn test_left_and_right_associativity() {
        assert_eq!(rendered("a - b - c"), ["a/-1", "b/-1", "-/2", "c/-1", "-/2"]);
        assert_eq!(rendered("a ** b ** c"), ["a/-1", "b/-1", "c/-1", "**/2", "**/2"]);
    }

    #[test]
    fn test_callee_is_marked() {
        assert_eq!(rendered("f(1, 2, 3)"), ["f/-2", "1/0", "2/0", "3/0", "call/3"]);
        assert_eq!(rendered("f()"), ["f/-2", "call/0"]);
    }

    #[test]
    fn test_dangling_colon() {
        assert_eq!(
            tokenize("a : b"),
            Err(ParseError::Syntax(SyntaxError::DanglingColon { position: 2 }))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParserOptions::default().with_max_depth(3);
        let err = tokenize_with("((((1))))", &options).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Resource(ResourceError::NestingTooDeep { limit: 3, .. })
        ));
        assert!(tokenize_with("(((1)))", &options).is_ok());
    }
}
