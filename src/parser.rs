use indexmap::IndexSet;
use thiserror::Error;

use crate::{
    ast::{ARITY_CALLEE, ARITY_REFERENCE, Expr, Operator, PathRoot, Token, TokenValue},
    error::{ParseError, ResourceError},
    expression::ParsedExpression,
    lexer,
    options::ParserOptions,
    value::Value,
};

/// Structural problems in a token stream.
///
/// Streams produced by the tokenizer never trigger these; hand-built streams can.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("token stream is empty")]
    EmptyStream,

    #[error("token '{token}' has invalid arity {arity}")]
    InvalidArity { token: String, arity: i32 },

    #[error("'{token}' needs {expected} operands but only {found} are available")]
    MissingOperands {
        token: String,
        expected: usize,
        found: usize,
    },

    #[error("{count} operand(s) left over after the whole expression")]
    LeftoverOperands { count: usize },

    #[error("object key '{key}' used outside of an object literal")]
    MisplacedKey { key: String },

    #[error("object literal entry {index} has no key")]
    MissingKey { index: usize },

    #[error("invalid identifier '{text}'")]
    InvalidIdentifier { text: String },
}

/// Parses `source` with default limits, without caching.
///
/// # Examples
///
/// ```
/// use bindexpr::{Aliases, Value, parse};
///
/// let expr = parse("a.b.c + d").unwrap();
/// assert_eq!(expr.identifiers(), ["a.b.c", "d"]);
///
/// let result = expr.evaluate(&Value::Undefined, &Aliases::new()).unwrap();
/// assert!(matches!(result, Value::Float(n) if n.is_nan()));
/// ```
pub fn parse(source: &str) -> Result<ParsedExpression, ParseError> {
    Parser::default().parse(source)
}

/// Compiles a pre-built postfix token stream with default limits.
///
/// The resulting expression has an empty `source`.
pub fn compile(tokens: &[Token]) -> Result<ParsedExpression, ParseError> {
    Parser::default().compile("", tokens)
}

/// Tokenizer plus compiler, sharing one set of limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Parser { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn parse(&self, source: &str) -> Result<ParsedExpression, ParseError> {
        let tokens = lexer::tokenize_with(source, &self.options)?;
        self.compile(source, &tokens)
    }

    /// Folds postfix `tokens` into an expression tree.
    ///
    /// All working state lives in a [`CompileState`] local to this call.
    pub fn compile(&self, source: &str, tokens: &[Token]) -> Result<ParsedExpression, ParseError> {
        let mut state = CompileState::new(self.options.max_depth);
        for (ordinal, token) in tokens.iter().enumerate() {
            state.step(ordinal, token)?;
        }
        let (root, identifiers, aliases) = state.finish()?;
        log::debug!(
            "compiled {:?}: identifiers={:?} aliases={:?}",
            source,
            identifiers,
            aliases
        );
        Ok(ParsedExpression::new(source, root, identifiers, aliases))
    }
}

/// A path whose identifier has not been recorded yet, because a following
/// accessor may still extend it.
#[derive(Debug)]
struct PendingPath {
    root: PathRoot,
    segments: Vec<String>,
    /// Index of the token that started the path; orders discovery
    ordinal: usize,
    callee: bool,
}

#[derive(Debug)]
enum Fragment {
    Path(PendingPath),
    Key(String),
    Node { expr: Expr, depth: usize },
}

impl Fragment {
    fn literal(value: Value) -> Self {
        Fragment::Node {
            expr: Expr::Literal(value),
            depth: 1,
        }
    }
}

/// Per-compile working state.
struct CompileState {
    stack: Vec<Fragment>,
    identifiers: Vec<(usize, String)>,
    aliases: Vec<(usize, String)>,
    max_depth: usize,
}

impl CompileState {
    fn new(max_depth: usize) -> Self {
        CompileState {
            stack: Vec::new(),
            identifiers: Vec::new(),
            aliases: Vec::new(),
            max_depth,
        }
    }

    fn step(&mut self, ordinal: usize, token: &Token) -> Result<(), ParseError> {
        match &token.value {
            TokenValue::Integer(n) => self.push_leaf(token, Value::Integer(*n)),
            TokenValue::Float(n) => self.push_leaf(token, Value::Float(*n)),
            TokenValue::String(s) => self.push_leaf(token, Value::String(s.clone())),
            TokenValue::Boolean(b) => self.push_leaf(token, Value::Boolean(*b)),
            TokenValue::Null => self.push_leaf(token, Value::Null),
            TokenValue::Undefined => self.push_leaf(token, Value::Undefined),
            TokenValue::Identifier(text) => {
                let callee = match token.arity {
                    ARITY_REFERENCE => false,
                    ARITY_CALLEE => true,
                    _ => return Err(invalid_arity(token).into()),
                };
                let (root, segments) = split_identifier(text)?;
                self.stack.push(Fragment::Path(PendingPath {
                    root,
                    segments,
                    ordinal,
                    callee,
                }));
                Ok(())
            }
            TokenValue::Key(name) => {
                expect_arity(token, 0)?;
                self.stack.push(Fragment::Key(name.clone()));
                Ok(())
            }
            TokenValue::Property(name) => {
                expect_arity(token, 0)?;
                let [target] = self.pop_array(token)?;
                self.member(target, Fragment::literal(Value::String(name.clone())))
            }
            TokenValue::Index => {
                expect_arity(token, 0)?;
                let [object, key] = self.pop_array(token)?;
                self.member(object, key)
            }
            TokenValue::Call => {
                let count = usize::try_from(token.arity).map_err(|_| invalid_arity(token))?;
                let mut fragments = self.pop_n(token, count + 1)?;
                let args = fragments.split_off(1);
                let callee = match fragments.pop() {
                    Some(Fragment::Path(mut path)) => {
                        path.callee = true;
                        Fragment::Path(path)
                    }
                    Some(other) => other,
                    None => return Err(CompileError::EmptyStream.into()),
                };
                let (callee, callee_depth) = self.finalize(callee)?;
                let (args, depth) = self.finalize_all(args)?;
                self.push_node(
                    Expr::Call {
                        callee: Box::new(callee),
                        args,
                    },
                    depth.max(callee_depth),
                )
            }
            TokenValue::Array => {
                let count = match token.arity {
                    ARITY_REFERENCE => 0,
                    n if n > 0 => n as usize,
                    _ => return Err(invalid_arity(token).into()),
                };
                let items = self.pop_n(token, count)?;
                let (items, depth) = self.finalize_all(items)?;
                self.push_node(Expr::Array(items), depth)
            }
            TokenValue::Object => {
                let count = usize::try_from(token.arity).map_err(|_| invalid_arity(token))?;
                let fragments = self.pop_n(token, count * 2)?;
                let mut entries = Vec::with_capacity(count);
                let mut depth = 0;
                let mut fragments = fragments.into_iter();
                for index in 0..count {
                    let key = match fragments.next() {
                        Some(Fragment::Key(key)) => key,
                        _ => return Err(CompileError::MissingKey { index }.into()),
                    };
                    let value = fragments.next().ok_or(CompileError::MissingKey { index })?;
                    let (value, value_depth) = self.finalize(value)?;
                    depth = depth.max(value_depth);
                    entries.push((key, value));
                }
                self.push_node(Expr::Object(entries), depth)
            }
            TokenValue::Operator(op) => {
                let spec = op.spec();
                expect_arity(token, spec.operands as i32)?;
                let operands = self.pop_n(token, spec.operands)?;
                let (mut operands, depth) = self.finalize_all(operands)?;
                let expr = match (*op, operands.len()) {
                    (Operator::Conditional, 3) => {
                        let otherwise = operands.pop();
                        let then = operands.pop();
                        let condition = operands.pop();
                        match (condition, then, otherwise) {
                            (Some(condition), Some(then), Some(otherwise)) => Expr::Conditional {
                                condition: Box::new(condition),
                                then: Box::new(then),
                                otherwise: Box::new(otherwise),
                            },
                            _ => return Err(invalid_arity(token).into()),
                        }
                    }
                    (op, 2) => {
                        let right = operands.pop();
                        let left = operands.pop();
                        match (left, right) {
                            (Some(left), Some(right)) => Expr::Binary {
                                op,
                                left: Box::new(left),
                                right: Box::new(right),
                            },
                            _ => return Err(invalid_arity(token).into()),
                        }
                    }
                    (op, 1) => match operands.pop() {
                        Some(operand) => Expr::Unary {
                            op,
                            operand: Box::new(operand),
                        },
                        None => return Err(invalid_arity(token).into()),
                    },
                    _ => return Err(invalid_arity(token).into()),
                };
                self.push_node(expr, depth)
            }
        }
    }

    fn push_leaf(&mut self, token: &Token, value: Value) -> Result<(), ParseError> {
        expect_arity(token, 0)?;
        self.stack.push(Fragment::literal(value));
        Ok(())
    }

    /// Pushes a composite node whose deepest child has depth `child_depth`.
    fn push_node(&mut self, expr: Expr, child_depth: usize) -> Result<(), ParseError> {
        let depth = child_depth + 1;
        if depth > self.max_depth {
            return Err(ResourceError::ExpressionTooDeep {
                limit: self.max_depth,
            }
            .into());
        }
        self.stack.push(Fragment::Node { expr, depth });
        Ok(())
    }

    /// Pops the top `n` fragments, oldest first.
    fn pop_n(&mut self, token: &Token, n: usize) -> Result<Vec<Fragment>, CompileError> {
        if self.stack.len() < n {
            return Err(CompileError::MissingOperands {
                token: token.value.to_string(),
                expected: n,
                found: self.stack.len(),
            });
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_array<const N: usize>(&mut self, token: &Token) -> Result<[Fragment; N], CompileError> {
        let fragments = self.pop_n(token, N)?;
        fragments.try_into().map_err(|_| CompileError::MissingOperands {
            token: token.value.to_string(),
            expected: N,
            found: 0,
        })
    }

    /// Member access: extends a pending path when the key is a literal,
    /// otherwise builds an index node.
    fn member(&mut self, object: Fragment, key: Fragment) -> Result<(), ParseError> {
        match (object, literal_segment(&key)) {
            (Fragment::Path(mut path), Some(segment)) if !path.callee => {
                path.segments.push(segment);
                self.stack.push(Fragment::Path(path));
                Ok(())
            }
            (object, _) => self.index(object, key),
        }
    }

    fn index(&mut self, object: Fragment, key: Fragment) -> Result<(), ParseError> {
        let (object, object_depth) = self.finalize(object)?;
        let (key, key_depth) = self.finalize(key)?;
        self.push_node(
            Expr::Index {
                object: Box::new(object),
                key: Box::new(key),
            },
            object_depth.max(key_depth),
        )
    }

    /// Turns a fragment into an expression, recording pending paths.
    fn finalize(&mut self, fragment: Fragment) -> Result<(Expr, usize), CompileError> {
        match fragment {
            Fragment::Node { expr, depth } => Ok((expr, depth)),
            Fragment::Key(key) => Err(CompileError::MisplacedKey { key }),
            Fragment::Path(path) => {
                self.record(&path);
                Ok((
                    Expr::Path {
                        root: path.root,
                        segments: path.segments,
                    },
                    1,
                ))
            }
        }
    }

    fn finalize_all(&mut self, fragments: Vec<Fragment>) -> Result<(Vec<Expr>, usize), CompileError> {
        let mut depth = 0;
        let mut exprs = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let (expr, d) = self.finalize(fragment)?;
            depth = depth.max(d);
            exprs.push(expr);
        }
        Ok((exprs, depth))
    }

    /// Callees are recorded through their receiver: `user.name.trim()`
    /// watches `user.name`, a bare `f()` watches `f`.
    fn record(&mut self, path: &PendingPath) {
        let mut parts: Vec<&str> = Vec::with_capacity(path.segments.len() + 1);
        if let PathRoot::Alias(name) = &path.root {
            parts.push(name);
        }
        parts.extend(path.segments.iter().map(String::as_str));
        if path.callee && parts.len() > 1 {
            parts.pop();
        }
        let dotted = parts.join(".");
        match path.root {
            PathRoot::Context => self.identifiers.push((path.ordinal, dotted)),
            PathRoot::Alias(_) => self.aliases.push((path.ordinal, dotted)),
        }
    }

    fn finish(mut self) -> Result<(Expr, Vec<String>, Vec<String>), ParseError> {
        // Whatever is still pending is the whole expression.
        let last = match self.stack.len() {
            0 => return Err(CompileError::EmptyStream.into()),
            1 => self.stack.pop().ok_or(CompileError::EmptyStream)?,
            n => return Err(CompileError::LeftoverOperands { count: n - 1 }.into()),
        };
        let (root, _) = self.finalize(last)?;
        Ok((
            root,
            in_discovery_order(self.identifiers),
            in_discovery_order(self.aliases),
        ))
    }
}

/// Orders by first token ordinal and drops repeats.
fn in_discovery_order(mut found: Vec<(usize, String)>) -> Vec<String> {
    found.sort_by_key(|(ordinal, _)| *ordinal);
    found
        .into_iter()
        .map(|(_, name)| name)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Literal keys that can extend a dotted path.
fn literal_segment(key: &Fragment) -> Option<String> {
    match key {
        Fragment::Node {
            expr: Expr::Literal(Value::String(s)),
            ..
        } => Some(s.clone()),
        Fragment::Node {
            expr: Expr::Literal(Value::Integer(n)),
            ..
        } if *n >= 0 => Some(n.to_string()),
        _ => None,
    }
}

/// Splits `a.b.c` or `@alias.b.c` into a root and segments.
fn split_identifier(text: &str) -> Result<(PathRoot, Vec<String>), CompileError> {
    let invalid = || CompileError::InvalidIdentifier {
        text: text.to_string(),
    };
    let (is_alias, body) = match text.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let parts: Vec<String> = body.split('.').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(invalid());
    }
    if is_alias {
        let mut parts = parts.into_iter();
        let name = parts.next().ok_or_else(invalid)?;
        Ok((PathRoot::Alias(name), parts.collect()))
    } else {
        Ok((PathRoot::Context, parts))
    }
}

fn expect_arity(token: &Token, arity: i32) -> Result<(), CompileError> {
    if token.arity == arity {
        Ok(())
    } else {
        Err(invalid_arity(token))
    }
}

fn invalid_arity(token: &Token) -> CompileError {
    CompileError::InvalidArity {
        token: token.value.to_string(),
        arity: token.arity,
    }
}
