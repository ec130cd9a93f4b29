use std::sync::Arc;

use crate::{
    ast::Expr,
    evaluator::{EvalError, Evaluator},
    value::{Aliases, Value},
};

/// A compiled binding expression.
///
/// Cheap to clone: the tree and metadata are shared. The only thing a
/// consumer may change is the one-time flag, and only on its own copy
/// (see [`ParsedExpression::as_one_time`]).
///
/// # Examples
///
/// ```
/// use bindexpr::{Aliases, Value, parse};
/// use serde_json::json;
///
/// let expr = parse("item.price * qty").unwrap();
/// assert_eq!(expr.identifiers(), ["item.price", "qty"]);
///
/// let context = Value::from(json!({"item": {"price": 4}, "qty": 3}));
/// assert_eq!(expr.evaluate(&context, &Aliases::new()).unwrap(), Value::Integer(12));
/// ```
#[derive(Debug, Clone)]
pub struct ParsedExpression {
    source: Arc<str>,
    root: Arc<Expr>,
    identifiers: Arc<[String]>,
    aliases: Arc<[String]>,
    one_time: bool,
}

impl ParsedExpression {
    pub fn new(source: &str, root: Expr, identifiers: Vec<String>, aliases: Vec<String>) -> Self {
        ParsedExpression {
            source: source.into(),
            root: Arc::new(root),
            identifiers: identifiers.into(),
            aliases: aliases.into(),
            one_time: false,
        }
    }

    /// Evaluates against `context`, resolving `@name` through `aliases`.
    pub fn evaluate(&self, context: &Value, aliases: &Aliases) -> Result<Value, EvalError> {
        Evaluator::new(context, aliases).eval(&self.root)
    }

    /// The source string this expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Context paths read by the expression, in order of first appearance.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Alias paths read by the expression, without the `@` sigil.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    /// Copy flagged for one-time binding. Shares the compiled tree with `self`,
    /// which stays unchanged.
    pub fn as_one_time(&self) -> ParsedExpression {
        ParsedExpression {
            one_time: true,
            ..self.clone()
        }
    }

    /// Whether two expressions share the same compiled tree.
    pub fn shares_tree_with(&self, other: &ParsedExpression) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }
}
