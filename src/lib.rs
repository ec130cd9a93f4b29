//! Binding-expression engine: tokenizes JavaScript-like expression strings
//! into postfix order, compiles them into shared expression trees with the
//! context paths they read, and evaluates them with safe navigation.
//!
//! ```
//! use bindexpr::{Aliases, ExpressionCache, Value};
//! use serde_json::json;
//!
//! let cache = ExpressionCache::new();
//! let expr = cache.parse("user.name ?? 'anonymous'").unwrap();
//! assert_eq!(expr.identifiers(), ["user.name"]);
//!
//! let value = expr.evaluate(&Value::from(json!({})), &Aliases::new()).unwrap();
//! assert_eq!(value, Value::from("anonymous"));
//! ```

pub mod ast;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod value;

pub use ast::{Expr, Operator, PathRoot, Token, TokenValue};
pub use cache::ExpressionCache;
pub use error::{ParseError, ResourceError};
pub use evaluator::{EvalError, Evaluator};
pub use expression::ParsedExpression;
pub use lexer::{LexError, Lexer, SyntaxError, tokenize};
pub use options::ParserOptions;
pub use parser::{CompileError, Parser, compile, parse};
pub use value::{Aliases, Function, Value};
