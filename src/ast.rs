//! # Binding expressions - token and tree types
//!
//! Template markup carries small JavaScript-like expressions:
//!
//! ```text
//! item.price * qty
//! user.active ? user.name.toUpperCase() : "guest"
//! @row.index + 1
//! ```
//!
//! They go through two stages before they can be evaluated:
//!
//! - **[tokens]** - the tokenizer emits [`Token`]s already arranged in postfix
//!   (evaluation) order, each annotated with an arity
//! - **[expressions]** - the compiler folds that stream into an [`Expr`] tree
//!
//! The **[operators]** table drives both: the tokenizer resolves precedence
//! and associativity with it, the evaluator applies operators through it.
//!
//! ## Postfix order
//!
//! ```text
//! a.b + c * 2      =>   a.b  c  2  *  +
//! f(x, 1)          =>   f/-2  x  1  call/2
//! [1, a]           =>   1  a  array/2
//! {k: v}           =>   k:  v  object/1
//! ```
//!
//! ## Paths and aliases
//!
//! Dotted paths (`a.b.c`) are scanned as one identifier token. Paths that start
//! with `@` resolve against the alias map instead of the context.
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, PathRoot};
pub use operators::{Apply, Associativity, Operator, OperatorSpec};
pub use tokens::{ARITY_CALLEE, ARITY_REFERENCE, Token, TokenValue};
