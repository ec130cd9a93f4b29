use crate::{ast::Operator, value::Value};

/// Where a path starts resolving.
#[derive(Debug, Clone, PartialEq)]
pub enum PathRoot {
    /// The evaluation context object
    Context,
    /// A named entry in the alias map (`@name`)
    Alias(String),
}

/// Compiled expression tree, interpreted by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// "hello"
    /// null
    /// ```
    Literal(Value),

    /// Safe-navigation path
    ///
    /// # Examples
    /// ```text
    /// item.price        // Path { root: Context, segments: ["item", "price"] }
    /// items[0].name     // Path { root: Context, segments: ["items", "0", "name"] }
    /// @ctx.user         // Path { root: Alias("ctx"), segments: ["user"] }
    /// ```
    Path {
        root: PathRoot,
        segments: Vec<String>,
    },

    /// Member access on a computed value, or with a computed key
    ///
    /// # Examples
    /// ```text
    /// items[i]
    /// f().total
    /// ```
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },

    /// Prefix operator application
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },

    /// Binary operator application, including short-circuit operators
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Function or method invocation
    ///
    /// When `callee` is a path or an index expression, the part before the last
    /// member is the receiver used for built-in method lookup.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Array literal
    Array(Vec<Expr>),

    /// Object literal, keys in source order
    Object(Vec<(String, Expr)>),
}

impl Expr {
    pub fn context_path<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Expr::Path {
            root: PathRoot::Context,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}
