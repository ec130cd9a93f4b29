use std::fmt;

use crate::ast::Operator;

/// Arity of a bare identifier or an empty array literal.
pub const ARITY_REFERENCE: i32 = -1;

/// Arity of an identifier that is immediately invoked (`f(...)`).
pub const ARITY_CALLEE: i32 = -2;

/// Payload of a [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1e3      // Float, exponent forces a float
    /// ```
    Integer(i64),

    /// Floating point literal
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// .5
    /// 2e-3
    /// ```
    Float(f64),

    /// String literal, escapes already resolved
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    /// `undefined`
    Undefined,

    // References
    /// Dotted path rooted in the context, or in an alias when it starts with `@`.
    ///
    /// # Examples
    /// ```text
    /// item.price       // Identifier("item.price")
    /// @ctx.user.name   // Identifier("@ctx.user.name")
    /// ```
    Identifier(String),

    /// Static member access applied to the operand before it.
    ///
    /// Only emitted when the operand is not a plain identifier path,
    /// since those absorb their dotted segments while scanning.
    ///
    /// # Examples
    /// ```text
    /// items[0].name    // ... Index, Property("name")
    /// f().total        // ... Call, Property("total")
    /// ```
    Property(String),

    /// Object literal key, always followed by the value it names.
    Key(String),

    // Constructs
    /// Unary, binary or conditional operator
    Operator(Operator),

    /// Computed member access `object[key]`
    Index,

    /// Invocation of the callee preceding the arguments
    Call,

    /// Array literal
    Array,

    /// Object literal
    Object,
}

/// A lexical unit in evaluation (postfix) order.
///
/// `arity` overloads its meaning by token kind:
///
/// - `-1`: bare identifier, or an empty array literal
/// - `-2`: identifier that is invoked by the following `Call`
/// - `0`: literal, `Property`, `Index`, `Key`, empty object literal, `f()`
/// - `n > 0`: call arguments, array items or object properties
///
/// Operators carry their operand count.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: TokenValue,
    pub arity: i32,
}

impl Token {
    pub fn new(value: TokenValue, arity: i32) -> Self {
        Token { value, arity }
    }

    /// A zero-arity token (literals, accessors, keys).
    pub fn leaf(value: TokenValue) -> Self {
        Token { value, arity: 0 }
    }

    /// A bare identifier reference.
    pub fn identifier(path: impl Into<String>) -> Self {
        Token {
            value: TokenValue::Identifier(path.into()),
            arity: ARITY_REFERENCE,
        }
    }

    pub fn operator(op: Operator) -> Self {
        Token {
            value: TokenValue::Operator(op),
            arity: op.spec().operands as i32,
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Integer(n) => write!(f, "{}", n),
            TokenValue::Float(n) => write!(f, "{}", n),
            TokenValue::String(s) => write!(f, "{:?}", s),
            TokenValue::Boolean(b) => write!(f, "{}", b),
            TokenValue::Null => write!(f, "null"),
            TokenValue::Undefined => write!(f, "undefined"),
            TokenValue::Identifier(path) => write!(f, "{}", path),
            TokenValue::Property(name) => write!(f, ".{}", name),
            TokenValue::Key(name) => write!(f, "{}:", name),
            TokenValue::Operator(op) => write!(f, "{}", op),
            TokenValue::Index => write!(f, "[]"),
            TokenValue::Call => write!(f, "call"),
            TokenValue::Array => write!(f, "array"),
            TokenValue::Object => write!(f, "object"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.arity)
    }
}
