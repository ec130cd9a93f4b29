use std::fmt;

use crate::{evaluator, evaluator::EvalError, value::Value};

/// Operators understood by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Unary
    /// Logical not (`!`)
    Not,
    /// Numeric negation (unary `-`)
    Negate,
    /// Numeric conversion (unary `+`)
    Positive,

    // Arithmetic
    /// Exponentiation (`**`)
    Power,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Remainder (`%`)
    Remainder,
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,

    // Comparison
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Loose equality (`==`)
    Equal,
    /// Loose inequality (`!=`)
    NotEqual,
    /// Strict equality (`===`)
    StrictEqual,
    /// Strict inequality (`!==`)
    StrictNotEqual,

    // Logical
    /// Logical and (`&&`)
    And,
    /// Logical or (`||`)
    Or,
    /// Nullish coalescing (`??`)
    Coalesce,

    /// Conditional (`cond ? then : else`)
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

pub type UnaryFn = fn(&Value) -> Result<Value, EvalError>;
pub type BinaryFn = fn(&Value, &Value) -> Result<Value, EvalError>;

/// How an operator turns its operands into a value.
#[derive(Clone, Copy)]
pub enum Apply {
    Unary(UnaryFn),
    Binary(BinaryFn),
    /// Right operand is evaluated only when the left one does not decide the result.
    ShortCircuit,
    /// Only the selected branch is evaluated.
    Conditional,
}

impl fmt::Debug for Apply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Apply::Unary(_) => write!(f, "Unary"),
            Apply::Binary(_) => write!(f, "Binary"),
            Apply::ShortCircuit => write!(f, "ShortCircuit"),
            Apply::Conditional => write!(f, "Conditional"),
        }
    }
}

/// Precedence table entry for an [`Operator`].
#[derive(Debug, Clone, Copy)]
pub struct OperatorSpec {
    pub symbol: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub operands: usize,
    pub apply: Apply,
}

const fn spec(
    symbol: &'static str,
    precedence: u8,
    associativity: Associativity,
    operands: usize,
    apply: Apply,
) -> OperatorSpec {
    OperatorSpec {
        symbol,
        precedence,
        associativity,
        operands,
        apply,
    }
}

impl Operator {
    pub fn spec(self) -> OperatorSpec {
        use Associativity::*;
        match self {
            Operator::Not => spec("!", 14, Right, 1, Apply::Unary(evaluator::not)),
            Operator::Negate => spec("-", 14, Right, 1, Apply::Unary(evaluator::negate)),
            Operator::Positive => spec("+", 14, Right, 1, Apply::Unary(evaluator::positive)),
            Operator::Power => spec("**", 13, Right, 2, Apply::Binary(evaluator::power)),
            Operator::Multiply => spec("*", 12, Left, 2, Apply::Binary(evaluator::multiply)),
            Operator::Divide => spec("/", 12, Left, 2, Apply::Binary(evaluator::divide)),
            Operator::Remainder => spec("%", 12, Left, 2, Apply::Binary(evaluator::remainder)),
            Operator::Add => spec("+", 11, Left, 2, Apply::Binary(evaluator::add)),
            Operator::Subtract => spec("-", 11, Left, 2, Apply::Binary(evaluator::subtract)),
            Operator::LessThan => spec("<", 9, Left, 2, Apply::Binary(evaluator::less_than)),
            Operator::LessEqual => spec("<=", 9, Left, 2, Apply::Binary(evaluator::less_equal)),
            Operator::GreaterThan => spec(">", 9, Left, 2, Apply::Binary(evaluator::greater_than)),
            Operator::GreaterEqual => {
                spec(">=", 9, Left, 2, Apply::Binary(evaluator::greater_equal))
            }
            Operator::Equal => spec("==", 8, Left, 2, Apply::Binary(evaluator::loose_equal)),
            Operator::NotEqual => {
                spec("!=", 8, Left, 2, Apply::Binary(evaluator::loose_not_equal))
            }
            Operator::StrictEqual => {
                spec("===", 8, Left, 2, Apply::Binary(evaluator::strict_equal))
            }
            Operator::StrictNotEqual => {
                spec("!==", 8, Left, 2, Apply::Binary(evaluator::strict_not_equal))
            }
            Operator::And => spec("&&", 4, Left, 2, Apply::ShortCircuit),
            Operator::Or => spec("||", 3, Left, 2, Apply::ShortCircuit),
            Operator::Coalesce => spec("??", 3, Left, 2, Apply::ShortCircuit),
            Operator::Conditional => spec("?:", 2, Right, 3, Apply::Conditional),
        }
    }

    /// Binary operator spelled exactly `symbol`.
    pub fn binary(symbol: &str) -> Option<Operator> {
        let op = match symbol {
            "**" => Operator::Power,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "%" => Operator::Remainder,
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "<" => Operator::LessThan,
            "<=" => Operator::LessEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterEqual,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "===" => Operator::StrictEqual,
            "!==" => Operator::StrictNotEqual,
            "&&" => Operator::And,
            "||" => Operator::Or,
            "??" => Operator::Coalesce,
            _ => return None,
        };
        Some(op)
    }

    /// Prefix operator spelled exactly `symbol`.
    pub fn unary(symbol: &str) -> Option<Operator> {
        match symbol {
            "!" => Some(Operator::Not),
            "-" => Some(Operator::Negate),
            "+" => Some(Operator::Positive),
            _ => None,
        }
    }

    /// Whether `self`, already on the operator stack, must be emitted before `incoming`.
    pub fn yields_to(self, incoming: Operator) -> bool {
        let top = self.spec();
        let next = incoming.spec();
        top.precedence > next.precedence
            || (top.precedence == next.precedence && next.associativity == Associativity::Left)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Negate => write!(f, "neg"),
            Operator::Positive => write!(f, "pos"),
            _ => write!(f, "{}", self.spec().symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_associative_yields_on_equal_precedence() {
        assert!(Operator::Subtract.yields_to(Operator::Add));
        assert!(Operator::Multiply.yields_to(Operator::Add));
        assert!(!Operator::Add.yields_to(Operator::Multiply));
    }

    #[test]
    fn test_right_associative_does_not_yield() {
        assert!(!Operator::Power.yields_to(Operator::Power));
        assert!(Operator::Negate.yields_to(Operator::Power));
    }

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Operator::binary("==="), Some(Operator::StrictEqual));
        assert_eq!(Operator::binary("!"), None);
        assert_eq!(Operator::unary("-"), Some(Operator::Negate));
        assert_eq!(Operator::Conditional.spec().operands, 3);
    }
}
