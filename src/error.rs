use thiserror::Error;

use crate::{lexer::LexError, lexer::SyntaxError, parser::CompileError};

/// Input rejected because it exceeds a configured limit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("expression is {length} characters long, limit is {limit}")]
    InputTooLong { length: usize, limit: usize },

    #[error("brackets nested deeper than {limit} levels at position {position}")]
    NestingTooDeep { limit: usize, position: usize },

    #[error("expression tree deeper than {limit} levels")]
    ExpressionTooDeep { limit: usize },
}

/// Any failure to turn a source string into a parsed expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}
