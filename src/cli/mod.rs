//! CLI support for bindexpr
//!
//! The binary is a thin wrapper around these functions so the same checks
//! can be embedded in other tools.

mod check;
mod tokens;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use tokens::render_tokens;

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// `--aliases` must be a JSON object
    #[error("Aliases must be a JSON object, got {0}")]
    AliasesNotObject(&'static str),
}
