//! Print the postfix token stream of an expression

use super::CliError;
use crate::{ParserOptions, lexer};

/// One token per line as `value/arity`, in evaluation order.
pub fn render_tokens(expression: &str, options: &ParserOptions) -> Result<String, CliError> {
    let tokens = lexer::tokenize_with(expression, options)?;
    let mut out = String::new();
    for token in &tokens {
        out.push_str(&token.to_string());
        out.push('\n');
    }
    Ok(out)
}
