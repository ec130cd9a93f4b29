//! Parse an expression and evaluate it against JSON input

use super::CliError;
use crate::{Aliases, Parser, ParserOptions, Value};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to check
    pub expression: String,
    /// JSON context; evaluates against `undefined` when absent
    pub input: Option<String>,
    /// JSON object of alias values
    pub aliases: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
    pub parser: ParserOptions,
}

/// Result of a check operation
#[derive(Debug)]
pub struct CheckResult {
    /// Context paths the expression reads
    pub identifiers: Vec<String>,
    /// Alias paths the expression reads
    pub aliases: Vec<String>,
    /// Evaluation result, `None` with `syntax_only`
    pub output: Option<serde_json::Value>,
}

impl CheckResult {
    pub fn to_json(&self) -> serde_json::Value {
        let mut report = serde_json::json!({
            "identifiers": self.identifiers,
            "aliases": self.aliases,
        });
        if let Some(output) = &self.output {
            report["output"] = output.clone();
        }
        report
    }
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let parsed = Parser::new(options.parser).parse(&options.expression)?;
    let mut result = CheckResult {
        identifiers: parsed.identifiers().to_vec(),
        aliases: parsed.aliases().to_vec(),
        output: None,
    };
    if options.syntax_only {
        return Ok(result);
    }

    let context = match &options.input {
        Some(json) => Value::from(serde_json::from_str::<serde_json::Value>(json)?),
        None => Value::Undefined,
    };
    let aliases = match &options.aliases {
        Some(json) => parse_aliases(json)?,
        None => Aliases::new(),
    };

    let value = parsed.evaluate(&context, &aliases)?;
    result.output = Some(value.to_json());
    Ok(result)
}

fn parse_aliases(json: &str) -> Result<Aliases, CliError> {
    match Value::from(serde_json::from_str::<serde_json::Value>(json)?) {
        Value::Object(map) => Ok(map),
        other => Err(CliError::AliasesNotObject(other.type_name())),
    }
}
