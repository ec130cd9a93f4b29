use std::{borrow::Cow, cmp::Ordering};

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

use crate::{
    ast::{Apply, Expr, Operator, PathRoot},
    value::{Aliases, Value, format_number},
};

/// Errors that can occur while evaluating an expression.
///
/// Missing values never raise; these only come from invoking things.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Callee resolved to something other than a function
    #[error("{callee} is not a function (found {found})")]
    NotCallable { callee: String, found: &'static str },

    /// Argument count differs from the declared arity
    #[error("{name} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// No built-in method with that name for the receiver type
    #[error("{type_name} has no method '{method}'")]
    UnknownMethod {
        method: String,
        type_name: &'static str,
    },

    /// Invalid operation for the given values
    #[error("type error: {0}")]
    TypeError(String),

    /// Error raised by a host function
    #[error("{name} failed: {message}")]
    Host { name: String, message: String },
}

/// Tree-walking interpreter for one evaluation.
pub struct Evaluator<'a> {
    /// The object unqualified paths resolve against
    context: &'a Value,
    /// Values referenced as `@name`
    aliases: &'a Aliases,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a Value, aliases: &'a Aliases) -> Self {
        Evaluator { context, aliases }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path { root, segments } => Ok(self.resolve(root, segments).into_owned()),
            Expr::Index { object, key } => {
                let object = self.eval(object)?;
                let key = property_key(&self.eval(key)?);
                Ok(object
                    .get(&key)
                    .map(Cow::into_owned)
                    .unwrap_or(Value::Undefined))
            }
            Expr::Unary { op, operand } => match op.spec().apply {
                Apply::Unary(apply) => apply(&self.eval(operand)?),
                _ => Err(EvalError::TypeError(format!("'{}' is not a prefix operator", op))),
            },
            Expr::Binary { op, left, right } => match op.spec().apply {
                Apply::Binary(apply) => {
                    let left = self.eval(left)?;
                    let right = self.eval(right)?;
                    apply(&left, &right)
                }
                Apply::ShortCircuit => self.short_circuit(*op, left, right),
                _ => Err(EvalError::TypeError(format!("'{}' is not a binary operator", op))),
            },
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(entries) => {
                let mut map = std::collections::HashMap::with_capacity(entries.len());
                for (key, expr) in entries {
                    map.insert(key.clone(), self.eval(expr)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn root(&self, root: &PathRoot) -> Option<&'a Value> {
        match root {
            PathRoot::Context => Some(self.context),
            PathRoot::Alias(name) => self.aliases.get(name),
        }
    }

    /// Safe navigation: anything missing along the way yields `undefined`.
    fn resolve(&self, root: &PathRoot, segments: &[String]) -> Cow<'a, Value> {
        match self.root(root) {
            Some(start) => walk(Cow::Borrowed(start), segments),
            None => Cow::Owned(Value::Undefined),
        }
    }

    fn short_circuit(&self, op: Operator, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let left = self.eval(left)?;
        let decided = match op {
            Operator::And => !left.is_truthy(),
            Operator::Or => left.is_truthy(),
            Operator::Coalesce => !left.is_nullish(),
            _ => {
                return Err(EvalError::TypeError(format!(
                    "'{}' does not short-circuit",
                    op
                )));
            }
        };
        if decided { Ok(left) } else { self.eval(right) }
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Method calls look the member up on the receiver first, then fall back
    /// to built-in methods. A missing receiver yields `undefined`.
    fn eval_call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let (receiver, name) = match callee {
            Expr::Path { root, segments } if !segments.is_empty() => {
                let (name, receiver_path) = match segments.split_last() {
                    Some(split) => split,
                    None => return Ok(Value::Undefined),
                };
                (self.resolve(root, receiver_path), name.clone())
            }
            Expr::Index { object, key } => {
                let receiver = self.eval(object)?;
                (Cow::Owned(receiver), property_key(&self.eval(key)?))
            }
            other => {
                let target = self.eval(other)?;
                let args = self.eval_args(args)?;
                return match target {
                    Value::Function(f) => f.call(&args),
                    found => Err(EvalError::NotCallable {
                        callee: describe(other),
                        found: found.type_name(),
                    }),
                };
            }
        };

        if receiver.is_nullish() {
            return Ok(Value::Undefined);
        }
        let args = self.eval_args(args)?;
        match receiver.get(&name) {
            Some(member) => match member.as_ref() {
                Value::Function(f) => f.call(&args),
                found => Err(EvalError::NotCallable {
                    callee: name,
                    found: found.type_name(),
                }),
            },
            None => call_method(&receiver, &name, &args),
        }
    }
}

fn walk<'v>(start: Cow<'v, Value>, segments: &[String]) -> Cow<'v, Value> {
    let mut current = start;
    for segment in segments {
        let next = match current {
            Cow::Borrowed(value) => value.get(segment),
            Cow::Owned(value) => value.get(segment).map(|v| Cow::Owned(v.into_owned())),
        };
        match next {
            Some(value) => current = value,
            None => return Cow::Owned(Value::Undefined),
        }
    }
    current
}

/// Property name used for a computed key.
fn property_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Float(n) => format_number(*n),
        other => other.to_js_string(),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Path {
            root: PathRoot::Alias(name),
            segments,
        } => std::iter::once(format!("@{}", name))
            .chain(segments.iter().cloned())
            .collect::<Vec<_>>()
            .join("."),
        Expr::Path { segments, .. } => segments.join("."),
        Expr::Literal(value) => value.to_js_string(),
        _ => "expression".to_string(),
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Number {
        match value {
            Value::Integer(n) => Number::Int(*n),
            Value::Boolean(b) => Number::Int(*b as i64),
            Value::Null => Number::Int(0),
            other => Number::Float(other.to_number()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl Arith {
    fn floats(self, a: f64, b: f64) -> f64 {
        match self {
            Arith::Add => a + b,
            Arith::Subtract => a - b,
            Arith::Multiply => a * b,
            Arith::Divide => a / b,
            Arith::Remainder => a % b,
        }
    }

    fn integers(self, a: i64, b: i64) -> Option<Value> {
        let result = match self {
            Arith::Add => a.checked_add(b),
            Arith::Subtract => a.checked_sub(b),
            Arith::Multiply => a.checked_mul(b),
            Arith::Divide => {
                if b == 0 || a.checked_rem(b)? != 0 {
                    return None;
                }
                a.checked_div(b)
            }
            Arith::Remainder => {
                if b == 0 {
                    return None;
                }
                a.checked_rem(b)
            }
        };
        result.map(Value::Integer)
    }

    fn decimals(self, a: Decimal, b: Decimal) -> Option<Decimal> {
        match self {
            Arith::Add => a.checked_add(b),
            Arith::Subtract => a.checked_sub(b),
            Arith::Multiply => a.checked_mul(b),
            Arith::Divide => a.checked_div(b),
            Arith::Remainder => a.checked_rem(b),
        }
    }
}

/// Integer pairs stay integral, mixed pairs go through decimal arithmetic so
/// `0.1 * 3` style results collapse back to whole integers, everything else
/// is plain float arithmetic.
fn arithmetic(op: Arith, left: &Value, right: &Value) -> Value {
    match (Number::of(left), Number::of(right)) {
        (Number::Int(a), Number::Int(b)) => op
            .integers(a, b)
            .unwrap_or_else(|| Value::Float(op.floats(a as f64, b as f64))),
        (Number::Float(a), Number::Float(b)) => Value::Float(op.floats(a, b)),
        (a, b) => {
            let (af, bf) = (a.as_f64(), b.as_f64());
            if let Some(ad) = Decimal::from_f64(af)
                && let Some(bd) = Decimal::from_f64(bf)
                && let Some(rd) = op.decimals(ad, bd)
            {
                if rd.is_integer()
                    && let Some(r) = rd.to_i64()
                {
                    return Value::Integer(r);
                } else if let Some(r) = rd.to_f64() {
                    return Value::Float(r);
                }
            }
            Value::Float(op.floats(af, bf))
        }
    }
}

fn is_stringish(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
    )
}

pub(crate) fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if is_stringish(left) || is_stringish(right) {
        return Ok(Value::String(format!(
            "{}{}",
            left.to_js_string(),
            right.to_js_string()
        )));
    }
    Ok(arithmetic(Arith::Add, left, right))
}

pub(crate) fn subtract(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(arithmetic(Arith::Subtract, left, right))
}

pub(crate) fn multiply(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(arithmetic(Arith::Multiply, left, right))
}

pub(crate) fn divide(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(arithmetic(Arith::Divide, left, right))
}

pub(crate) fn remainder(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(arithmetic(Arith::Remainder, left, right))
}

pub(crate) fn power(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let result = match (Number::of(left), Number::of(right)) {
        (Number::Int(base), Number::Int(exp)) => u32::try_from(exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .map(Value::Integer),
        _ => None,
    };
    Ok(result.unwrap_or_else(|| {
        Value::Float(left.to_number().powf(right.to_number()))
    }))
}

pub(crate) fn negate(operand: &Value) -> Result<Value, EvalError> {
    Ok(match Number::of(operand) {
        Number::Int(n) => n
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Float(-(n as f64))),
        Number::Float(n) => Value::Float(-n),
    })
}

pub(crate) fn positive(operand: &Value) -> Result<Value, EvalError> {
    Ok(match Number::of(operand) {
        Number::Int(n) => Value::Integer(n),
        Number::Float(n) => Value::Float(n),
    })
}

pub(crate) fn not(operand: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!operand.is_truthy()))
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

pub(crate) fn less_than(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare(left, right) == Some(Ordering::Less)))
}

pub(crate) fn less_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(matches!(
        compare(left, right),
        Some(Ordering::Less | Ordering::Equal)
    )))
}

pub(crate) fn greater_than(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare(left, right) == Some(Ordering::Greater)))
}

pub(crate) fn greater_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(matches!(
        compare(left, right),
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

/// `===`. Arrays and objects compare by content, functions by identity.
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (a, b) if a.is_number() && b.is_number() => a.as_float() == b.as_float(),
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_equals(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| strict_equals(x, y)))
        }
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_)
    )
}

/// `==`: `null == undefined`, primitives compare numerically unless both
/// are strings, containers compare through their string form.
pub fn loose_equals(left: &Value, right: &Value) -> bool {
    if left.is_nullish() || right.is_nullish() {
        return left.is_nullish() && right.is_nullish();
    }
    if left.type_name() == right.type_name() {
        return strict_equals(left, right);
    }
    match (left, right) {
        (Value::Array(_) | Value::Object(_), b) if is_primitive(b) => {
            loose_equals(&Value::String(left.to_js_string()), b)
        }
        (a, Value::Array(_) | Value::Object(_)) if is_primitive(a) => {
            loose_equals(a, &Value::String(right.to_js_string()))
        }
        (a, b) if is_primitive(a) && is_primitive(b) => a.to_number() == b.to_number(),
        _ => false,
    }
}

pub(crate) fn loose_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(loose_equals(left, right)))
}

pub(crate) fn loose_not_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!loose_equals(left, right)))
}

pub(crate) fn strict_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(strict_equals(left, right)))
}

pub(crate) fn strict_not_equal(left: &Value, right: &Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!strict_equals(left, right)))
}

// ============================================================================
// Built-in methods
// ============================================================================

/// Dispatch built-in methods by receiver type
fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    match receiver {
        Value::String(s) => match method {
            "toUpperCase" => no_args(method, args).map(|_| Value::String(s.to_uppercase())),
            "toLowerCase" => no_args(method, args).map(|_| Value::String(s.to_lowercase())),
            "trim" => no_args(method, args).map(|_| Value::String(s.trim().to_string())),
            "includes" => string_search(method, s, args, |s, n| s.contains(n)),
            "startsWith" => string_search(method, s, args, |s, n| s.starts_with(n)),
            "endsWith" => string_search(method, s, args, |s, n| s.ends_with(n)),
            "indexOf" => method_index_of_str(s, args),
            "charAt" => method_char_at(s, args),
            "slice" => method_slice_str(s, args),
            "split" => method_split(s, args),
            "toString" => no_args(method, args).map(|_| receiver.clone()),
            _ => unknown(receiver, method),
        },
        Value::Array(items) => match method {
            "join" => method_join(items, args),
            "includes" => {
                let needle = one_arg(method, args)?;
                Ok(Value::Boolean(items.iter().any(|v| strict_equals(v, needle))))
            }
            "indexOf" => {
                let needle = one_arg(method, args)?;
                let index = items.iter().position(|v| strict_equals(v, needle));
                Ok(Value::Integer(index.map_or(-1, |i| i as i64)))
            }
            "slice" => {
                let (start, end) = slice_bounds(items.len(), args, method)?;
                Ok(Value::Array(items[start..end].to_vec()))
            }
            "toString" => no_args(method, args).map(|_| Value::String(receiver.to_js_string())),
            _ => unknown(receiver, method),
        },
        Value::Integer(_) | Value::Float(_) => match method {
            "toFixed" => method_to_fixed(receiver, args),
            "toString" => no_args(method, args).map(|_| Value::String(receiver.to_js_string())),
            _ => unknown(receiver, method),
        },
        Value::Boolean(_) => match method {
            "toString" => no_args(method, args).map(|_| Value::String(receiver.to_js_string())),
            _ => unknown(receiver, method),
        },
        _ => Err(EvalError::NotCallable {
            callee: method.to_string(),
            found: "undefined",
        }),
    }
}

fn unknown(receiver: &Value, method: &str) -> Result<Value, EvalError> {
    Err(EvalError::UnknownMethod {
        method: method.to_string(),
        type_name: receiver.type_name(),
    })
}

fn check_args(method: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        return Err(EvalError::ArityMismatch {
            name: method.to_string(),
            expected: if args.len() < min { min } else { max },
            found: args.len(),
        });
    }
    Ok(())
}

fn no_args(method: &str, args: &[Value]) -> Result<(), EvalError> {
    check_args(method, args, 0, 0)
}

fn one_arg<'v>(method: &str, args: &'v [Value]) -> Result<&'v Value, EvalError> {
    check_args(method, args, 1, 1)?;
    Ok(&args[0])
}

fn string_search(
    method: &str,
    s: &str,
    args: &[Value],
    found: impl Fn(&str, &str) -> bool,
) -> Result<Value, EvalError> {
    let needle = one_arg(method, args)?.to_js_string();
    Ok(Value::Boolean(found(s, &needle)))
}

/// .indexOf(needle) - character index of the first match, or -1
fn method_index_of_str(s: &str, args: &[Value]) -> Result<Value, EvalError> {
    let needle = one_arg("indexOf", args)?.to_js_string();
    let index = s
        .find(&needle)
        .map_or(-1, |byte| s[..byte].chars().count() as i64);
    Ok(Value::Integer(index))
}

/// .charAt(index) - single character string, empty when out of range
fn method_char_at(s: &str, args: &[Value]) -> Result<Value, EvalError> {
    check_args("charAt", args, 0, 1)?;
    let index = args.first().map_or(0.0, Value::to_number);
    let ch = if index >= 0.0 && index.is_finite() {
        s.chars().nth(index as usize)
    } else {
        None
    };
    Ok(Value::String(ch.map(String::from).unwrap_or_default()))
}

/// .slice(start?, end?) on strings, by character
fn method_slice_str(s: &str, args: &[Value]) -> Result<Value, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let (start, end) = slice_bounds(chars.len(), args, "slice")?;
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// .split(separator?) - whole string when no separator, characters when empty
fn method_split(s: &str, args: &[Value]) -> Result<Value, EvalError> {
    check_args("split", args, 0, 1)?;
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => vec![Value::String(s.to_string())],
        Some(separator) => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            }
        }
    };
    Ok(Value::Array(parts))
}

/// .join(separator?) - defaults to ","
fn method_join(items: &[Value], args: &[Value]) -> Result<Value, EvalError> {
    check_args("join", args, 0, 1)?;
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(separator) => separator.to_js_string(),
    };
    let joined = items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

/// .toFixed(digits?) - digits between 0 and 100
fn method_to_fixed(receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
    check_args("toFixed", args, 0, 1)?;
    let digits = args.first().map_or(0.0, Value::to_number);
    if !(0.0..=100.0).contains(&digits) {
        return Err(EvalError::TypeError(format!(
            "toFixed() digits argument must be between 0 and 100, got {}",
            format_number(digits)
        )));
    }
    let n = receiver.to_number();
    if !n.is_finite() {
        return Ok(Value::String(format_number(n)));
    }
    // Ties round away from zero on the exact binary value.
    let digits = digits as u32;
    let fixed = match Decimal::from_f64_retain(n) {
        Some(exact) if digits <= Decimal::MAX_SCALE => {
            let rounded = exact.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.*}", digits as usize, rounded)
        }
        _ => format!("{:.*}", digits as usize, n),
    };
    Ok(Value::String(fixed))
}

/// Resolves JavaScript-style relative `start`/`end` arguments to a range.
fn slice_bounds(len: usize, args: &[Value], method: &str) -> Result<(usize, usize), EvalError> {
    check_args(method, args, 0, 2)?;
    let resolve = |arg: Option<&Value>, default: usize| -> usize {
        match arg {
            None | Some(Value::Undefined) => default,
            Some(value) => {
                let n = value.to_number();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    (len as f64 + n.trunc()).max(0.0) as usize
                } else {
                    (n.trunc() as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    Ok((start, end.max(start)))
}
