use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use crate::evaluator::EvalError;

/// Named values resolved by `@name` references.
pub type Aliases = HashMap<String, Value>;

/// A value seen by binding expressions.
///
/// Mirrors the JavaScript value model closely enough for template bindings,
/// with integers kept apart from floats:
/// - Arithmetic between integers stays integral while it fits `i64`
/// - Mixed integer/float arithmetic collapses whole results back to integers
/// - `Undefined` is what safe navigation yields for anything missing
///
/// # Examples
///
/// ```
/// use bindexpr::Value;
/// use std::collections::HashMap;
///
/// let missing = Value::Undefined;
/// let integer = Value::Integer(42);
/// let float = Value::Float(3.14);
/// let string = Value::from("hello");
///
/// let mut obj = HashMap::new();
/// obj.insert("key".to_string(), Value::from("value"));
/// let object = Value::Object(obj);
/// assert_eq!(object.get("key").unwrap().as_ref(), &Value::from("value"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value
    Undefined,

    /// JSON null
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with string keys
    Object(HashMap<String, Value>),

    /// Host function callable from expressions
    Function(Function),
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A host function exposed to expressions through the context or an alias.
///
/// Functions declared with an arity reject calls with a different number of
/// arguments; variadic functions accept anything.
///
/// ```
/// use bindexpr::{Function, Value};
///
/// let double = Function::new("double", 1, |args| match &args[0] {
///     Value::Integer(n) => Ok(Value::Integer(n * 2)),
///     _ => Ok(Value::Undefined),
/// });
/// assert_eq!(double.call(&[Value::Integer(4)]).unwrap(), Value::Integer(8));
/// assert!(double.call(&[]).is_err());
/// ```
#[derive(Clone)]
pub struct Function {
    name: String,
    arity: Option<usize>,
    body: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    pub fn variadic<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            arity: None,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        if let Some(expected) = self.arity
            && expected != args.len()
        {
            return Err(EvalError::ArityMismatch {
                name: self.name.clone(),
                expected,
                found: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl Value {
    /// JavaScript truthiness
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Undefined | Null => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Float(n) => *n != 0.0 && !n.is_nan(),
            String(s) => !s.is_empty(),
            Array(_) | Object(_) | Function(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Get as float, without coercion
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric conversion (`+value` in JavaScript)
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Integer(n) => *n as f64,
            Value::Float(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [only] => string_to_number(&only.to_js_string()),
                _ => f64::NAN,
            },
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// String conversion (`String(value)` in JavaScript)
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name),
        }
    }

    /// Member lookup. `None` means the member does not exist.
    ///
    /// Borrows from `self` where possible; synthesized members such as
    /// `length` are returned owned.
    pub fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
        match self {
            Value::Object(map) => map.get(key).map(Cow::Borrowed),
            Value::Array(items) => {
                if key == "length" {
                    return Some(Cow::Owned(Value::Integer(items.len() as i64)));
                }
                parse_index(key)
                    .and_then(|i| items.get(i))
                    .map(Cow::Borrowed)
            }
            Value::String(s) => {
                if key == "length" {
                    return Some(Cow::Owned(Value::Integer(s.chars().count() as i64)));
                }
                parse_index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Cow::Owned(Value::String(c.to_string())))
            }
            Value::Function(f) => match key {
                "name" => Some(Cow::Owned(Value::String(f.name.clone()))),
                "length" => Some(Cow::Owned(Value::Integer(f.arity.unwrap_or(0) as i64))),
                _ => None,
            },
            _ => None,
        }
    }

    /// Lossy conversion to JSON: `undefined` and functions become `null`,
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

/// Array/string index segments are plain decimal digits.
fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust also accepts "inf" and "nan", JavaScript does not
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// Formats a float the way JavaScript prints numbers.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_follows_javascript() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Object(HashMap::new()).is_truthy());
        assert!(Value::Integer(-1).is_truthy());
    }

    #[test]
    fn test_member_lookup() {
        let value = Value::from(json!({"items": [10, 20], "name": "abc"}));
        let items = value.get("items").unwrap();
        assert_eq!(items.get("1").unwrap().as_ref(), &Value::Integer(20));
        assert_eq!(items.get("length").unwrap().as_ref(), &Value::Integer(2));
        assert!(items.get("+1").is_none());
        let name = value.get("name").unwrap();
        assert_eq!(name.get("length").unwrap().as_ref(), &Value::Integer(3));
        assert_eq!(name.get("0").unwrap().as_ref(), &Value::from("a"));
        assert!(Value::Null.get("anything").is_none());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_conversion() {
        let arr = Value::Array(vec![Value::Integer(1), Value::Null, Value::from("x")]);
        assert_eq!(arr.to_js_string(), "1,,x");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 12 ").to_number(), 12.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_json_round_trip_is_lossy_for_undefined() {
        let value = Value::Array(vec![Value::Undefined, Value::Integer(1)]);
        assert_eq!(value.to_json(), json!([null, 1]));
    }
}
