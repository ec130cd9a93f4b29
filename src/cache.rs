use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    error::ParseError, expression::ParsedExpression, options::ParserOptions, parser::Parser,
};

/// Memoizes parsed expressions by their exact source string.
///
/// Safe to share between threads. Compilation happens outside the lock, so
/// two threads racing on the same new source may both compile it, but only
/// the first result is stored and every caller gets that one.
///
/// ```
/// use std::sync::Arc;
/// use bindexpr::ExpressionCache;
///
/// let cache = ExpressionCache::new();
/// let a = cache.parse("user.name").unwrap();
/// let b = cache.parse("user.name").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: RwLock<HashMap<String, Arc<ParsedExpression>>>,
    parser: Parser,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParserOptions) -> Self {
        ExpressionCache {
            entries: RwLock::new(HashMap::new()),
            parser: Parser::new(options),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        self.parser.options()
    }

    /// Returns the cached expression for `source`, parsing and storing it on
    /// a miss. Failed parses are not cached.
    pub fn parse(&self, source: &str) -> Result<Arc<ParsedExpression>, ParseError> {
        if let Some(hit) = self.get(source) {
            log::trace!("cache hit for {:?}", source);
            return Ok(hit);
        }
        log::debug!("cache miss for {:?}", source);
        let parsed = self.parser.parse(source)?;
        Ok(self.put(parsed))
    }

    pub fn get(&self, source: &str) -> Option<Arc<ParsedExpression>> {
        self.entries.read().get(source).cloned()
    }

    /// Stores `expression` under its source unless an entry already exists,
    /// and returns whichever entry is now cached.
    pub fn put(&self, expression: ParsedExpression) -> Arc<ParsedExpression> {
        let mut entries = self.entries.write();
        entries
            .entry(expression.source().to_string())
            .or_insert_with(|| Arc::new(expression))
            .clone()
    }

    /// Removes one entry, or everything when `source` is `None`.
    ///
    /// Expressions already handed out stay valid.
    pub fn clear(&self, source: Option<&str>) {
        let mut entries = self.entries.write();
        match source {
            Some(source) => {
                if entries.remove(source).is_some() {
                    log::debug!("evicted {:?}", source);
                }
            }
            None => {
                log::debug!("cleared {} cached expression(s)", entries.len());
                entries.clear();
            }
        }
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.read().contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
