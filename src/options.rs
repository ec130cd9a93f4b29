/// Limits applied while tokenizing and compiling an expression.
///
/// ```
/// use bindexpr::ParserOptions;
///
/// let options = ParserOptions::default().with_max_depth(32);
/// assert_eq!(options.max_depth, 32);
/// assert_eq!(options.max_length, ParserOptions::DEFAULT_MAX_LENGTH);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum expression length, in characters
    pub max_length: usize,

    /// Maximum nesting of brackets, and maximum depth of the compiled tree
    pub max_depth: usize,
}

impl ParserOptions {
    pub const DEFAULT_MAX_LENGTH: usize = 65_536;
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            max_length: Self::DEFAULT_MAX_LENGTH,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
