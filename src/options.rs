/// Settings handed to the JSON tokenizer behind [`JsonEvents`](crate::JsonEvents).
///
/// The default accepts strict RFC 8259 input with no nesting limit, so that
/// documents nested deeper than the call stack can still be walked.
///
/// # Examples
/// ```
/// use lazy_json::ReaderOptions;
///
/// let options = ReaderOptions::new()
///     .with_allow_comments(true)
///     .with_max_nesting_depth(Some(512));
/// assert_eq!(options.max_nesting_depth, Some(512));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub allow_comments: bool,
    pub allow_trailing_comma: bool,
    pub max_nesting_depth: Option<u32>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_comments(mut self, allow_comments: bool) -> Self {
        self.allow_comments = allow_comments;
        self
    }

    pub fn with_allow_trailing_comma(mut self, allow_trailing_comma: bool) -> Self {
        self.allow_trailing_comma = allow_trailing_comma;
        self
    }

    pub fn with_max_nesting_depth(mut self, max_nesting_depth: Option<u32>) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }
}

/// What a search does when a key matcher meets an array, or an index
/// matcher meets an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Fail the search with [`ErrorKind::PathTypeMismatch`](crate::ErrorKind::PathTypeMismatch).
    #[default]
    Error,
    /// Treat the pair as a non-match and skip its subtree.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub reader: ReaderOptions,
    pub mismatch: MismatchPolicy,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, reader: ReaderOptions) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_mismatch(mut self, mismatch: MismatchPolicy) -> Self {
        self.mismatch = mismatch;
        self
    }
}
