/// Tunables for a proof search.
///
/// The defaults reproduce plain depth-first resolution: unbounded depth and
/// unification without an occurs check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Maximum depth of a goal. Query goals are at depth 1; the body goals of
    /// a clause used for a goal at depth `d` are at depth `d + 1`.
    /// Primitives are not counted.
    ///
    /// A goal that goes deeper fails. When the whole search then fails, the
    /// query entry points report [`EngineError::DepthExceeded`](crate::EngineError::DepthExceeded).
    pub max_depth: Option<usize>,
    /// Refuse to bind a variable to a term that contains it.
    pub occurs_check: bool,
}

impl EngineConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the search depth
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Enable or disable the occurs check during unification
    #[must_use]
    pub fn with_occurs_check(mut self, occurs_check: bool) -> Self {
        self.occurs_check = occurs_check;
        self
    }

    /// Parse a configuration from JSON, e.g. `{"max_depth": 512}`.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// when the input is not a valid configuration object.
    #[cfg(feature = "serde")]
    pub fn from_json(input: &str) -> crate::Result<Self> {
        serde_json::from_str(input).map_err(|e| crate::EngineError::InvalidConfig(e.to_string()))
    }
}
