//! History Configuration

/// Undo history options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept; the oldest is dropped past it
    pub max_depth: Option<usize>,

    /// Treat changes made outside `done`/`maybe_done` as a caller bug
    ///
    /// When off, such changes are folded into the latest undo step with a
    /// warning.
    pub strict_transactions: bool,
}

impl HistoryConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_transactions = true;
        self
    }
}
