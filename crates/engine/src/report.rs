use std::fmt;
use std::path::PathBuf;

/// Why a placement did not make it onto the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingSourceAsset(PathBuf),
    InvalidPlacement(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSourceAsset(path) => {
                write!(f, "sprite file does not exist: {}", path.display())
            }
            SkipReason::InvalidPlacement(reason) => write!(f, "invalid placement: {reason}"),
        }
    }
}

/// Per-item diagnostic returned alongside a partial composite or mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position in the list the caller submitted.
    pub index: usize,
    pub label: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item #{} ({}): {}", self.index, self.label, self.reason)
    }
}
