use serde::{Deserialize, Serialize};

/// Configuration for a world instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Reject operations that reference unknown entities instead of
    /// silently ignoring them.
    pub strict_mode: bool,
    /// Maximum containment nesting depth. Top-level entities sit at depth 0.
    pub max_depth: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_depth: 10,
        }
    }
}

impl WorldConfig {
    /// Enable or disable strict mode.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Set the maximum containment depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
