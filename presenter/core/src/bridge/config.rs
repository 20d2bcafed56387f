//! Bridge Configuration

use serde::{Deserialize, Serialize};

/// Bridge channel settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Queue capacity per direction
    ///
    /// A full queue drops the newest message (at-most-once delivery).
    pub capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl BridgeConfig {
    /// Configuration with a specific capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}
