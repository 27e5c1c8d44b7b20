//! Supervision areas.

use serde::{Deserialize, Serialize};

/// Floor identifier.
pub type FloorId = u32;

/// A supervision area with its contingent of teachers per break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    /// Unique display name (e.g. `EG`, `1. OG`, `Hof`).
    pub name: String,
    /// Teachers needed during every break.
    pub required_per_break: u32,
    /// Display position; ties are broken by name.
    #[serde(default)]
    pub order_index: i32,
}

impl Floor {
    /// Creates a floor needing one teacher per break.
    pub fn new(id: FloorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            required_per_break: 1,
            order_index: 0,
        }
    }

    pub fn with_required(mut self, required_per_break: u32) -> Self {
        self.required_per_break = required_per_break;
        self
    }

    pub fn with_order(mut self, order_index: i32) -> Self {
        self.order_index = order_index;
        self
    }

    /// Contingent actually planned; never below one.
    #[inline]
    pub fn required(&self) -> u32 {
        self.required_per_break.max(1)
    }
}

/// Sorts floors for display: by `order_index`, then name.
pub fn sort_for_display(floors: &mut [Floor]) {
    floors.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.name.cmp(&b.name))
    });
}
