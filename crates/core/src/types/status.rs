//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a persisted order sits in its lifecycle.
///
/// Derived from the order's `is_paid` / `is_delivered` flags, never stored.
/// The only legal moves are `Created -> Paid -> Delivered`; a cart that has
/// not been submitted yet is not an order and has no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Persisted, unpaid, undelivered.
    Created,
    /// Paid, not yet delivered.
    Paid,
    /// Terminal.
    Delivered,
}

impl OrderStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Paid => write!(f, "paid"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}
