//! Session-related types.
//!
//! The authentication service writes a [`CurrentCustomer`] into the session at
//! login; the order API only reads it.

use serde::{Deserialize, Serialize};

use proshop_core::UserId;

/// Session-stored customer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Customer's email address.
    pub email: String,
    /// Whether the customer may list all orders and mark them delivered.
    #[serde(default)]
    pub is_admin: bool,
}

impl CurrentCustomer {
    /// Whether this customer may act on an order owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin || self.id == owner
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: i32, is_admin: bool) -> CurrentCustomer {
        CurrentCustomer {
            id: UserId::new(id),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            is_admin,
        }
    }

    #[test]
    fn test_owner_can_access() {
        assert!(customer(1, false).can_access(UserId::new(1)));
        assert!(!customer(1, false).can_access(UserId::new(2)));
    }

    #[test]
    fn test_admin_can_access_any_order() {
        assert!(customer(1, true).can_access(UserId::new(2)));
    }
}
