//! Session-related types.
//!
//! Types stored in the visitor's cookie session.

use serde::{Deserialize, Serialize};

use scanlane_core::{CustomerId, StoreId};

/// The verified customer attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCustomer {
    pub id: CustomerId,
    pub store_id: StoreId,
}

/// Session keys.
pub mod keys {
    /// Key for the anonymous browsing counter (`EngagementSession`).
    pub const ENGAGEMENT: &str = "engagement";

    /// Key for the verified customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
