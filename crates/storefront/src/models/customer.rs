//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scanlane_core::{CustomerId, Email, Phone, StoreId};

/// A registered, store-scoped customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub store_id: StoreId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub address: Option<String>,
    /// Whether the customer has proven control of their email or phone.
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a customer.
///
/// `claim` is the uniqueness key reserved together with the row; the
/// storage layer must reject a second customer with the same claim.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub store_id: StoreId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub address: Option<String>,
    pub claim: String,
    pub created_at: DateTime<Utc>,
}
