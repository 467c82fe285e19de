//! Store domain types.

use serde::Serialize;

use scanlane_core::{AdminId, StoreId};

/// A physical store customers reach by scanning its QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Store {
    pub id: StoreId,
    /// Admin who owns the store.
    #[serde(skip)]
    pub admin_id: AdminId,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Input for provisioning a store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub admin_id: AdminId,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}
