//! Admin identity and the capability handed to analytics.

use scanlane_core::{AdminId, Email};

/// A store administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    pub id: AdminId,
    pub name: String,
    pub email: Email,
}

/// Input for provisioning an admin.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub email: Email,
}

/// Proof that the caller is an authenticated admin.
///
/// Produced by the admin bearer-token extractor and passed explicitly into
/// analytics calls, which only ever show stores this admin owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedAdmin {
    admin_id: AdminId,
}

impl AuthorizedAdmin {
    /// Grant the capability. Callers must have verified the admin's credential.
    #[must_use]
    pub const fn new(admin_id: AdminId) -> Self {
        Self { admin_id }
    }

    #[must_use]
    pub const fn admin_id(&self) -> AdminId {
        self.admin_id
    }
}
