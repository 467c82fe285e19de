//! Anonymous browsing counter and the verification nudge.
//!
//! A visitor accumulates interactions (catalog browses, product views) in an
//! ephemeral session. Once the count reaches the policy threshold and no
//! verified identity is attached, the client should prompt for registration.
//!
//! This counter is advisory. It lives in per-visitor session state and only
//! drives the UI nudge; how many catalog items the server reveals is decided
//! from server-known item counts and the verified identity, never from here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{CatalogItemId, CustomerId};

/// Default number of interactions before an anonymous session is gated.
pub const GATE_THRESHOLD: u32 = 2;

/// Engagement state of one browsing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSession {
    /// Interactions counted so far.
    pub interaction_count: u32,
    /// Items whose views have already been counted.
    pub viewed_items: BTreeSet<CatalogItemId>,
    /// The verified customer attached to the session, if any.
    pub identity: Option<CustomerId>,
}

impl EngagementSession {
    /// A fresh anonymous session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one interaction.
    ///
    /// With `Some(item)`, only the first view of that item in this session
    /// counts. A browse (`None`) always counts. Returns whether the counter
    /// moved.
    pub fn record_interaction(&mut self, item: Option<CatalogItemId>) -> bool {
        if let Some(item) = item
            && !self.viewed_items.insert(item)
        {
            return false;
        }
        self.interaction_count = self.interaction_count.saturating_add(1);
        true
    }

    /// Attach a verified customer.
    pub const fn attach_identity(&mut self, customer: CustomerId) {
        self.identity = Some(customer);
    }

    /// Forget everything (logout).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether a verified identity is attached.
    #[must_use]
    pub const fn is_identified(&self) -> bool {
        self.identity.is_some()
    }
}

/// The gating rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementPolicy {
    threshold: u32,
}

impl EngagementPolicy {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// True iff the session has reached the threshold and is still anonymous.
    #[must_use]
    pub const fn should_gate(&self, session: &EngagementSession) -> bool {
        session.interaction_count >= self.threshold && session.identity.is_none()
    }
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self::new(GATE_THRESHOLD)
    }
}
