//! Interaction ledger records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scanlane_core::{CatalogItemId, CustomerId, InteractionId, InteractionType, StoreId};

/// Free-form key/value details attached to an interaction.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One appended customer action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRecord {
    pub id: InteractionId,
    pub store_id: StoreId,
    /// `None` for anonymous interactions.
    pub customer_id: Option<CustomerId>,
    pub catalog_item_id: Option<CatalogItemId>,
    pub interaction_type: InteractionType,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an interaction.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub store_id: StoreId,
    pub customer_id: Option<CustomerId>,
    pub catalog_item_id: Option<CatalogItemId>,
    pub interaction_type: InteractionType,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}
