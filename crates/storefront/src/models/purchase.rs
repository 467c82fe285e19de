//! Purchase records. Purchases are recorded, never charged.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use scanlane_core::{CatalogItemId, CustomerId, PurchaseId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub customer_id: CustomerId,
    pub catalog_item_id: CatalogItemId,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub customer_id: CustomerId,
    pub catalog_item_id: CatalogItemId,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub created_at: DateTime<Utc>,
}
