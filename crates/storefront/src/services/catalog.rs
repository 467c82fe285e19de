//! Catalog listing and item detail.
//!
//! Anonymous visitors see at most the first `anonymous_limit` active items of
//! a store (oldest first). Whether a visitor counts as authenticated is
//! decided by the caller from server-held session state; the browsing counter
//! in the session never influences what is revealed here.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use scanlane_core::{CatalogItemId, CustomerId, InteractionType, StoreId, average_rating};

use super::ServiceError;
use super::ledger::{InteractionLedger, LedgerEntry};
use crate::clock::Clock;
use crate::db::Repository;
use crate::models::CatalogItem;

/// Default number of items shown to anonymous visitors.
pub const ANONYMOUS_ITEM_LIMIT: usize = 2;

/// One catalog entry as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: CatalogItemId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub category: Option<String>,
    pub has_offer: bool,
}

impl From<CatalogItem> for CatalogEntry {
    fn from(item: CatalogItem) -> Self {
        Self {
            has_offer: item.has_offer(),
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            offer_price: item.offer_price,
            category: item.category,
        }
    }
}

/// A (possibly truncated) catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
    pub requires_auth: bool,
    pub total_items: usize,
}

/// Item detail with review statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDetail {
    pub id: CatalogItemId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub category: Option<String>,
    pub reviews_count: usize,
    pub average_rating: f64,
}

pub struct CatalogService<'a> {
    repo: &'a dyn Repository,
    ledger: InteractionLedger<'a>,
    anonymous_limit: usize,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, clock: &'a dyn Clock, anonymous_limit: usize) -> Self {
        Self {
            repo,
            ledger: InteractionLedger::new(repo, clock),
            anonymous_limit,
        }
    }

    /// List a store's active items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store does not exist.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn list_catalog(
        &self,
        store_id: StoreId,
        authenticated: bool,
    ) -> Result<CatalogPage, ServiceError> {
        if self.repo.store(store_id).await?.is_none() {
            return Err(ServiceError::NotFound("store"));
        }

        let mut items: Vec<CatalogItem> = self
            .repo
            .catalog_items(store_id)
            .await?
            .into_iter()
            .filter(|item| item.active)
            .collect();

        let total_items = items.len();
        let requires_auth = !authenticated && total_items > self.anonymous_limit;
        if requires_auth {
            items.truncate(self.anonymous_limit);
        }
        debug!(total_items, shown = items.len(), requires_auth, "Catalog listed");

        Ok(CatalogPage {
            items: items.into_iter().map(CatalogEntry::from).collect(),
            requires_auth,
            total_items,
        })
    }

    /// Item detail with its rating statistics.
    ///
    /// When `customer_id` is given, a `view` interaction is recorded for that
    /// customer. Never gates.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown store, an item that is
    /// inactive or belongs to another store, or a customer who is unknown or
    /// registered elsewhere.
    #[instrument(skip(self), fields(store_id = %store_id, item_id = %item_id))]
    pub async fn get_item(
        &self,
        store_id: StoreId,
        item_id: CatalogItemId,
        customer_id: Option<CustomerId>,
    ) -> Result<ItemDetail, ServiceError> {
        if self.repo.store(store_id).await?.is_none() {
            return Err(ServiceError::NotFound("store"));
        }

        let item = self
            .repo
            .catalog_item(item_id)
            .await?
            .filter(|item| item.store_id == store_id && item.active)
            .ok_or(ServiceError::NotFound("catalog item"))?;

        if let Some(customer_id) = customer_id {
            self.repo
                .customer(customer_id)
                .await?
                .filter(|c| c.store_id == store_id)
                .ok_or(ServiceError::NotFound("customer"))?;

            self.ledger
                .append(
                    LedgerEntry::new(store_id, InteractionType::View)
                        .customer(Some(customer_id))
                        .item(item.id),
                )
                .await?;
        }

        let ratings = self.repo.ratings_for_item(item.id).await?;

        Ok(ItemDetail {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            offer_price: item.offer_price,
            category: item.category,
            reviews_count: ratings.len(),
            average_rating: average_rating(&ratings),
        })
    }
}
