//! Purchases. Recorded for history and analytics; nothing is charged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use scanlane_core::{CatalogItemId, CustomerId, InteractionType, PurchaseId};

use super::ledger::{InteractionLedger, LedgerEntry};
use super::{FieldError, ServiceError};
use crate::clock::Clock;
use crate::db::Repository;
use crate::models::{Customer, NewPurchase};

/// Purchase request. Omitted fields take their defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub catalog_item_id: Option<CatalogItemId>,
    pub quantity: Option<i32>,
    pub price_paid: Option<Decimal>,
}

/// A recorded purchase as reported back to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    pub id: PurchaseId,
    pub catalog_item: String,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub purchased_at: DateTime<Utc>,
}

/// One row of a customer's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasedItem {
    pub id: CatalogItemId,
    pub name: String,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub already_reviewed: bool,
}

pub struct PurchaseService<'a> {
    repo: &'a dyn Repository,
    clock: &'a dyn Clock,
    ledger: InteractionLedger<'a>,
}

impl<'a> PurchaseService<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, clock: &'a dyn Clock) -> Self {
        Self {
            repo,
            clock,
            ledger: InteractionLedger::new(repo, clock),
        }
    }

    async fn customer(&self, customer_id: CustomerId) -> Result<Customer, ServiceError> {
        self.repo
            .customer(customer_id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))
    }

    /// Record a purchase and append a `catalog_browse` interaction tagged
    /// `action = purchase`.
    ///
    /// `quantity` defaults to 1. `price_paid` defaults to the item's offer
    /// price, or its list price when there is no offer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown customer.
    /// Returns `ServiceError::Validation` for an unknown, inactive or foreign
    /// item, or a non-positive quantity or price.
    #[instrument(skip(self, request), fields(customer_id = %customer_id, item_id = ?request.catalog_item_id))]
    pub async fn record(
        &self,
        customer_id: CustomerId,
        request: PurchaseRequest,
    ) -> Result<PurchaseReceipt, ServiceError> {
        let customer = self.customer(customer_id).await?;

        let item_id = request
            .catalog_item_id
            .ok_or_else(|| ServiceError::invalid("catalog_item_id", "can't be blank"))?;
        let item = self
            .repo
            .catalog_item(item_id)
            .await?
            .filter(|item| item.store_id == customer.store_id && item.active)
            .ok_or_else(|| ServiceError::invalid("catalog_item_id", "must be an item of this store"))?;

        let quantity = request.quantity.unwrap_or(1);
        let price_paid = request
            .price_paid
            .unwrap_or_else(|| item.effective_price());

        let mut errors = Vec::new();
        if quantity <= 0 {
            errors.push(FieldError::new("quantity", "must be greater than 0"));
        }
        if price_paid <= Decimal::ZERO {
            errors.push(FieldError::new("price_paid", "must be greater than 0"));
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let purchase = self
            .repo
            .insert_purchase(NewPurchase {
                customer_id,
                catalog_item_id: item.id,
                quantity,
                price_paid,
                created_at: self.clock.now(),
            })
            .await?;

        self.ledger
            .append(
                LedgerEntry::new(customer.store_id, InteractionType::CatalogBrowse)
                    .customer(Some(customer_id))
                    .item(item.id)
                    .meta("action", "purchase")
                    .meta("quantity", quantity)
                    .at(purchase.created_at),
            )
            .await?;

        info!(purchase_id = %purchase.id, quantity, "Purchase recorded");

        Ok(PurchaseReceipt {
            id: purchase.id,
            catalog_item: item.name,
            quantity: purchase.quantity,
            price_paid: purchase.price_paid,
            purchased_at: purchase.created_at,
        })
    }

    /// A customer's purchases, newest first, each flagged with whether the
    /// customer has reviewed that item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown customer.
    pub async fn purchased_items(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PurchasedItem>, ServiceError> {
        let customer = self.customer(customer_id).await?;
        let purchases = self.repo.purchases_for_customer(customer_id).await?;
        let reviewed = self.repo.reviewed_item_ids(customer_id).await?;
        let names: HashMap<CatalogItemId, String> = self
            .repo
            .catalog_items(customer.store_id)
            .await?
            .into_iter()
            .map(|item| (item.id, item.name))
            .collect();

        Ok(purchases
            .into_iter()
            .map(|p| PurchasedItem {
                id: p.catalog_item_id,
                name: names.get(&p.catalog_item_id).cloned().unwrap_or_default(),
                quantity: p.quantity,
                price_paid: p.price_paid,
                purchased_at: p.created_at,
                already_reviewed: reviewed.contains(&p.catalog_item_id),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scanlane_core::{Rating, StoreId, UniquenessScope};

    use super::*;
    use crate::db::{InteractionRepository, MemoryRepository, ReviewRepository};
    use crate::models::NewReview;
    use crate::services::identity::{IdentityService, RegistrationForm};
    use crate::services::testing;

    async fn customer(repo: &MemoryRepository, store_id: StoreId, email: &str) -> Customer {
        let clock = testing::clock();
        IdentityService::new(repo, &clock, UniquenessScope::Global)
            .register(
                store_id,
                RegistrationForm {
                    name: "Ada".to_string(),
                    email: email.to_string(),
                    phone: "5550100".to_string(),
                    address: None,
                },
            )
            .await
            .unwrap()
    }

    fn request(item: CatalogItemId) -> PurchaseRequest {
        PurchaseRequest {
            catalog_item_id: Some(item),
            quantity: None,
            price_paid: None,
        }
    }

    #[tokio::test]
    async fn test_price_defaults_to_offer_then_list() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let offered = testing::item(&repo, store.id, "Lamp", 100, Some(80), 0).await;
        let plain = testing::item(&repo, store.id, "Rug", 40, None, 1).await;
        let buyer = customer(&repo, store.id, "a@x.com").await;
        let purchases = PurchaseService::new(&repo, &clock);

        let receipt = purchases.record(buyer.id, request(offered.id)).await.unwrap();
        assert_eq!(receipt.price_paid, Decimal::from(80));
        assert_eq!(receipt.quantity, 1);
        assert_eq!(receipt.catalog_item, "Lamp");

        let receipt = purchases.record(buyer.id, request(plain.id)).await.unwrap();
        assert_eq!(receipt.price_paid, Decimal::from(40));

        let receipt = purchases
            .record(
                buyer.id,
                PurchaseRequest {
                    catalog_item_id: Some(offered.id),
                    quantity: Some(3),
                    price_paid: Some(Decimal::new(7550, 2)),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.price_paid, Decimal::new(7550, 2));
        assert_eq!(receipt.quantity, 3);
    }

    #[tokio::test]
    async fn test_purchase_appends_tagged_interaction() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let item = testing::item(&repo, store.id, "Lamp", 100, None, 0).await;
        let buyer = customer(&repo, store.id, "a@x.com").await;

        PurchaseService::new(&repo, &clock)
            .record(
                buyer.id,
                PurchaseRequest {
                    quantity: Some(2),
                    ..request(item.id)
                },
            )
            .await
            .unwrap();

        let records = repo.recent_interactions(store.id, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].interaction_type, InteractionType::CatalogBrowse);
        assert_eq!(records[0].metadata["action"], "purchase");
        assert_eq!(records[0].metadata["quantity"], 2);
    }

    #[tokio::test]
    async fn test_invalid_purchases_write_nothing() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let elsewhere = testing::store_named(&repo, "Elsewhere").await;
        let item = testing::item(&repo, store.id, "Lamp", 100, None, 0).await;
        let foreign = testing::item(&repo, elsewhere.id, "Vase", 10, None, 0).await;
        let buyer = customer(&repo, store.id, "a@x.com").await;
        let purchases = PurchaseService::new(&repo, &clock);

        let err = purchases
            .record(
                buyer.id,
                PurchaseRequest {
                    quantity: Some(0),
                    price_paid: Some(Decimal::ZERO),
                    ..request(item.id)
                },
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields.len(), 2);

        let err = purchases.record(buyer.id, request(foreign.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = purchases
            .record(buyer.id, request(CatalogItemId::new(999)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = purchases
            .record(
                buyer.id,
                PurchaseRequest {
                    catalog_item_id: None,
                    ..request(item.id)
                },
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields[0].field, "catalog_item_id");

        let err = purchases
            .record(CustomerId::new(999), request(item.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("customer")));

        assert!(purchases.purchased_items(buyer.id).await.unwrap().is_empty());
        assert_eq!(repo.count_interactions(store.id, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purchased_items_flags_reviews() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let lamp = testing::item(&repo, store.id, "Lamp", 100, None, 0).await;
        let rug = testing::item(&repo, store.id, "Rug", 40, None, 1).await;
        let buyer = customer(&repo, store.id, "a@x.com").await;
        let purchases = PurchaseService::new(&repo, &clock);

        purchases.record(buyer.id, request(lamp.id)).await.unwrap();
        clock.advance(chrono::Duration::minutes(1));
        purchases.record(buyer.id, request(rug.id)).await.unwrap();
        repo.insert_review(NewReview {
            customer_id: buyer.id,
            catalog_item_id: lamp.id,
            overall_rating: Rating::new(5).unwrap(),
            comment: None,
            answers: Vec::new(),
            created_at: clock.now(),
        })
        .await
        .unwrap();

        let items = purchases.purchased_items(buyer.id).await.unwrap();
        let summary: Vec<_> = items
            .iter()
            .map(|i| (i.name.as_str(), i.already_reviewed))
            .collect();
        assert_eq!(summary, vec![("Rug", false), ("Lamp", true)]);
    }
}
