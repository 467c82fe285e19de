//! In-memory storage backend.
//!
//! Backs the integration tests and `STOREFRONT_STORAGE=memory` demos. All
//! tables sit behind one mutex, so every operation is atomic; the lock is
//! never held across an `.await`.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use scanlane_core::{
    AdminId, CatalogItemId, CustomerId, InteractionId, InteractionType, PurchaseId, Rating,
    ReviewId, ReviewQuestionId, StoreId,
};

use super::{
    CustomerRepository, InteractionRepository, Provisioning, PurchaseRepository,
    RepositoryError, ReviewRepository, StoreDirectory,
};
use crate::models::{
    Admin, CatalogItem, Customer, InteractionRecord, NewAdmin, NewCatalogItem, NewCustomer,
    NewInteraction, NewPurchase, NewReview, NewReviewQuestion, NewStore, Purchase, Review,
    ReviewQuestion, ReviewStats, Store,
};

#[derive(Debug)]
struct QrCode {
    store_id: StoreId,
    active: bool,
}

#[derive(Debug, Default)]
struct Tables {
    sequence: i32,
    admins: Vec<Admin>,
    admin_tokens: HashMap<String, AdminId>,
    stores: Vec<Store>,
    qr_codes: HashMap<String, QrCode>,
    catalog_items: Vec<CatalogItem>,
    review_questions: Vec<ReviewQuestion>,
    customers: Vec<Customer>,
    identity_claims: HashSet<String>,
    interactions: Vec<InteractionRecord>,
    purchases: Vec<Purchase>,
    reviews: Vec<Review>,
}

impl Tables {
    /// Next id. One sequence shared by every table keeps ids monotonic in
    /// insertion order, which the ledger relies on for tie-breaks.
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn item_store(&self, item_id: CatalogItemId) -> Option<StoreId> {
        self.catalog_items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.store_id)
    }

    fn customer_store(&self, customer_id: CustomerId) -> Option<StoreId> {
        self.customers
            .iter()
            .find(|c| c.id == customer_id)
            .map(|c| c.store_id)
    }

    fn store_reviews(&self, store_id: StoreId) -> impl Iterator<Item = &Review> {
        self.reviews
            .iter()
            .filter(move |r| self.item_store(r.catalog_item_id) == Some(store_id))
    }
}

fn count_by_customer(ids: impl Iterator<Item = CustomerId>) -> HashMap<CustomerId, i64> {
    let mut counts = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

/// Storage held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StoreDirectory for MemoryRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.tables().stores.iter().find(|s| s.id == id).cloned())
    }

    async fn store_by_qr_code(&self, code: &str) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables();
        let Some(qr) = tables.qr_codes.get(code).filter(|qr| qr.active) else {
            return Ok(None);
        };
        Ok(tables.stores.iter().find(|s| s.id == qr.store_id).cloned())
    }

    async fn catalog_items(&self, store_id: StoreId) -> Result<Vec<CatalogItem>, RepositoryError> {
        let mut items: Vec<CatalogItem> = self
            .tables()
            .catalog_items
            .iter()
            .filter(|item| item.store_id == store_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        Ok(items)
    }

    async fn catalog_item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        Ok(self
            .tables()
            .catalog_items
            .iter()
            .find(|item| item.id == id)
            .cloned())
    }

    async fn review_questions(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ReviewQuestion>, RepositoryError> {
        let mut questions: Vec<ReviewQuestion> = self
            .tables()
            .review_questions
            .iter()
            .filter(|q| q.store_id == store_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order_index, q.id));
        Ok(questions)
    }

    async fn admin_by_token_hash(&self, token_hash: &str) -> Result<Option<Admin>, RepositoryError> {
        let tables = self.tables();
        let Some(admin_id) = tables.admin_tokens.get(token_hash) else {
            return Ok(None);
        };
        Ok(tables.admins.iter().find(|a| a.id == *admin_id).cloned())
    }
}

#[async_trait]
impl Provisioning for MemoryRepository {
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError> {
        let mut tables = self.tables();
        if tables
            .admins
            .iter()
            .any(|a| a.email.normalized() == admin.email.normalized())
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let admin = Admin {
            id: AdminId::new(tables.next_id()),
            name: admin.name,
            email: admin.email,
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn insert_admin_token(
        &self,
        admin_id: AdminId,
        token_hash: &str,
        _created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        if !tables.admins.iter().any(|a| a.id == admin_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.admin_tokens.contains_key(token_hash) {
            return Err(RepositoryError::Conflict("token already exists".to_owned()));
        }
        tables.admin_tokens.insert(token_hash.to_owned(), admin_id);
        Ok(())
    }

    async fn insert_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let mut tables = self.tables();
        let store = Store {
            id: StoreId::new(tables.next_id()),
            admin_id: store.admin_id,
            name: store.name,
            description: store.description,
            address: store.address,
            phone: store.phone,
            email: store.email,
        };
        tables.stores.push(store.clone());
        Ok(store)
    }

    async fn insert_qr_code(&self, code: &str, store_id: StoreId) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        if tables.qr_codes.contains_key(code) {
            return Err(RepositoryError::Conflict("qr code already exists".to_owned()));
        }
        tables.qr_codes.insert(
            code.to_owned(),
            QrCode {
                store_id,
                active: true,
            },
        );
        Ok(())
    }

    async fn insert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, RepositoryError> {
        let mut tables = self.tables();
        let item = CatalogItem {
            id: CatalogItemId::new(tables.next_id()),
            store_id: item.store_id,
            name: item.name,
            description: item.description,
            price: item.price,
            offer_price: item.offer_price,
            category: item.category,
            active: item.active,
            created_at: item.created_at,
        };
        tables.catalog_items.push(item.clone());
        Ok(item)
    }

    async fn insert_review_question(
        &self,
        question: NewReviewQuestion,
    ) -> Result<ReviewQuestion, RepositoryError> {
        let mut tables = self.tables();
        let question = ReviewQuestion {
            id: ReviewQuestionId::new(tables.next_id()),
            store_id: question.store_id,
            question: question.question,
            question_type: question.question_type,
            options: question.options,
            order_index: question.order_index,
            active: question.active,
        };
        tables.review_questions.push(question.clone());
        Ok(question)
    }
}

#[async_trait]
impl CustomerRepository for MemoryRepository {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let mut tables = self.tables();
        if !tables.identity_claims.insert(customer.claim) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let customer = Customer {
            id: CustomerId::new(tables.next_id()),
            store_id: customer.store_id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
            verified: false,
            created_at: customer.created_at,
        };
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.tables().customers.iter().find(|c| c.id == id).cloned())
    }

    async fn customer_by_email(
        &self,
        normalized_email: &str,
        store_id: Option<StoreId>,
    ) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .tables()
            .customers
            .iter()
            .filter(|c| store_id.is_none_or(|s| c.store_id == s))
            .find(|c| c.email.normalized() == normalized_email)
            .cloned())
    }

    async fn customers_by_phone(
        &self,
        normalized_phone: &str,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self
            .tables()
            .customers
            .iter()
            .filter(|c| c.store_id == store_id && c.phone.normalized() == normalized_phone)
            .cloned()
            .collect())
    }

    async fn mark_verified(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        let customer = tables
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        customer.verified = true;
        Ok(())
    }

    async fn customers_for_store(&self, store_id: StoreId) -> Result<Vec<Customer>, RepositoryError> {
        let mut customers: Vec<Customer> = self
            .tables()
            .customers
            .iter()
            .filter(|c| c.store_id == store_id)
            .cloned()
            .collect();
        customers.sort_by_key(|c| (c.created_at, c.id));
        Ok(customers)
    }
}

#[async_trait]
impl InteractionRepository for MemoryRepository {
    async fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionRecord, RepositoryError> {
        let mut tables = self.tables();
        let record = InteractionRecord {
            id: InteractionId::new(tables.next_id()),
            store_id: interaction.store_id,
            customer_id: interaction.customer_id,
            catalog_item_id: interaction.catalog_item_id,
            interaction_type: interaction.interaction_type,
            metadata: interaction.metadata,
            created_at: interaction.created_at,
        };
        tables.interactions.push(record.clone());
        Ok(record)
    }

    async fn recent_interactions(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let mut records: Vec<InteractionRecord> = self
            .tables()
            .interactions
            .iter()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| Reverse((r.created_at, r.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn count_interactions(
        &self,
        store_id: StoreId,
        interaction_type: Option<InteractionType>,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .tables()
            .interactions
            .iter()
            .filter(|r| r.store_id == store_id)
            .filter(|r| interaction_type.is_none_or(|t| r.interaction_type == t))
            .count();
        i64::try_from(count).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    async fn interaction_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        Ok(count_by_customer(
            self.tables()
                .interactions
                .iter()
                .filter(|r| r.store_id == store_id)
                .filter_map(|r| r.customer_id),
        ))
    }
}

#[async_trait]
impl PurchaseRepository for MemoryRepository {
    async fn insert_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        let mut tables = self.tables();
        let purchase = Purchase {
            id: PurchaseId::new(tables.next_id()),
            customer_id: purchase.customer_id,
            catalog_item_id: purchase.catalog_item_id,
            quantity: purchase.quantity,
            price_paid: purchase.price_paid,
            created_at: purchase.created_at,
        };
        tables.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn purchases_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let mut purchases: Vec<Purchase> = self
            .tables()
            .purchases
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        purchases.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(purchases)
    }

    async fn purchase_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        let tables = self.tables();
        Ok(count_by_customer(
            tables
                .purchases
                .iter()
                .map(|p| p.customer_id)
                .filter(|id| tables.customer_store(*id) == Some(store_id)),
        ))
    }
}

#[async_trait]
impl ReviewRepository for MemoryRepository {
    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut tables = self.tables();
        let review = Review {
            id: ReviewId::new(tables.next_id()),
            customer_id: review.customer_id,
            catalog_item_id: review.catalog_item_id,
            overall_rating: review.overall_rating,
            comment: review.comment,
            answers: review.answers,
            created_at: review.created_at,
        };
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn ratings_for_item(&self, item_id: CatalogItemId) -> Result<Vec<Rating>, RepositoryError> {
        Ok(self
            .tables()
            .reviews
            .iter()
            .filter(|r| r.catalog_item_id == item_id)
            .map(|r| r.overall_rating)
            .collect())
    }

    async fn recent_reviews(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables();
        let mut reviews: Vec<Review> = tables.store_reviews(store_id).cloned().collect();
        reviews.sort_by_key(|r| Reverse((r.created_at, r.id)));
        reviews.truncate(limit);
        Ok(reviews)
    }

    async fn review_stats(&self, store_id: StoreId) -> Result<ReviewStats, RepositoryError> {
        let tables = self.tables();
        let ratings: Vec<f64> = tables
            .store_reviews(store_id)
            .map(|r| f64::from(r.overall_rating.get()))
            .collect();
        let total =
            i64::try_from(ratings.len()).map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        #[allow(clippy::cast_precision_loss)]
        let mean = (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
        Ok(ReviewStats { total, mean })
    }

    async fn review_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        let tables = self.tables();
        Ok(count_by_customer(
            tables
                .reviews
                .iter()
                .map(|r| r.customer_id)
                .filter(|id| tables.customer_store(*id) == Some(store_id)),
        ))
    }

    async fn reviewed_item_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<CatalogItemId>, RepositoryError> {
        Ok(self
            .tables()
            .reviews
            .iter()
            .filter(|r| r.customer_id == customer_id)
            .map(|r| r.catalog_item_id)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use scanlane_core::Email;

    use super::*;

    fn new_customer(store_id: StoreId, email: &str, claim: &str) -> NewCustomer {
        NewCustomer {
            store_id,
            name: "Ada".to_string(),
            email: Email::parse(email).unwrap(),
            phone: scanlane_core::Phone::parse("555-0100").unwrap(),
            address: None,
            claim: claim.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_claim_conflicts() {
        let repo = MemoryRepository::new();
        let store = StoreId::new(1);
        repo.insert_customer(new_customer(store, "a@x.com", "a@x.com"))
            .await
            .unwrap();
        let err = repo
            .insert_customer(new_customer(store, "A@X.com", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_recent_interactions_breaks_ties_by_id() {
        let repo = MemoryRepository::new();
        let store = StoreId::new(1);
        let at = Utc::now();
        let mut ids = Vec::new();
        for offset in [0, 0, 5] {
            let record = repo
                .append_interaction(NewInteraction {
                    store_id: store,
                    customer_id: None,
                    catalog_item_id: None,
                    interaction_type: InteractionType::CatalogBrowse,
                    metadata: serde_json::Map::new(),
                    created_at: at + Duration::seconds(offset),
                })
                .await
                .unwrap();
            ids.push(record.id);
        }

        let recent = repo.recent_interactions(store, 10).await.unwrap();
        let order: Vec<_> = recent.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);

        let limited = repo.recent_interactions(store, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, ids[2]);
    }

    #[tokio::test]
    async fn test_mark_verified_unknown_customer() {
        let repo = MemoryRepository::new();
        let err = repo.mark_verified(CustomerId::new(99)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
