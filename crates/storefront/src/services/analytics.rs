//! Read-only analytics over one store.
//!
//! Each summary is a pure projection of stored state: calling it twice with
//! no writes in between yields the same output. Callers must hold an
//! [`AuthorizedAdmin`]; stores the admin does not own look the same as stores
//! that do not exist.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use scanlane_core::{
    CatalogItemId, CustomerId, Email, InteractionId, InteractionType, Phone, Rating, ReviewId,
    ReviewQuestionId, StoreId, round2,
};

use super::ServiceError;
use crate::db::Repository;
use crate::models::{AuthorizedAdmin, Metadata, Store};

/// Entries in the recent-interactions feed.
pub const RECENT_INTERACTIONS: usize = 100;

/// Entries in the recent-reviews feed.
pub const RECENT_REVIEWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub total_customers: usize,
    pub verified_customers: usize,
    pub customers: Vec<CustomerStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub verified: bool,
    pub interactions_count: i64,
    pub reviews_count: i64,
    pub purchases_count: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSummary {
    pub total_interactions: i64,
    pub recent_interactions: Vec<InteractionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEntry {
    pub id: InteractionId,
    /// `None` for anonymous interactions.
    pub customer_name: Option<String>,
    pub interaction_type: InteractionType,
    pub catalog_item: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total_reviews: i64,
    pub average_rating: f64,
    pub recent_reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub id: ReviewId,
    pub customer_name: String,
    pub catalog_item: String,
    pub overall_rating: Rating,
    pub comment: Option<String>,
    pub answers: Vec<AnsweredQuestion>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
}

fn count(counts: &HashMap<CustomerId, i64>, id: CustomerId) -> i64 {
    counts.get(&id).copied().unwrap_or(0)
}

pub struct AnalyticsService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// The store, if `admin` owns it.
    async fn owned_store(
        &self,
        admin: &AuthorizedAdmin,
        store_id: StoreId,
    ) -> Result<Store, ServiceError> {
        self.repo
            .store(store_id)
            .await?
            .filter(|store| store.admin_id == admin.admin_id())
            .ok_or(ServiceError::NotFound("store"))
    }

    async fn customer_names(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, String>, ServiceError> {
        Ok(self
            .repo
            .customers_for_store(store_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }

    async fn item_names(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CatalogItemId, String>, ServiceError> {
        Ok(self
            .repo
            .catalog_items(store_id)
            .await?
            .into_iter()
            .map(|item| (item.id, item.name))
            .collect())
    }

    /// Every customer of the store with per-customer activity counts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store is unknown or not owned
    /// by `admin`.
    #[instrument(skip(self, admin), fields(admin_id = %admin.admin_id(), store_id = %store_id))]
    pub async fn customer_summary(
        &self,
        admin: &AuthorizedAdmin,
        store_id: StoreId,
    ) -> Result<CustomerSummary, ServiceError> {
        let store = self.owned_store(admin, store_id).await?;
        let customers = self.repo.customers_for_store(store.id).await?;
        let interactions = self.repo.interaction_counts_by_customer(store.id).await?;
        let reviews = self.repo.review_counts_by_customer(store.id).await?;
        let purchases = self.repo.purchase_counts_by_customer(store.id).await?;

        Ok(CustomerSummary {
            total_customers: customers.len(),
            verified_customers: customers.iter().filter(|c| c.verified).count(),
            customers: customers
                .into_iter()
                .map(|c| CustomerStats {
                    interactions_count: count(&interactions, c.id),
                    reviews_count: count(&reviews, c.id),
                    purchases_count: count(&purchases, c.id),
                    id: c.id,
                    name: c.name,
                    email: c.email,
                    phone: c.phone,
                    verified: c.verified,
                    joined_at: c.created_at,
                })
                .collect(),
        })
    }

    /// Total interactions and the most recent ones, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store is unknown or not owned
    /// by `admin`.
    #[instrument(skip(self, admin), fields(admin_id = %admin.admin_id(), store_id = %store_id))]
    pub async fn interaction_summary(
        &self,
        admin: &AuthorizedAdmin,
        store_id: StoreId,
    ) -> Result<InteractionSummary, ServiceError> {
        let store = self.owned_store(admin, store_id).await?;
        let total_interactions = self.repo.count_interactions(store.id, None).await?;
        let records = self
            .repo
            .recent_interactions(store.id, RECENT_INTERACTIONS)
            .await?;
        let customers = self.customer_names(store.id).await?;
        let items = self.item_names(store.id).await?;

        Ok(InteractionSummary {
            total_interactions,
            recent_interactions: records
                .into_iter()
                .map(|r| InteractionEntry {
                    id: r.id,
                    customer_name: r.customer_id.and_then(|id| customers.get(&id).cloned()),
                    interaction_type: r.interaction_type,
                    catalog_item: r.catalog_item_id.and_then(|id| items.get(&id).cloned()),
                    timestamp: r.created_at,
                    metadata: r.metadata,
                })
                .collect(),
        })
    }

    /// Review count, mean rating (two decimals, 0 when there are none) and
    /// the most recent reviews with their answers.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store is unknown or not owned
    /// by `admin`.
    #[instrument(skip(self, admin), fields(admin_id = %admin.admin_id(), store_id = %store_id))]
    pub async fn review_summary(
        &self,
        admin: &AuthorizedAdmin,
        store_id: StoreId,
    ) -> Result<ReviewSummary, ServiceError> {
        let store = self.owned_store(admin, store_id).await?;
        let stats = self.repo.review_stats(store.id).await?;
        let reviews = self.repo.recent_reviews(store.id, RECENT_REVIEWS).await?;
        let items = self.item_names(store.id).await?;
        let questions: HashMap<ReviewQuestionId, String> = self
            .repo
            .review_questions(store.id)
            .await?
            .into_iter()
            .map(|q| (q.id, q.question))
            .collect();

        // Reviewers normally belong to the store, but a review is scoped by
        // its item, so look up anyone missing from the store's customers.
        let mut customers = self.customer_names(store.id).await?;
        for review in &reviews {
            if !customers.contains_key(&review.customer_id)
                && let Some(customer) = self.repo.customer(review.customer_id).await?
            {
                customers.insert(customer.id, customer.name);
            }
        }

        Ok(ReviewSummary {
            total_reviews: stats.total,
            average_rating: stats.mean.map_or(0.0, round2),
            recent_reviews: reviews
                .into_iter()
                .map(|r| ReviewEntry {
                    id: r.id,
                    customer_name: customers.get(&r.customer_id).cloned().unwrap_or_default(),
                    catalog_item: items.get(&r.catalog_item_id).cloned().unwrap_or_default(),
                    overall_rating: r.overall_rating,
                    comment: r.comment,
                    answers: r
                        .answers
                        .into_iter()
                        .map(|a| AnsweredQuestion {
                            question: questions.get(&a.question_id).cloned().unwrap_or_default(),
                            answer: a.answer.to_string(),
                        })
                        .collect(),
                    created_at: r.created_at,
                })
                .collect(),
        })
    }
}
