//! Storage for the engagement funnel.
//!
//! Services talk to storage through the [`Repository`] trait object so the
//! same code runs against `PostgreSQL` in production and the in-memory
//! backend in tests and local demos.
//!
//! # Tables
//!
//! - `admin`, `admin_token` - Store owners and their hashed bearer tokens
//! - `store`, `qr_code` - Stores and the codes that lead to them
//! - `catalog_item`, `review_question` - Owned by catalog management, read here
//! - `customer`, `customer_identity_claim` - Registered customers and their
//!   uniqueness claims
//! - `customer_interaction` - Append-only interaction ledger
//! - `purchase`, `review`, `review_answer`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p scanlane-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use scanlane_core::{
    AdminId, CatalogItemId, CustomerId, InteractionType, Rating, StoreId,
};

use crate::models::{
    Admin, CatalogItem, Customer, InteractionRecord, NewAdmin, NewCatalogItem, NewCustomer,
    NewInteraction, NewPurchase, NewReview, NewReviewQuestion, NewStore, Purchase, Review,
    ReviewQuestion, ReviewStats, Store,
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate identity claim).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Stores, catalog and review questions, plus admin credential lookup.
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Resolve an active QR code to its store.
    async fn store_by_qr_code(&self, code: &str) -> Result<Option<Store>, RepositoryError>;

    /// Every catalog item of a store, active or not, ordered by
    /// `(created_at, id)` ascending.
    async fn catalog_items(&self, store_id: StoreId) -> Result<Vec<CatalogItem>, RepositoryError>;

    async fn catalog_item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError>;

    /// Every review question of a store ordered by `(order_index, id)`.
    async fn review_questions(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ReviewQuestion>, RepositoryError>;

    /// Find the admin owning a bearer token, by the token's hash.
    async fn admin_by_token_hash(&self, token_hash: &str) -> Result<Option<Admin>, RepositoryError>;
}

/// Inserts used by the CLI seeder and tests. Catalog management proper lives
/// outside this service.
#[async_trait]
pub trait Provisioning: Send + Sync {
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError>;

    async fn insert_admin_token(
        &self,
        admin_id: AdminId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn insert_store(&self, store: NewStore) -> Result<Store, RepositoryError>;

    async fn insert_qr_code(&self, code: &str, store_id: StoreId) -> Result<(), RepositoryError>;

    async fn insert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, RepositoryError>;

    async fn insert_review_question(
        &self,
        question: NewReviewQuestion,
    ) -> Result<ReviewQuestion, RepositoryError>;
}

/// Durable customer identities.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Insert a customer and reserve its identity claim in one unit.
    ///
    /// Returns `RepositoryError::Conflict` if the claim is already taken.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError>;

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Lowest-id customer with this normalized email, optionally confined to
    /// one store.
    async fn customer_by_email(
        &self,
        normalized_email: &str,
        store_id: Option<StoreId>,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Every customer of `store_id` with this normalized phone, by id.
    ///
    /// Phones are not unique, so callers decide what several matches mean.
    async fn customers_by_phone(
        &self,
        normalized_phone: &str,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, RepositoryError>;

    /// Set `verified = true`. Idempotent.
    ///
    /// Returns `RepositoryError::NotFound` for an unknown customer.
    async fn mark_verified(&self, id: CustomerId) -> Result<(), RepositoryError>;

    /// Customers of a store ordered by `(created_at, id)`.
    async fn customers_for_store(&self, store_id: StoreId) -> Result<Vec<Customer>, RepositoryError>;
}

/// The append-only interaction ledger.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionRecord, RepositoryError>;

    /// Newest first, ties broken by id descending.
    async fn recent_interactions(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, RepositoryError>;

    async fn count_interactions(
        &self,
        store_id: StoreId,
        interaction_type: Option<InteractionType>,
    ) -> Result<i64, RepositoryError>;

    async fn interaction_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn insert_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError>;

    /// Newest first, ties broken by id descending.
    async fn purchases_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError>;

    async fn purchase_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError>;
}

/// Reviews. A review belongs to the store of its catalog item.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review and all of its answers in one unit.
    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError>;

    async fn ratings_for_item(&self, item_id: CatalogItemId) -> Result<Vec<Rating>, RepositoryError>;

    /// Newest first, ties broken by id descending.
    async fn recent_reviews(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<Review>, RepositoryError>;

    async fn review_stats(&self, store_id: StoreId) -> Result<ReviewStats, RepositoryError>;

    async fn review_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError>;

    async fn reviewed_item_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<CatalogItemId>, RepositoryError>;
}

/// Everything the storefront needs from storage.
pub trait Repository:
    StoreDirectory
    + Provisioning
    + CustomerRepository
    + InteractionRepository
    + PurchaseRepository
    + ReviewRepository
{
}

impl<T> Repository for T where
    T: StoreDirectory
        + Provisioning
        + CustomerRepository
        + InteractionRepository
        + PurchaseRepository
        + ReviewRepository
{
}
