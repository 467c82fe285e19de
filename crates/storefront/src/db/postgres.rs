//! `PostgreSQL` storage backend.
//!
//! Queries are built at runtime with `sqlx::query_as` against private row
//! types, then converted into domain models.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use scanlane_core::{
    AdminId, Answer, CatalogItemId, CustomerId, Email, InteractionId, InteractionType, Phone,
    PurchaseId, QuestionType, Rating, ReviewId, ReviewQuestionId, StoreId,
};

use super::{
    CustomerRepository, InteractionRepository, Provisioning, PurchaseRepository,
    RepositoryError, ReviewRepository, StoreDirectory,
};
use crate::models::{
    Admin, CatalogItem, Customer, InteractionRecord, Metadata, NewAdmin, NewCatalogItem,
    NewCustomer, NewInteraction, NewPurchase, NewReview, NewReviewQuestion, NewStore, Purchase,
    Review, ReviewAnswer, ReviewQuestion, ReviewStats, Store,
};

/// Map a unique violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: AdminId,
    name: String,
    email: Email,
}

impl From<AdminRow> for Admin {
    fn from(r: AdminRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    admin_id: AdminId,
    name: String,
    description: Option<String>,
    address: String,
    phone: Option<String>,
    email: Option<String>,
}

impl From<StoreRow> for Store {
    fn from(r: StoreRow) -> Self {
        Self {
            id: r.id,
            admin_id: r.admin_id,
            name: r.name,
            description: r.description,
            address: r.address,
            phone: r.phone,
            email: r.email,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CatalogItemRow {
    id: CatalogItemId,
    store_id: StoreId,
    name: String,
    description: Option<String>,
    price: Decimal,
    offer_price: Option<Decimal>,
    category: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(r: CatalogItemRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            name: r.name,
            description: r.description,
            price: r.price,
            offer_price: r.offer_price,
            category: r.category,
            active: r.active,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewQuestionRow {
    id: ReviewQuestionId,
    store_id: StoreId,
    question: String,
    question_type: QuestionType,
    options: Vec<String>,
    order_index: i32,
    active: bool,
}

impl From<ReviewQuestionRow> for ReviewQuestion {
    fn from(r: ReviewQuestionRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            question: r.question,
            question_type: r.question_type,
            options: r.options,
            order_index: r.order_index,
            active: r.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    store_id: StoreId,
    name: String,
    email: Email,
    phone: Phone,
    address: Option<String>,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            address: r.address,
            verified: r.verified,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: InteractionId,
    store_id: StoreId,
    customer_id: Option<CustomerId>,
    catalog_item_id: Option<CatalogItemId>,
    interaction_type: InteractionType,
    metadata: Json<Metadata>,
    created_at: DateTime<Utc>,
}

impl From<InteractionRow> for InteractionRecord {
    fn from(r: InteractionRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            customer_id: r.customer_id,
            catalog_item_id: r.catalog_item_id,
            interaction_type: r.interaction_type,
            metadata: r.metadata.0,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: PurchaseId,
    customer_id: CustomerId,
    catalog_item_id: CatalogItemId,
    quantity: i32,
    price_paid: Decimal,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(r: PurchaseRow) -> Self {
        Self {
            id: r.id,
            customer_id: r.customer_id,
            catalog_item_id: r.catalog_item_id,
            quantity: r.quantity,
            price_paid: r.price_paid,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    customer_id: CustomerId,
    catalog_item_id: CatalogItemId,
    overall_rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self, answers: Vec<ReviewAnswer>) -> Result<Review, RepositoryError> {
        let overall_rating = Rating::new(i64::from(self.overall_rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;
        Ok(Review {
            id: self.id,
            customer_id: self.customer_id,
            catalog_item_id: self.catalog_item_id,
            overall_rating,
            comment: self.comment,
            answers,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewAnswerRow {
    review_id: ReviewId,
    review_question_id: ReviewQuestionId,
    answer: Json<Answer>,
}

const STORE_COLUMNS: &str = "s.id, s.admin_id, s.name, s.description, s.address, s.phone, s.email";

const CATALOG_ITEM_COLUMNS: &str = "id, store_id, name, description, price, offer_price, \
                                    category, active, created_at";

const REVIEW_QUESTION_COLUMNS: &str =
    "id, store_id, question, question_type, options, order_index, active";

const CUSTOMER_COLUMNS: &str = "id, store_id, name, email, phone, address, verified, created_at";

const INTERACTION_COLUMNS: &str =
    "id, store_id, customer_id, catalog_item_id, interaction_type, metadata, created_at";

const PURCHASE_COLUMNS: &str =
    "id, customer_id, catalog_item_id, quantity, price_paid, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Storage backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn answers_for(
        &self,
        review_ids: &[i32],
    ) -> Result<HashMap<ReviewId, Vec<ReviewAnswer>>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewAnswerRow>(
            r"
            SELECT review_id, review_question_id, answer
            FROM review_answer
            WHERE review_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(review_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut answers: HashMap<ReviewId, Vec<ReviewAnswer>> = HashMap::new();
        for row in rows {
            answers.entry(row.review_id).or_default().push(ReviewAnswer {
                question_id: row.review_question_id,
                answer: row.answer.0,
            });
        }
        Ok(answers)
    }

    async fn counts_by_customer(
        &self,
        sql: &str,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CustomerId, i64)>(sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl StoreDirectory for PgRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM store s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Store::from))
    }

    async fn store_by_qr_code(&self, code: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM qr_code q
            JOIN store s ON s.id = q.store_id
            WHERE q.code = $1 AND q.active
            "
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Store::from))
    }

    async fn catalog_items(&self, store_id: StoreId) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CatalogItemRow>(&format!(
            "SELECT {CATALOG_ITEM_COLUMNS} FROM catalog_item WHERE store_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogItem::from).collect())
    }

    async fn catalog_item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            "SELECT {CATALOG_ITEM_COLUMNS} FROM catalog_item WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CatalogItem::from))
    }

    async fn review_questions(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ReviewQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewQuestionRow>(&format!(
            "SELECT {REVIEW_QUESTION_COLUMNS} FROM review_question WHERE store_id = $1 \
             ORDER BY order_index, id"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReviewQuestion::from).collect())
    }

    async fn admin_by_token_hash(&self, token_hash: &str) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT a.id, a.name, a.email
            FROM admin_token t
            JOIN admin a ON a.id = t.admin_id
            WHERE t.token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Admin::from))
    }
}

#[async_trait]
impl Provisioning for PgRepository {
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "INSERT INTO admin (name, email) VALUES ($1, $2) RETURNING id, name, email",
        )
        .bind(&admin.name)
        .bind(&admin.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;
        Ok(row.into())
    }

    async fn insert_admin_token(
        &self,
        admin_id: AdminId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO admin_token (token_hash, admin_id, created_at) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(admin_id)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "token already exists"))?;
        Ok(())
    }

    async fn insert_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            INSERT INTO store AS s (admin_id, name, description, address, phone, email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(store.admin_id)
        .bind(&store.name)
        .bind(&store.description)
        .bind(&store.address)
        .bind(&store.phone)
        .bind(&store.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_qr_code(&self, code: &str, store_id: StoreId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO qr_code (code, store_id) VALUES ($1, $2)")
            .bind(code)
            .bind(store_id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "qr code already exists"))?;
        Ok(())
    }

    async fn insert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogItemRow>(&format!(
            r"
            INSERT INTO catalog_item
                (store_id, name, description, price, offer_price, category, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CATALOG_ITEM_COLUMNS}
            "
        ))
        .bind(item.store_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.offer_price)
        .bind(&item.category)
        .bind(item.active)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_review_question(
        &self,
        question: NewReviewQuestion,
    ) -> Result<ReviewQuestion, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewQuestionRow>(&format!(
            r"
            INSERT INTO review_question
                (store_id, question, question_type, options, order_index, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_QUESTION_COLUMNS}
            "
        ))
        .bind(question.store_id)
        .bind(&question.question)
        .bind(question.question_type)
        .bind(&question.options)
        .bind(question.order_index)
        .bind(question.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl CustomerRepository for PgRepository {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            INSERT INTO customer
                (store_id, name, email, email_normalized, phone, phone_normalized, address,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(customer.store_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.email.normalized())
        .bind(&customer.phone)
        .bind(customer.phone.normalized())
        .bind(&customer.address)
        .bind(customer.created_at)
        .fetch_one(&mut *tx)
        .await?;

        // The claim's primary key is what makes concurrent registrations of
        // the same identity fail.
        sqlx::query("INSERT INTO customer_identity_claim (claim, customer_id) VALUES ($1, $2)")
            .bind(&customer.claim)
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn customer_by_email(
        &self,
        normalized_email: &str,
        store_id: Option<StoreId>,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS} FROM customer
            WHERE email_normalized = $1 AND ($2::int4 IS NULL OR store_id = $2)
            ORDER BY id
            LIMIT 1
            "
        ))
        .bind(normalized_email)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn customers_by_phone(
        &self,
        normalized_phone: &str,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS} FROM customer
            WHERE phone_normalized = $1 AND store_id = $2
            ORDER BY id
            "
        ))
        .bind(normalized_phone)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn mark_verified(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE customer SET verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn customers_for_store(&self, store_id: StoreId) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE store_id = $1 ORDER BY created_at, id"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }
}

#[async_trait]
impl InteractionRepository for PgRepository {
    async fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionRecord, RepositoryError> {
        let row = sqlx::query_as::<_, InteractionRow>(&format!(
            r"
            INSERT INTO customer_interaction
                (store_id, customer_id, catalog_item_id, interaction_type, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INTERACTION_COLUMNS}
            "
        ))
        .bind(interaction.store_id)
        .bind(interaction.customer_id)
        .bind(interaction.catalog_item_id)
        .bind(interaction.interaction_type)
        .bind(Json(&interaction.metadata))
        .bind(interaction.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn recent_interactions(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, InteractionRow>(&format!(
            r"
            SELECT {INTERACTION_COLUMNS} FROM customer_interaction
            WHERE store_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(store_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InteractionRecord::from).collect())
    }

    async fn count_interactions(
        &self,
        store_id: StoreId,
        interaction_type: Option<InteractionType>,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM customer_interaction
            WHERE store_id = $1 AND ($2::interaction_type IS NULL OR interaction_type = $2)
            ",
        )
        .bind(store_id)
        .bind(interaction_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn interaction_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        self.counts_by_customer(
            r"
            SELECT customer_id, COUNT(*) FROM customer_interaction
            WHERE store_id = $1 AND customer_id IS NOT NULL
            GROUP BY customer_id
            ",
            store_id,
        )
        .await
    }
}

#[async_trait]
impl PurchaseRepository for PgRepository {
    async fn insert_purchase(&self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r"
            INSERT INTO purchase (customer_id, catalog_item_id, quantity, price_paid, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PURCHASE_COLUMNS}
            "
        ))
        .bind(purchase.customer_id)
        .bind(purchase.catalog_item_id)
        .bind(purchase.quantity)
        .bind(purchase.price_paid)
        .bind(purchase.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn purchases_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchase WHERE customer_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    async fn purchase_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        self.counts_by_customer(
            r"
            SELECT p.customer_id, COUNT(*) FROM purchase p
            JOIN customer c ON c.id = p.customer_id
            WHERE c.store_id = $1
            GROUP BY p.customer_id
            ",
            store_id,
        )
        .await
    }
}

#[async_trait]
impl ReviewRepository for PgRepository {
    async fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO review (customer_id, catalog_item_id, overall_rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, customer_id, catalog_item_id, overall_rating, comment, created_at
            ",
        )
        .bind(review.customer_id)
        .bind(review.catalog_item_id)
        .bind(i16::from(review.overall_rating.get()))
        .bind(&review.comment)
        .bind(review.created_at)
        .fetch_one(&mut *tx)
        .await?;

        for answer in &review.answers {
            sqlx::query(
                "INSERT INTO review_answer (review_id, review_question_id, answer) \
                 VALUES ($1, $2, $3)",
            )
            .bind(row.id)
            .bind(answer.question_id)
            .bind(Json(&answer.answer))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.into_review(review.answers)
    }

    async fn ratings_for_item(&self, item_id: CatalogItemId) -> Result<Vec<Rating>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, i16>(
            "SELECT overall_rating FROM review WHERE catalog_item_id = $1",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Rating::new(i64::from(r)).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
                })
            })
            .collect()
    }

    async fn recent_reviews(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.customer_id, r.catalog_item_id, r.overall_rating, r.comment,
                   r.created_at
            FROM review r
            JOIN catalog_item i ON i.id = r.catalog_item_id
            WHERE i.store_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2
            ",
        )
        .bind(store_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut answers = self.answers_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let row_answers = answers.remove(&row.id).unwrap_or_default();
                row.into_review(row_answers)
            })
            .collect()
    }

    async fn review_stats(&self, store_id: StoreId) -> Result<ReviewStats, RepositoryError> {
        let (total, mean) = sqlx::query_as::<_, (i64, Option<f64>)>(
            r"
            SELECT COUNT(*), AVG(r.overall_rating)::float8
            FROM review r
            JOIN catalog_item i ON i.id = r.catalog_item_id
            WHERE i.store_id = $1
            ",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ReviewStats { total, mean })
    }

    async fn review_counts_by_customer(
        &self,
        store_id: StoreId,
    ) -> Result<HashMap<CustomerId, i64>, RepositoryError> {
        self.counts_by_customer(
            r"
            SELECT r.customer_id, COUNT(*) FROM review r
            JOIN customer c ON c.id = r.customer_id
            WHERE c.store_id = $1
            GROUP BY r.customer_id
            ",
            store_id,
        )
        .await
    }

    async fn reviewed_item_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<CatalogItemId>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, CatalogItemId>(
            "SELECT DISTINCT catalog_item_id FROM review WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
