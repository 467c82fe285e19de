//! Integration test harness for Scanlane.
//!
//! Each test spawns the full storefront application in-process on an
//! ephemeral port, backed by the in-memory repository and a manual clock,
//! and talks to it over HTTP with a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p scanlane-integration-tests
//! ```
//!
//! # Fixture
//!
//! - "Corner Shop" with five active items (the third on offer at 80 from
//!   100) and one inactive item, three active review questions and one
//!   inactive one, QR code `CORNER01`, owned by the admin whose token is
//!   [`TestContext::admin_token`].
//! - "Other Shop" with one item, owned by a different admin.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use scanlane_core::{AdminId, CatalogItemId, Email, QuestionType, StoreId};
use scanlane_storefront::clock::ManualClock;
use scanlane_storefront::config::{EngagementConfig, StorageConfig, StorefrontConfig};
use scanlane_storefront::db::{MemoryRepository, Provisioning};
use scanlane_storefront::middleware::{generate_token, hash_token};
use scanlane_storefront::models::{NewAdmin, NewCatalogItem, NewReviewQuestion, NewStore};
use scanlane_storefront::routes;
use scanlane_storefront::state::AppState;

/// QR code of the main fixture store.
pub const QR_CODE: &str = "CORNER01";

/// Fixed start time of the manual clock.
#[must_use]
pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

/// A running storefront plus handles on its state.
pub struct TestContext {
    pub base_url: String,
    pub repo: Arc<MemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub store_id: StoreId,
    pub other_store_id: StoreId,
    /// Active items of the main store, oldest first.
    pub item_ids: Vec<CatalogItemId>,
    pub inactive_item_id: CatalogItemId,
    pub other_item_id: CatalogItemId,
    pub admin_token: String,
    pub other_admin_token: String,
}

impl TestContext {
    /// Start a server with the default engagement settings.
    pub async fn new() -> Self {
        Self::with_engagement(EngagementConfig::default()).await
    }

    /// Start a server with custom engagement settings.
    pub async fn with_engagement(engagement: EngagementConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(ManualClock::new(start()));

        let (owner, admin_token) = admin(&repo, "owner@corner.test").await;
        let (rival, other_admin_token) = admin(&repo, "owner@other.test").await;

        let store_id = store(&repo, owner, "Corner Shop").await;
        repo.insert_qr_code(QR_CODE, store_id).await.unwrap();
        let other_store_id = store(&repo, rival, "Other Shop").await;

        let mut item_ids = Vec::new();
        for n in 0..5_i64 {
            let offer = (n == 2).then(|| Decimal::from(80));
            item_ids.push(item(&repo, store_id, &format!("Item {n}"), 100, offer, n, true).await);
        }
        let inactive_item_id = item(&repo, store_id, "Retired", 50, None, 10, false).await;
        let other_item_id = item(&repo, other_store_id, "Elsewhere", 20, None, 0, true).await;

        question(&repo, store_id, "Quality?", QuestionType::Rating, &[], 1, true).await;
        question(
            &repo,
            store_id,
            "How did you hear about us?",
            QuestionType::MultipleChoice,
            &["Friend", "Sign"],
            2,
            true,
        )
        .await;
        question(&repo, store_id, "Anything else?", QuestionType::Text, &[], 3, true).await;
        question(&repo, store_id, "Old question", QuestionType::Boolean, &[], 4, false).await;

        let config = StorefrontConfig {
            storage: StorageConfig::Memory,
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            engagement,
            rate_limit: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config, repo.clone(), clock.clone());
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            repo,
            clock,
            store_id,
            other_store_id,
            item_ids,
            inactive_item_id,
            other_item_id,
            admin_token,
            other_admin_token,
        }
    }

    /// A fresh visitor: a client with its own cookie jar.
    #[must_use]
    pub fn visitor(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Customer API URL.
    #[must_use]
    pub fn customer_url(&self, path: &str) -> String {
        self.url(&format!("/api/v1/customer{path}"))
    }

    #[must_use]
    pub fn catalog_url(&self) -> String {
        self.customer_url(&format!("/stores/{}/catalog", self.store_id))
    }

    /// Move the server's clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// GET an admin analytics report with the given token.
    pub async fn analytics(&self, token: &str, store_id: StoreId, report: &str) -> Response {
        self.visitor()
            .get(self.url(&format!(
                "/api/v1/admin/stores/{store_id}/analytics/{report}"
            )))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Register a customer at the main store. Returns `(customer_id, otp_code)`.
    pub async fn register(&self, client: &Client, name: &str, email: &str) -> (i64, String) {
        self.register_at(client, self.store_id, name, email, "555-0100")
            .await
    }

    /// Register a customer at any store. Returns `(customer_id, otp_code)`.
    pub async fn register_at(
        &self,
        client: &Client,
        store_id: StoreId,
        name: &str,
        email: &str,
        phone: &str,
    ) -> (i64, String) {
        let resp = client
            .post(self.customer_url(&format!("/stores/{store_id}/auth/register")))
            .json(&json!({
                "name": name,
                "email": email,
                "phone": phone,
                "address": "1 Main St",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        let id = body["customer"]["id"].as_i64().unwrap();
        let code = body["otp_code"].as_str().unwrap().to_string();
        (id, code)
    }

    /// Submit an OTP for `email` at the main store.
    pub async fn verify(&self, client: &Client, email: &str, code: &str) -> Response {
        self.verify_at(client, self.store_id, json!({ "email": email }), code)
            .await
    }

    /// Submit an OTP for an identity claim (`{"email": ..}` or
    /// `{"phone": ..}`) at any store.
    pub async fn verify_at(
        &self,
        client: &Client,
        store_id: StoreId,
        claim: Value,
        code: &str,
    ) -> Response {
        let mut body = claim;
        body["code"] = json!(code);
        client
            .post(self.customer_url(&format!("/stores/{store_id}/auth/verify_otp")))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Ask for a fresh OTP for an identity claim at any store.
    pub async fn send_otp(&self, client: &Client, store_id: StoreId, claim: &Value) -> Response {
        client
            .post(self.customer_url(&format!("/stores/{store_id}/auth/send_otp")))
            .json(claim)
            .send()
            .await
            .unwrap()
    }

    /// A visitor who has registered and verified. Returns the client and
    /// customer id.
    pub async fn verified_customer(&self, name: &str, email: &str) -> (Client, i64) {
        let client = self.visitor();
        let (id, code) = self.register(&client, name, email).await;
        let resp = self.verify(&client, email, &code).await;
        assert_eq!(resp.status(), StatusCode::OK);
        (client, id)
    }
}

async fn admin(repo: &MemoryRepository, email: &str) -> (AdminId, String) {
    let admin = repo
        .insert_admin(NewAdmin {
            name: "Owner".to_string(),
            email: Email::parse(email).unwrap(),
        })
        .await
        .unwrap();
    let token = generate_token();
    repo.insert_admin_token(admin.id, &hash_token(&token), start())
        .await
        .unwrap();
    (admin.id, token)
}

async fn store(repo: &MemoryRepository, admin_id: AdminId, name: &str) -> StoreId {
    repo.insert_store(NewStore {
        admin_id,
        name: name.to_string(),
        description: Some("A test store".to_string()),
        address: "1 Main St".to_string(),
        phone: None,
        email: None,
    })
    .await
    .unwrap()
    .id
}

async fn item(
    repo: &MemoryRepository,
    store_id: StoreId,
    name: &str,
    price: i64,
    offer_price: Option<Decimal>,
    minutes: i64,
    active: bool,
) -> CatalogItemId {
    repo.insert_catalog_item(NewCatalogItem {
        store_id,
        name: name.to_string(),
        description: None,
        price: Decimal::from(price),
        offer_price,
        category: None,
        active,
        created_at: start() + Duration::minutes(minutes),
    })
    .await
    .unwrap()
    .id
}

#[allow(clippy::too_many_arguments)]
async fn question(
    repo: &MemoryRepository,
    store_id: StoreId,
    text: &str,
    question_type: QuestionType,
    options: &[&str],
    order_index: i32,
    active: bool,
) {
    repo.insert_review_question(NewReviewQuestion {
        store_id,
        question: text.to_string(),
        question_type,
        options: options.iter().map(ToString::to_string).collect(),
        order_index,
        active,
    })
    .await
    .unwrap();
}
