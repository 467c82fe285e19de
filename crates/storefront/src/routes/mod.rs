//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                         - Liveness
//! GET  /health/ready                                   - Readiness (storage ping)
//!
//! # Customer API (/api/v1/customer)
//! GET  /scan/{code}                                    - Resolve QR code to store
//! GET  /stores/{store_id}/catalog                      - Catalog (truncated when anonymous)
//! GET  /stores/{store_id}/catalog/{item_id}            - Item detail (?customer_id=)
//! POST /stores/{store_id}/auth/register                - Register + issue OTP
//! POST /stores/{store_id}/auth/send_otp                - Re-issue OTP
//! POST /stores/{store_id}/auth/verify_otp              - Verify OTP, attach to session
//! POST /auth/logout                                    - Reset session
//! GET  /session                                        - Engagement state
//! GET  /customers/{id}/review_questions                - Review questions (verified)
//! GET  /customers/{id}/purchased_items                 - Purchases (verified)
//! POST /customers/{id}/purchases                       - Record purchase (verified)
//! POST /customers/{id}/reviews                         - Submit review (verified)
//!
//! # Admin API (/api/v1/admin, bearer token)
//! GET  /stores/{store_id}/analytics/customers
//! GET  /stores/{store_id}/analytics/interactions
//! GET  /stores/{store_id}/analytics/reviews
//! ```

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod purchases;
pub mod reviews;
pub mod scan;
pub mod session;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, otp_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the OTP routes router, rate limited unless disabled.
pub fn otp_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/send_otp", post(auth::send_otp))
        .route("/verify_otp", post(auth::verify_otp));

    if rate_limit {
        router.layer(otp_rate_limiter())
    } else {
        router
    }
}

/// Create the customer-scoped routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/review_questions", get(reviews::questions))
        .route("/purchased_items", get(purchases::index))
        .route("/purchases", post(purchases::create))
        .route("/reviews", post(reviews::create))
}

/// Create the customer API router.
pub fn customer_api(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/scan/{code}", get(scan::scan))
        .route("/stores/{store_id}/catalog", get(catalog::index))
        .route("/stores/{store_id}/catalog/{item_id}", get(catalog::show))
        .nest("/stores/{store_id}/auth", otp_routes(rate_limit))
        .route("/auth/logout", post(auth::logout))
        .route("/session", get(session::show))
        .nest("/customers/{customer_id}", customer_routes())
}

/// Create the admin API router.
pub fn admin_api() -> Router<AppState> {
    Router::new()
        .route(
            "/stores/{store_id}/analytics/customers",
            get(analytics::customers),
        )
        .route(
            "/stores/{store_id}/analytics/interactions",
            get(analytics::interactions),
        )
        .route(
            "/stores/{store_id}/analytics/reviews",
            get(analytics::reviews),
        )
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1/customer", customer_api(rate_limit))
        .nest("/api/v1/admin", admin_api())
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let rate_limit = state.config().rate_limit;

    routes(rate_limit)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{EngagementConfig, StorageConfig, StorefrontConfig};
    use crate::db::MemoryRepository;
    use crate::services::testing;

    fn app_with(repo: Arc<MemoryRepository>) -> Router {
        let config = StorefrontConfig {
            storage: StorageConfig::Memory,
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://localhost".to_string(),
            engagement: EngagementConfig::default(),
            rate_limit: false,
            sentry_dsn: None,
            sentry_environment: None,
        };
        app(AppState::new(config, repo, Arc::new(testing::clock())))
    }

    async fn status_of(app: Router, method: &str, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let repo = Arc::new(MemoryRepository::new());
        assert_eq!(
            status_of(app_with(repo.clone()), "GET", "/health").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(app_with(repo), "GET", "/health/ready").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = app_with(Arc::new(MemoryRepository::new()));
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "edge-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "edge-42");
    }

    #[tokio::test]
    async fn test_guarded_routes_reject_strangers() {
        let repo = Arc::new(MemoryRepository::new());
        let store = testing::store(&repo).await;

        assert_eq!(
            status_of(
                app_with(repo.clone()),
                "GET",
                &format!("/api/v1/admin/stores/{}/analytics/customers", store.id)
            )
            .await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(
                app_with(repo.clone()),
                "GET",
                "/api/v1/customer/customers/1/purchased_items"
            )
            .await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(app_with(repo), "GET", "/api/v1/customer/scan/UNKNOWN").await,
            StatusCode::NOT_FOUND
        );
    }
}
