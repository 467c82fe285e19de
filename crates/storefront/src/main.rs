//! Scanlane Storefront - Customer engagement and analytics API.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (or process memory for local demos) behind the
//!   `Repository` trait
//! - In-memory cookie sessions carrying the browsing counter and the
//!   verified customer
//! - One-time passcodes held in a TTL cache, returned to the caller
//!
//! Migrations run on startup for the Postgres backend; the memory backend
//! is seeded with the bundled demo data instead.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanlane_storefront::clock::{Clock, SystemClock};
use scanlane_storefront::config::{StorageConfig, StorefrontConfig};
use scanlane_storefront::db::{self, MemoryRepository, PgRepository, Provisioning, Repository};
use scanlane_storefront::middleware::{generate_token, hash_token};
use scanlane_storefront::routes;
use scanlane_storefront::seed::SeedData;
use scanlane_storefront::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Open the configured storage backend.
async fn open_storage(
    storage: &StorageConfig,
    clock: &dyn Clock,
) -> Result<Arc<dyn Repository>, Box<dyn std::error::Error>> {
    match storage {
        StorageConfig::Postgres { database_url } => {
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            db::MIGRATOR.run(&pool).await?;
            tracing::info!("Migrations applied");

            Ok(Arc::new(PgRepository::new(pool)))
        }
        StorageConfig::Memory => {
            let repo = MemoryRepository::new();
            let report = SeedData::demo()?.apply(&repo, clock).await?;

            let token = generate_token();
            repo.insert_admin_token(report.admin_id, &hash_token(&token), Utc::now())
                .await?;

            tracing::warn!("Using in-memory storage; all data is lost on restart");
            for (store_id, name, code) in &report.stores {
                tracing::info!(%store_id, %name, qr_code = %code, "Demo store");
            }
            tracing::info!(admin_token = %token, "Demo admin token");

            Ok(Arc::new(repo))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scanlane_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repo = open_storage(&config.storage, clock.as_ref()).await?;

    let addr = config.socket_addr();
    let state = AppState::new(config, repo, clock);
    let app = routes::app(state);

    tracing::info!("storefront listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
