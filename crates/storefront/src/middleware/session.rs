//! Session middleware configuration and engagement session helpers.
//!
//! Sessions live in process memory via tower-sessions. They carry only the
//! advisory browsing counter and the verified customer, both of which a
//! visitor can rebuild by browsing and verifying again.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use scanlane_core::EngagementSession;

use crate::config::StorefrontConfig;
use crate::models::{SessionCustomer, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "scanlane_session";

/// Session expiry time in seconds (1 day).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load the engagement counter, starting a fresh one if absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_engagement(
    session: &Session,
) -> Result<EngagementSession, tower_sessions::session::Error> {
    Ok(session
        .get::<EngagementSession>(session_keys::ENGAGEMENT)
        .await?
        .unwrap_or_default())
}

/// Persist the engagement counter.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_engagement(
    session: &Session,
    engagement: &EngagementSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::ENGAGEMENT, engagement).await
}

/// The verified customer in the session, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn current_customer(
    session: &Session,
) -> Result<Option<SessionCustomer>, tower_sessions::session::Error> {
    session.get(session_keys::CURRENT_CUSTOMER).await
}

/// Attach a verified customer to the session.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: SessionCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;

    let mut engagement = load_engagement(session).await?;
    engagement.attach_identity(customer.id);
    save_engagement(session, &engagement).await?;

    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Forget the customer and the browsing counter (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
