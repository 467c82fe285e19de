//! Authentication extractors.
//!
//! Customers authenticate by verifying a one-time passcode, which attaches
//! them to the cookie session. Admins authenticate with a bearer token whose
//! SHA-256 hash is stored alongside their account.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use tower_sessions::Session;

use scanlane_core::CustomerId;

use super::session::current_customer;
use crate::error::AppError;
use crate::models::{AuthorizedAdmin, SessionCustomer};
use crate::state::AppState;

/// Extractor that requires a verified customer in the session.
///
/// Handlers for `/customers/{id}/...` routes must call
/// [`RequireCustomer::authorize`] with the path id.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     customer: RequireCustomer,
///     Path(id): Path<CustomerId>,
/// ) -> Result<Json<Value>> {
///     let customer = customer.authorize(id)?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireCustomer(pub SessionCustomer);

impl RequireCustomer {
    /// Confirm that the session customer is the one named in the path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when they differ.
    pub fn authorize(self, customer_id: CustomerId) -> Result<SessionCustomer, AppError> {
        if self.0.id == customer_id {
            Ok(self.0)
        } else {
            Err(AppError::Unauthorized("customer mismatch".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("no session".to_string()))?;

        current_customer(session)
            .await
            .ok()
            .flatten()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("not verified".to_string()))
    }
}

/// Extractor that optionally gets the verified customer.
///
/// Unlike `RequireCustomer`, this does not reject anonymous visitors.
#[derive(Debug, Clone, Copy)]
pub struct OptionalCustomer(pub Option<SessionCustomer>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => current_customer(session).await.ok().flatten(),
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Extractor that requires a valid admin bearer token.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub AuthorizedAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let admin = state
            .repo()
            .admin_by_token_hash(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown token".to_string()))?;

        tracing::debug!(admin_id = %admin.id, "Admin authenticated");
        Ok(Self(AuthorizedAdmin::new(admin.id)))
    }
}

/// Hash an admin bearer token for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Generate a fresh admin bearer token (32 random bytes, base64url).
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scanlane_core::StoreId;

    #[test]
    fn test_hash_token_is_stable_and_opaque() {
        let token = "s3cret-token";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), token);
        assert_ne!(hash_token(token), hash_token("other"));
        // 32 bytes of SHA-256, base64url without padding
        assert_eq!(hash_token(token).len(), 43);
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_authorize_requires_same_customer() {
        let customer = SessionCustomer {
            id: CustomerId::new(4),
            store_id: StoreId::new(1),
        };
        let guard = RequireCustomer(customer);
        assert_eq!(guard.authorize(CustomerId::new(4)).unwrap(), customer);
        assert!(matches!(
            guard.authorize(CustomerId::new(5)),
            Err(AppError::Unauthorized(_))
        ));
    }
}
