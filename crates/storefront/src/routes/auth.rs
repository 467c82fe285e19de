//! Registration and one-time passcode routes.
//!
//! Codes are returned in the response body; delivering them by email or SMS
//! is left to whatever fronts this API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use scanlane_core::{Email, IdentityKey, Phone, StoreId};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{clear_session, set_current_customer};
use crate::models::{Customer, SessionCustomer};
use crate::services::ServiceError;
use crate::services::identity::RegistrationForm;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Identifies the customer an OTP is for: an email or a phone number.
#[derive(Debug, Deserialize)]
pub struct IdentityClaim {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl IdentityClaim {
    /// The identity key, preferring email when both are given.
    fn key(&self) -> std::result::Result<IdentityKey, ServiceError> {
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            return Email::parse(email)
                .map(IdentityKey::Email)
                .map_err(|e| ServiceError::invalid("email", e.to_string()));
        }
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            return Phone::parse(phone)
                .map(IdentityKey::Phone)
                .map_err(|e| ServiceError::invalid("phone", e.to_string()));
        }
        Err(ServiceError::invalid("email", "email or phone is required"))
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub claim: IdentityClaim,
    #[serde(default)]
    pub code: String,
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub customer: Customer,
    pub otp_code: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OtpIssued {
    pub otp_code: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub customer: Customer,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoggedOut {
    pub message: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register an unverified customer and issue the first OTP for their email.
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<RegistrationResponse>)> {
    let customer = state.identity().register(store_id, form).await?;
    let otp_code = state
        .otp()
        .issue(store_id, &IdentityKey::Email(customer.email.clone()))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            customer,
            otp_code,
            message: "Registration successful. Verify with the code sent.",
        }),
    ))
}

/// Issue a fresh OTP for an existing customer, replacing any pending one.
#[instrument(skip(state, claim))]
pub async fn send_otp(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    Json(claim): Json<IdentityClaim>,
) -> Result<Json<OtpIssued>> {
    let key = claim.key()?;
    if state.repo().store(store_id).await?.is_none() {
        return Err(ServiceError::NotFound("store").into());
    }

    state
        .identity()
        .find_by_identity(store_id, &key)
        .await?
        .ok_or(ServiceError::NotFound("customer"))?;

    let otp_code = state.otp().issue(store_id, &key).await;

    Ok(Json(OtpIssued {
        otp_code,
        expires_in_seconds: state.config().engagement.otp_ttl.as_secs(),
    }))
}

/// Check an OTP, mark the customer verified and attach them to the session.
#[instrument(skip(state, session, request))]
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Path(store_id): Path<StoreId>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifiedResponse>> {
    let key = request
        .claim
        .key()
        .map_err(|_| AppError::Unauthorized("unusable identity".to_string()))?;

    let identity = state.identity();
    let customer = match identity.find_by_identity(store_id, &key).await {
        Ok(Some(customer)) => customer,
        Ok(None) => return Err(ServiceError::NotFound("customer").into()),
        // A claim that matches several customers cannot be verified.
        Err(ServiceError::Validation(_)) => {
            return Err(AppError::Unauthorized("ambiguous identity".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    state
        .otp()
        .verify(store_id, &key, request.code.trim())
        .await?;
    identity.mark_verified(customer.id).await?;

    set_current_customer(
        &session,
        SessionCustomer {
            id: customer.id,
            store_id: customer.store_id,
        },
    )
    .await?;
    set_sentry_user(&customer.id);
    tracing::info!(customer_id = %customer.id, "Customer verified");

    Ok(Json(VerifiedResponse {
        customer: Customer {
            verified: true,
            ..customer
        },
        message: "Verification successful",
    }))
}

/// Forget the verified customer and reset the browsing counter.
pub async fn logout(session: Session) -> Result<Json<LoggedOut>> {
    clear_session(&session).await?;
    clear_sentry_user();

    Ok(Json(LoggedOut {
        message: "Logged out",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn claim(email: Option<&str>, phone: Option<&str>) -> IdentityClaim {
        IdentityClaim {
            email: email.map(String::from),
            phone: phone.map(String::from),
        }
    }

    #[test]
    fn test_claim_prefers_email() {
        let key = claim(Some("A@X.com"), Some("555-0100")).key().unwrap();
        assert!(matches!(key, IdentityKey::Email(_)));
    }

    #[test]
    fn test_claim_falls_back_to_phone() {
        let key = claim(Some("  "), Some("555-0100")).key().unwrap();
        assert!(matches!(key, IdentityKey::Phone(_)));
    }

    #[test]
    fn test_claim_requires_something() {
        assert!(matches!(
            claim(None, None).key(),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            claim(Some("not-an-email"), None).key(),
            Err(ServiceError::Validation(_))
        ));
    }
}
