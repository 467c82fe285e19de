//! Review routes for verified customers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use scanlane_core::CustomerId;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireCustomer;
use crate::models::ReviewQuestion;
use crate::services::reviews::{ReviewConfirmation, ReviewSubmission};
use crate::state::AppState;

/// The active review questions of the customer's store.
#[instrument(skip(state, guard))]
pub async fn questions(
    State(state): State<AppState>,
    guard: RequireCustomer,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<Vec<ReviewQuestion>>> {
    let customer = guard.authorize(customer_id)?;
    Ok(Json(state.reviews().questions(customer.id).await?))
}

/// Submit a review with answers.
#[instrument(skip(state, guard, submission))]
pub async fn create(
    State(state): State<AppState>,
    guard: RequireCustomer,
    Path(customer_id): Path<CustomerId>,
    Json(submission): Json<ReviewSubmission>,
) -> Result<(StatusCode, Json<ReviewConfirmation>)> {
    let customer = guard.authorize(customer_id)?;
    let confirmation = state.reviews().submit(customer.id, submission).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}
