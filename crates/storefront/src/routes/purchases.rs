//! Purchase routes for verified customers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use scanlane_core::CustomerId;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireCustomer;
use crate::services::purchases::{PurchaseReceipt, PurchaseRequest, PurchasedItem};
use crate::state::AppState;

/// Record a purchase.
#[instrument(skip(state, guard, request))]
pub async fn create(
    State(state): State<AppState>,
    guard: RequireCustomer,
    Path(customer_id): Path<CustomerId>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseReceipt>)> {
    let customer = guard.authorize(customer_id)?;
    let receipt = state.purchases().record(customer.id, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// List what the customer has bought, flagging items already reviewed.
#[instrument(skip(state, guard))]
pub async fn index(
    State(state): State<AppState>,
    guard: RequireCustomer,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<Vec<PurchasedItem>>> {
    let customer = guard.authorize(customer_id)?;
    Ok(Json(state.purchases().purchased_items(customer.id).await?))
}
