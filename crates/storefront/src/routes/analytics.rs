//! Admin analytics routes.
//!
//! All require an admin bearer token; stores the admin does not own are
//! reported as not found.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use scanlane_core::StoreId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::analytics::{CustomerSummary, InteractionSummary, ReviewSummary};
use crate::state::AppState;

#[instrument(skip(state, admin))]
pub async fn customers(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(store_id): Path<StoreId>,
) -> Result<Json<CustomerSummary>> {
    Ok(Json(
        state.analytics().customer_summary(&admin, store_id).await?,
    ))
}

#[instrument(skip(state, admin))]
pub async fn interactions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(store_id): Path<StoreId>,
) -> Result<Json<InteractionSummary>> {
    Ok(Json(
        state
            .analytics()
            .interaction_summary(&admin, store_id)
            .await?,
    ))
}

#[instrument(skip(state, admin))]
pub async fn reviews(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(store_id): Path<StoreId>,
) -> Result<Json<ReviewSummary>> {
    Ok(Json(state.analytics().review_summary(&admin, store_id).await?))
}
