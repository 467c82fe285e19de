//! QR code entry point.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::Store;
use crate::state::AppState;

/// Resolve a scanned QR code to the public store profile.
#[instrument(skip(state))]
pub async fn scan(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<Store>> {
    let store = state
        .repo()
        .store_by_qr_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("qr code {code}")))?;

    Ok(Json(store))
}
