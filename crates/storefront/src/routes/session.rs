//! Engagement session status.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;

use scanlane_core::{CatalogItemId, CustomerId};

use crate::error::Result;
use crate::middleware::load_engagement;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub interaction_count: u32,
    pub viewed_items: Vec<CatalogItemId>,
    pub customer_id: Option<CustomerId>,
    pub threshold: u32,
    pub should_gate: bool,
}

/// Report the visitor's browsing counter and whether to nudge verification.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<SessionStatus>> {
    let engagement = load_engagement(&session).await?;
    let policy = state.policy();

    Ok(Json(SessionStatus {
        should_gate: policy.should_gate(&engagement),
        threshold: policy.threshold(),
        interaction_count: engagement.interaction_count,
        customer_id: engagement.identity,
        viewed_items: engagement.viewed_items.into_iter().collect(),
    }))
}
