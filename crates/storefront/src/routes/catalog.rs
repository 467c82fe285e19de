//! Catalog listing and item detail routes.
//!
//! Each successful request ticks the advisory counter in the visitor's
//! session and reports whether the verification nudge should be shown.
//! How many items are revealed depends only on whether the session carries
//! a verified customer of this store.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use scanlane_core::{CatalogItemId, CustomerId, EngagementSession, InteractionType, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalCustomer, load_engagement, save_engagement};
use crate::models::SessionCustomer;
use crate::services::catalog::{CatalogPage, ItemDetail};
use crate::services::ledger::LedgerEntry;
use crate::state::AppState;

/// Advisory engagement state returned with catalog responses.
#[derive(Debug, Serialize)]
pub struct EngagementStatus {
    pub interaction_count: u32,
    pub should_gate: bool,
}

impl EngagementStatus {
    fn of(state: &AppState, engagement: &EngagementSession) -> Self {
        Self {
            interaction_count: engagement.interaction_count,
            should_gate: state.policy().should_gate(engagement),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    #[serde(flatten)]
    pub page: CatalogPage,
    pub engagement: EngagementStatus,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: ItemDetail,
    pub engagement: EngagementStatus,
}

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub customer_id: Option<CustomerId>,
}

/// The session customer if they belong to `store_id`.
fn store_customer(
    customer: Option<SessionCustomer>,
    store_id: StoreId,
) -> Option<SessionCustomer> {
    customer.filter(|c| c.store_id == store_id)
}

/// List a store's catalog, truncated for anonymous visitors.
#[instrument(skip(state, session, customer))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Path(store_id): Path<StoreId>,
) -> Result<Json<CatalogResponse>> {
    let customer = store_customer(customer, store_id);
    let page = state
        .catalog()
        .list_catalog(store_id, customer.is_some())
        .await?;

    state
        .ledger()
        .append(
            LedgerEntry::new(store_id, InteractionType::CatalogBrowse)
                .customer(customer.map(|c| c.id)),
        )
        .await?;

    let mut engagement = load_engagement(&session).await?;
    engagement.record_interaction(None);
    save_engagement(&session, &engagement).await?;

    Ok(Json(CatalogResponse {
        page,
        engagement: EngagementStatus::of(&state, &engagement),
    }))
}

/// Show one item with its rating statistics.
///
/// A `customer_id` in the query must be the verified session customer of
/// this store; the view is then attributed to them. Without it, the session customer (if
/// any) is used.
#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Path((store_id, item_id)): Path<(StoreId, CatalogItemId)>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ItemResponse>> {
    let viewer = match (query.customer_id, store_customer(customer, store_id)) {
        (Some(requested), Some(current)) if requested == current.id => Some(requested),
        (Some(_), _) => return Err(AppError::Unauthorized("customer mismatch".to_string())),
        (None, current) => current.map(|c| c.id),
    };

    let item = state.catalog().get_item(store_id, item_id, viewer).await?;

    let mut engagement = load_engagement(&session).await?;
    engagement.record_interaction(Some(item_id));
    save_engagement(&session, &engagement).await?;

    Ok(Json(ItemResponse {
        item,
        engagement: EngagementStatus::of(&state, &engagement),
    }))
}
