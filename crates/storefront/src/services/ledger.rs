//! Append-only interaction ledger.
//!
//! Every customer action the funnel cares about lands here as one record.
//! Records are never updated or removed.

use chrono::{DateTime, Utc};
use tracing::instrument;

use scanlane_core::{CatalogItemId, CustomerId, InteractionType, StoreId};

use super::ServiceError;
use crate::clock::Clock;
use crate::db::Repository;
use crate::models::{InteractionRecord, Metadata, NewInteraction};

/// A record about to be appended.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    store_id: StoreId,
    interaction_type: InteractionType,
    customer_id: Option<CustomerId>,
    catalog_item_id: Option<CatalogItemId>,
    metadata: Metadata,
    at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(store_id: StoreId, interaction_type: InteractionType) -> Self {
        Self {
            store_id,
            interaction_type,
            customer_id: None,
            catalog_item_id: None,
            metadata: Metadata::new(),
            at: None,
        }
    }

    #[must_use]
    pub const fn customer(mut self, customer_id: Option<CustomerId>) -> Self {
        self.customer_id = customer_id;
        self
    }

    #[must_use]
    pub const fn item(mut self, catalog_item_id: CatalogItemId) -> Self {
        self.catalog_item_id = Some(catalog_item_id);
        self
    }

    #[must_use]
    pub fn meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }

    /// Override the timestamp, which otherwise defaults to now.
    #[must_use]
    pub const fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }
}

pub struct InteractionLedger<'a> {
    repo: &'a dyn Repository,
    clock: &'a dyn Clock,
}

impl<'a> InteractionLedger<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, clock: &'a dyn Clock) -> Self {
        Self { repo, clock }
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the insert fails.
    #[instrument(skip(self, entry), fields(store_id = %entry.store_id, kind = %entry.interaction_type))]
    pub async fn append(&self, entry: LedgerEntry) -> Result<InteractionRecord, ServiceError> {
        let record = self
            .repo
            .append_interaction(NewInteraction {
                store_id: entry.store_id,
                customer_id: entry.customer_id,
                catalog_item_id: entry.catalog_item_id,
                interaction_type: entry.interaction_type,
                metadata: entry.metadata,
                created_at: entry.at.unwrap_or_else(|| self.clock.now()),
            })
            .await?;
        Ok(record)
    }

    /// Most recent records first, ties broken by insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn recent_for_store(
        &self,
        store_id: StoreId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, ServiceError> {
        Ok(self.repo.recent_interactions(store_id, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count_for_store(&self, store_id: StoreId) -> Result<i64, ServiceError> {
        Ok(self.repo.count_interactions(store_id, None).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count_for_store_by_type(
        &self,
        store_id: StoreId,
        interaction_type: InteractionType,
    ) -> Result<i64, ServiceError> {
        Ok(self
            .repo
            .count_interactions(store_id, Some(interaction_type))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::MemoryRepository;
    use crate::services::testing;

    #[tokio::test]
    async fn test_append_defaults_timestamp_to_now() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let ledger = InteractionLedger::new(&repo, &clock);

        let record = ledger
            .append(
                LedgerEntry::new(StoreId::new(1), InteractionType::CatalogBrowse)
                    .meta("action", "purchase")
                    .meta("quantity", 2),
            )
            .await
            .unwrap();
        assert_eq!(record.created_at, testing::start());
        assert_eq!(record.customer_id, None);
        assert_eq!(record.metadata["action"], "purchase");
        assert_eq!(record.metadata["quantity"], 2);
    }

    #[tokio::test]
    async fn test_recent_and_counts() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let ledger = InteractionLedger::new(&repo, &clock);
        let store = StoreId::new(1);
        let other = StoreId::new(2);

        let kinds = [
            InteractionType::View,
            InteractionType::View,
            InteractionType::ReviewSubmit,
            InteractionType::CatalogBrowse,
        ];
        for kind in kinds {
            ledger.append(LedgerEntry::new(store, kind)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        ledger
            .append(LedgerEntry::new(other, InteractionType::View))
            .await
            .unwrap();
        // Backdated entry sorts by its own timestamp.
        let old = ledger
            .append(LedgerEntry::new(store, InteractionType::View).at(testing::start() - Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(ledger.count_for_store(store).await.unwrap(), 5);
        assert_eq!(
            ledger
                .count_for_store_by_type(store, InteractionType::View)
                .await
                .unwrap(),
            3
        );
        assert_eq!(ledger.count_for_store(other).await.unwrap(), 1);

        let recent = ledger.recent_for_store(store, 3).await.unwrap();
        let kinds: Vec<_> = recent.iter().map(|r| r.interaction_type).collect();
        assert_eq!(
            kinds,
            vec![
                InteractionType::CatalogBrowse,
                InteractionType::ReviewSubmit,
                InteractionType::View
            ]
        );

        let all = ledger.recent_for_store(store, 100).await.unwrap();
        assert_eq!(all.last().map(|r| r.id), Some(old.id));
    }
}
