//! Demo data loading.
//!
//! Seed files are YAML (see `seed/demo.yaml`). The bundled demo set is used
//! by `scanlane-cli seed` and to populate the in-memory backend at startup.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use scanlane_core::{AdminId, Email, EmailError, QuestionType, StoreId};

use crate::clock::Clock;
use crate::db::{Repository, RepositoryError};
use crate::models::{NewAdmin, NewCatalogItem, NewReviewQuestion, NewStore};

/// The bundled demo data set.
pub const DEMO: &str = include_str!("../seed/demo.yaml");

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid email {0:?}: {1}")]
    InvalidEmail(String, EmailError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub admin: SeedAdmin,
    #[serde(default)]
    pub stores: Vec<SeedStore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedStore {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub qr_code: String,
    #[serde(default)]
    pub items: Vec<SeedItem>,
    #[serde(default)]
    pub questions: Vec<SeedQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedQuestion {
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub order_index: i32,
}

/// What a seed run created.
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub admin_id: AdminId,
    /// `(store id, store name, QR code)` per store.
    pub stores: Vec<(StoreId, String, String)>,
}

impl SeedData {
    /// Parse a YAML seed document.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Yaml` if the document does not match the schema.
    pub fn from_yaml(source: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// The bundled demo data.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Yaml` if the bundled file is malformed.
    pub fn demo() -> Result<Self, SeedError> {
        Self::from_yaml(DEMO)
    }

    /// Insert everything into `repo`.
    ///
    /// Items get consecutive creation times one second apart so catalog
    /// order follows the file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError` if an email is malformed or an insert fails
    /// (for example on a second run against the same database).
    pub async fn apply(
        &self,
        repo: &dyn Repository,
        clock: &dyn Clock,
    ) -> Result<SeedReport, SeedError> {
        let email = Email::parse(&self.admin.email)
            .map_err(|e| SeedError::InvalidEmail(self.admin.email.clone(), e))?;
        let admin = repo
            .insert_admin(NewAdmin {
                name: self.admin.name.clone(),
                email,
            })
            .await?;

        let mut stores = Vec::with_capacity(self.stores.len());
        let mut at = clock.now();

        for seed in &self.stores {
            let store = repo
                .insert_store(NewStore {
                    admin_id: admin.id,
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    address: seed.address.clone(),
                    phone: seed.phone.clone(),
                    email: seed.email.clone(),
                })
                .await?;
            repo.insert_qr_code(&seed.qr_code, store.id).await?;

            for item in &seed.items {
                repo.insert_catalog_item(NewCatalogItem {
                    store_id: store.id,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    price: item.price,
                    offer_price: item.offer_price,
                    category: item.category.clone(),
                    active: true,
                    created_at: at,
                })
                .await?;
                at += Duration::seconds(1);
            }

            for question in &seed.questions {
                repo.insert_review_question(NewReviewQuestion {
                    store_id: store.id,
                    question: question.question.clone(),
                    question_type: question.question_type,
                    options: question.options.clone(),
                    order_index: question.order_index,
                    active: true,
                })
                .await?;
            }

            info!(
                store_id = %store.id,
                items = seed.items.len(),
                questions = seed.questions.len(),
                "Seeded store"
            );
            stores.push((store.id, store.name, seed.qr_code.clone()));
        }

        Ok(SeedReport {
            admin_id: admin.id,
            stores,
        })
    }
}
