//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `otp` - One-time passcode issue and verification
//! - `identity` - Customer registration, lookup and verification state
//! - `catalog` - Catalog listing with anonymous truncation, item detail
//! - `ledger` - Append-only interaction ledger
//! - `purchases` - Recorded (never charged) purchases
//! - `reviews` - Review questions and review submission
//! - `analytics` - Read-only per-store projections for admins
//!
//! Request-scoped services borrow the repository and clock from the
//! application state; the OTP service owns its challenge cache and lives in
//! the state itself.

mod error;

pub mod analytics;
pub mod catalog;
pub mod identity;
pub mod ledger;
pub mod otp;
pub mod purchases;
pub mod reviews;

pub use analytics::AnalyticsService;
pub use catalog::CatalogService;
pub use error::{FieldError, ServiceError};
pub use identity::IdentityService;
pub use ledger::InteractionLedger;
pub use otp::{OtpError, OtpService};
pub use purchases::PurchaseService;
pub use reviews::ReviewService;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests.

    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use scanlane_core::{Email, StoreId};

    use crate::clock::ManualClock;
    use crate::db::{MemoryRepository, Provisioning};
    use crate::models::{CatalogItem, NewAdmin, NewCatalogItem, NewStore, Store};

    pub fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    pub fn clock() -> ManualClock {
        ManualClock::new(start())
    }

    pub async fn store(repo: &MemoryRepository) -> Store {
        store_named(repo, "Corner Shop").await
    }

    /// A store with its own admin, so several can share one repository.
    pub async fn store_named(repo: &MemoryRepository, name: &str) -> Store {
        let slug: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();
        let admin = repo
            .insert_admin(NewAdmin {
                name: format!("{name} owner"),
                email: Email::parse(&format!("{slug}@shop.test")).unwrap(),
            })
            .await
            .unwrap();
        repo.insert_store(NewStore {
            admin_id: admin.id,
            name: name.to_string(),
            description: None,
            address: "1 Main St".to_string(),
            phone: None,
            email: None,
        })
        .await
        .unwrap()
    }

    pub async fn item(
        repo: &MemoryRepository,
        store_id: StoreId,
        name: &str,
        price: i64,
        offer: Option<i64>,
        minutes: i64,
    ) -> CatalogItem {
        repo.insert_catalog_item(NewCatalogItem {
            store_id,
            name: name.to_string(),
            description: None,
            price: Decimal::from(price),
            offer_price: offer.map(Decimal::from),
            category: None,
            active: true,
            created_at: start() + chrono::Duration::minutes(minutes),
        })
        .await
        .unwrap()
    }
}
