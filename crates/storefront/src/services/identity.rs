//! Customer identities.
//!
//! Registration creates an unverified, store-scoped customer. Verification
//! state flips once, after a successful OTP check. Email uniqueness is
//! reserved at the storage boundary according to the configured
//! [`UniquenessScope`].

use serde::Deserialize;
use tracing::{info, instrument};

use scanlane_core::{CustomerId, Email, IdentityKey, Phone, StoreId, UniquenessScope};

use super::{FieldError, ServiceError};
use crate::clock::Clock;
use crate::db::{Repository, RepositoryError};
use crate::models::{Customer, NewCustomer};

/// Registration input as submitted by the visitor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub address: Option<String>,
}

/// A registration form whose fields have all passed validation.
struct ValidRegistration {
    name: String,
    email: Email,
    phone: Phone,
    address: Option<String>,
}

impl RegistrationForm {
    fn validate(self) -> Result<ValidRegistration, ServiceError> {
        let mut errors = Vec::new();

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            errors.push(FieldError::new("name", "can't be blank"));
        }

        let email = Email::parse(&self.email)
            .map_err(|e| errors.push(FieldError::new("email", e.to_string())))
            .ok();

        let phone = Phone::parse(&self.phone)
            .map_err(|e| errors.push(FieldError::new("phone", e.to_string())))
            .ok();

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(ValidRegistration {
                name,
                email,
                phone,
                address: self
                    .address
                    .map(|a| a.trim().to_owned())
                    .filter(|a| !a.is_empty()),
            }),
            _ => Err(ServiceError::Validation(errors)),
        }
    }
}

/// Customer registration and lookup.
pub struct IdentityService<'a> {
    repo: &'a dyn Repository,
    clock: &'a dyn Clock,
    scope: UniquenessScope,
}

impl<'a> IdentityService<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, clock: &'a dyn Clock, scope: UniquenessScope) -> Self {
        Self { repo, clock, scope }
    }

    /// Register a new, unverified customer at `store_id`.
    ///
    /// Does not issue an OTP; the registration flow does that next.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store does not exist.
    /// Returns `ServiceError::Validation` listing every bad field.
    /// Returns `ServiceError::Conflict` if the email is already registered
    /// within the configured scope.
    #[instrument(skip(self, form), fields(store_id = %store_id))]
    pub async fn register(
        &self,
        store_id: StoreId,
        form: RegistrationForm,
    ) -> Result<Customer, ServiceError> {
        if self.repo.store(store_id).await?.is_none() {
            return Err(ServiceError::NotFound("store"));
        }

        let form = form.validate()?;
        let claim = self.scope.claim_for(store_id, &form.email);

        let customer = self
            .repo
            .insert_customer(NewCustomer {
                store_id,
                name: form.name,
                email: form.email,
                phone: form.phone,
                address: form.address,
                claim,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::Conflict {
                    field: "email",
                    message: "has already been taken".to_owned(),
                },
                other => ServiceError::Repository(other),
            })?;

        info!(customer_id = %customer.id, email = %customer.email.redacted(), "Customer registered");
        Ok(customer)
    }

    /// Mark a customer as verified. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown customer.
    #[instrument(skip(self))]
    pub async fn mark_verified(&self, customer_id: CustomerId) -> Result<(), ServiceError> {
        self.repo.mark_verified(customer_id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("customer"),
            other => ServiceError::Repository(other),
        })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the lookup fails.
    pub async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, ServiceError> {
        Ok(self.repo.customer(id).await?)
    }

    /// Case-insensitive email lookup, as seen from `store_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the lookup fails.
    pub async fn find_by_email(
        &self,
        store_id: StoreId,
        email: &Email,
    ) -> Result<Option<Customer>, ServiceError> {
        Ok(self
            .repo
            .customer_by_email(&email.normalized(), self.lookup_store(store_id))
            .await?)
    }

    /// Phone lookup on normalized digits within `store_id`.
    ///
    /// Phones are not unique. A phone shared by several customers of the
    /// store does not identify anyone, so it is refused rather than resolved
    /// to one of them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` on field `phone` if several
    /// customers share the number.
    /// Returns `ServiceError::Repository` if the lookup fails.
    pub async fn find_by_phone(
        &self,
        store_id: StoreId,
        phone: &Phone,
    ) -> Result<Option<Customer>, ServiceError> {
        let mut matches = self
            .repo
            .customers_by_phone(&phone.normalized(), store_id)
            .await?;
        if matches.len() > 1 {
            return Err(ServiceError::invalid(
                "phone",
                "is shared by several customers, use email instead",
            ));
        }
        Ok(matches.pop())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the lookup fails.
    pub async fn find_by_identity(
        &self,
        store_id: StoreId,
        key: &IdentityKey,
    ) -> Result<Option<Customer>, ServiceError> {
        match key {
            IdentityKey::Email(email) => self.find_by_email(store_id, email).await,
            IdentityKey::Phone(phone) => self.find_by_phone(store_id, phone).await,
        }
    }

    /// Store filter for lookups: none under the global scope.
    const fn lookup_store(&self, store_id: StoreId) -> Option<StoreId> {
        match self.scope {
            UniquenessScope::Global => None,
            UniquenessScope::PerStore => Some(store_id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::services::testing;

    fn form(email: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            phone: "+44 20 7946 0000".to_string(),
            address: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_creates_unverified_customer() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);

        let customer = identity.register(store.id, form("a@x.com")).await.unwrap();
        assert!(!customer.verified);
        assert_eq!(customer.store_id, store.id);
        assert_eq!(customer.address, None);
        assert_eq!(customer.created_at, testing::start());

        identity.mark_verified(customer.id).await.unwrap();
        identity.mark_verified(customer.id).await.unwrap();
        let found = identity.find_by_id(customer.id).await.unwrap().unwrap();
        assert!(found.verified);
    }

    #[tokio::test]
    async fn test_register_reports_every_bad_field() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);

        let err = identity
            .register(
                store.id,
                RegistrationForm {
                    name: " ".to_string(),
                    email: "not-an-email".to_string(),
                    phone: String::new(),
                    address: None,
                },
            )
            .await
            .unwrap_err();

        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "phone"]);
    }

    #[tokio::test]
    async fn test_register_unknown_store() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);

        let err = identity
            .register(StoreId::new(404), form("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("store")));
    }

    #[tokio::test]
    async fn test_global_scope_rejects_email_at_any_store() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let first = testing::store_named(&repo, "First").await;
        let second = testing::store_named(&repo, "Second").await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);

        identity.register(first.id, form("a@x.com")).await.unwrap();
        let err = identity
            .register(second.id, form("A@X.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { field: "email", .. }));

        // Lookups ignore the store under the global scope.
        let key = IdentityKey::Email(Email::parse("a@X.com").unwrap());
        let found = identity.find_by_identity(second.id, &key).await.unwrap();
        assert_eq!(found.map(|c| c.store_id), Some(first.id));
    }

    #[tokio::test]
    async fn test_per_store_scope_allows_same_email_elsewhere() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let first = testing::store_named(&repo, "First").await;
        let second = testing::store_named(&repo, "Second").await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::PerStore);

        let a = identity.register(first.id, form("a@x.com")).await.unwrap();
        let b = identity.register(second.id, form("a@x.com")).await.unwrap();
        assert_ne!(a.id, b.id);

        let err = identity
            .register(first.id, form("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));

        let email = Email::parse("a@x.com").unwrap();
        let found = identity.find_by_email(second.id, &email).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(b.id));
    }

    #[tokio::test]
    async fn test_find_by_phone_normalizes() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);

        let customer = identity.register(store.id, form("a@x.com")).await.unwrap();
        let phone = Phone::parse("+44 (20) 7946-0000").unwrap();
        let found = identity.find_by_phone(store.id, &phone).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(customer.id));
    }

    #[tokio::test]
    async fn test_shared_phone_identifies_nobody() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let other = testing::store_named(&repo, "Other").await;
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);
        let phone = Phone::parse("+44 20 7946 0000").unwrap();

        // Same phone at another store does not make it ambiguous here.
        let elsewhere = identity.register(other.id, form("b@x.com")).await.unwrap();
        let ada = identity.register(store.id, form("a@x.com")).await.unwrap();
        let found = identity.find_by_phone(store.id, &phone).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(ada.id));
        let found = identity.find_by_phone(other.id, &phone).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(elsewhere.id));

        identity.register(store.id, form("c@x.com")).await.unwrap();
        let err = identity
            .find_by_identity(store.id, &IdentityKey::Phone(phone))
            .await
            .unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields[0].field, "phone");
    }

    #[tokio::test]
    async fn test_mark_verified_unknown_customer() {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let identity = IdentityService::new(&repo, &clock, UniquenessScope::Global);
        let err = identity.mark_verified(CustomerId::new(9)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("customer")));
    }
}
