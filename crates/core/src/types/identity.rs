//! Identity claims used to bind one-time passcodes and to enforce customer
//! uniqueness.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{Email, Phone, StoreId};

/// The identity a visitor claims to control: an email address or a phone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityKey {
    Email(Email),
    Phone(Phone),
}

impl IdentityKey {
    /// Key of the one live OTP challenge for this claim when presented at
    /// `store_id`.
    ///
    /// Emails follow the uniqueness scope, so a per-store registration gets a
    /// challenge of its own (`email:a@x.com`, `email:3:a@x.com`). Phones are
    /// not unique claims and always resolve within one store
    /// (`phone:3:+15550123`).
    #[must_use]
    pub fn challenge_key(&self, scope: UniquenessScope, store_id: StoreId) -> String {
        match self {
            Self::Email(email) => format!("email:{}", scope.claim_for(store_id, email)),
            Self::Phone(phone) => format!("phone:{store_id}:{}", phone.normalized()),
        }
    }

    /// A rendering safe to put in logs.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Email(email) => email.redacted(),
            Self::Phone(phone) => {
                let digits = phone.normalized();
                let tail: String = digits
                    .chars()
                    .rev()
                    .take(2)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("***{tail}")
            }
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// How far customer email uniqueness reaches.
///
/// `Global` means one customer per email across every store; `PerStore`
/// lets the same person register independently at several stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UniquenessScope {
    #[default]
    Global,
    PerStore,
}

impl UniquenessScope {
    /// The claim string reserved for `email` when registering at `store_id`.
    #[must_use]
    pub fn claim_for(self, store_id: StoreId, email: &Email) -> String {
        match self {
            Self::Global => email.normalized(),
            Self::PerStore => format!("{store_id}:{}", email.normalized()),
        }
    }
}

impl fmt::Display for UniquenessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::PerStore => write!(f, "per_store"),
        }
    }
}

impl std::str::FromStr for UniquenessScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "per_store" => Ok(Self::PerStore),
            _ => Err(format!("invalid uniqueness scope: {s}")),
        }
    }
}
