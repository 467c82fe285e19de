//! One-time passcodes.
//!
//! Codes are six-digit strings held in a `moka` cache keyed by the claimed
//! identity (email or phone) as presented at one store; see
//! [`IdentityKey::challenge_key`]. Each key has at most one live challenge; a
//! new issue overwrites the previous one. Codes are handed back to the caller
//! rather than delivered.
//!
//! Expiry is judged against the injected [`Clock`] when a code is verified.
//! The cache's own TTL only reclaims memory for codes nobody tries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, instrument};

use scanlane_core::{IdentityKey, StoreId, UniquenessScope};

use crate::clock::Clock;

/// Default lifetime of a challenge.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Upper bound on outstanding challenges held in memory.
const MAX_CHALLENGES: u64 = 100_000;

/// OTP verification failure. Deliberately says nothing about which check
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("invalid or expired OTP")]
    InvalidOrExpired,
}

/// A pending challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Issues and verifies one-time passcodes.
#[derive(Clone)]
pub struct OtpService {
    inner: Arc<OtpServiceInner>,
}

struct OtpServiceInner {
    cache: Cache<String, OtpChallenge>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    scope: UniquenessScope,
}

impl std::fmt::Debug for OtpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpService")
            .field("ttl", &self.inner.ttl)
            .field("scope", &self.inner.scope)
            .field("pending", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl OtpService {
    /// Create a service whose challenges live for `ttl`, keyed under the
    /// customer uniqueness `scope`.
    #[must_use]
    pub fn new(ttl: Duration, scope: UniquenessScope, clock: Arc<dyn Clock>) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CHALLENGES)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(OtpServiceInner {
                cache,
                clock,
                ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
                scope,
            }),
        }
    }

    fn challenge_key(&self, store_id: StoreId, key: &IdentityKey) -> String {
        key.challenge_key(self.inner.scope, store_id)
    }

    /// Issue a fresh code for `key` at `store_id`, replacing any pending one.
    #[instrument(skip(self), fields(identity = %key))]
    pub async fn issue(&self, store_id: StoreId, key: &IdentityKey) -> String {
        let code = generate_code();
        let issued_at = self.inner.clock.now();
        let challenge = OtpChallenge {
            code: code.clone(),
            issued_at,
            expires_at: issued_at + self.inner.ttl,
        };
        self.inner
            .cache
            .insert(self.challenge_key(store_id, key), challenge)
            .await;
        debug!("OTP issued");
        code
    }

    /// Verify `submitted` against the pending challenge for `key`.
    ///
    /// A matching live code is consumed, so it verifies at most once even
    /// under concurrent calls. An expired challenge is dropped. A wrong code
    /// leaves a live challenge untouched.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidOrExpired` if there is no live challenge or
    /// the code does not match exactly.
    #[instrument(skip(self, submitted), fields(identity = %key))]
    pub async fn verify(
        &self,
        store_id: StoreId,
        key: &IdentityKey,
        submitted: &str,
    ) -> Result<(), OtpError> {
        let now = self.inner.clock.now();

        let result = self
            .inner
            .cache
            .entry(self.challenge_key(store_id, key))
            .and_compute_with(|entry| {
                let op = match entry.map(moka::Entry::into_value) {
                    Some(challenge) if !challenge.is_live(now) => Op::Remove,
                    Some(challenge) if challenge.code == submitted => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Removed(entry) => {
                let challenge = entry.into_value();
                if challenge.is_live(now) && challenge.code == submitted {
                    debug!("OTP verified");
                    Ok(())
                } else {
                    debug!("Expired OTP discarded");
                    Err(OtpError::InvalidOrExpired)
                }
            }
            _ => Err(OtpError::InvalidOrExpired),
        }
    }

    /// The pending challenge for `key` at `store_id`, if any. Does not check
    /// expiry.
    pub async fn pending(&self, store_id: StoreId, key: &IdentityKey) -> Option<OtpChallenge> {
        self.inner.cache.get(&self.challenge_key(store_id, key)).await
    }
}

/// A uniformly random six-digit code.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999_u32).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scanlane_core::{Email, Phone};

    const STORE: StoreId = StoreId::new(1);

    use super::*;
    use crate::clock::ManualClock;
    use crate::services::testing;

    fn email_key(s: &str) -> IdentityKey {
        IdentityKey::Email(Email::parse(s).unwrap())
    }

    fn service() -> (OtpService, Arc<ManualClock>) {
        let clock = Arc::new(testing::clock());
        (OtpService::new(DEFAULT_TTL, UniquenessScope::Global, clock.clone()), clock)
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[tokio::test]
    async fn test_code_verifies_exactly_once() {
        let (otp, _clock) = service();
        let key = email_key("a@x.com");

        let code = otp.issue(STORE, &key).await;
        assert!(otp.verify(STORE, &key, &code).await.is_ok());
        assert_eq!(
            otp.verify(STORE, &key, &code).await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_challenge() {
        let (otp, _clock) = service();
        let key = email_key("a@x.com");

        let code = otp.issue(STORE, &key).await;
        let wrong = if code == "123456" { "654321" } else { "123456" };
        assert_eq!(otp.verify(STORE, &key, wrong).await, Err(OtpError::InvalidOrExpired));
        assert!(otp.verify(STORE, &key, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code_fails_and_is_dropped() {
        let (otp, clock) = service();
        let key = email_key("a@x.com");

        let code = otp.issue(STORE, &key).await;
        clock.advance(chrono::Duration::minutes(10));
        assert_eq!(otp.verify(STORE, &key, &code).await, Err(OtpError::InvalidOrExpired));
        assert!(otp.pending(STORE, &key).await.is_none());
    }

    #[tokio::test]
    async fn test_code_valid_just_before_expiry() {
        let (otp, clock) = service();
        let key = email_key("a@x.com");

        let code = otp.issue(STORE, &key).await;
        clock.advance(chrono::Duration::minutes(10) - chrono::Duration::seconds(1));
        assert!(otp.verify(STORE, &key, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let (otp, _clock) = service();
        let key = email_key("a@x.com");

        let mut first = otp.issue(STORE, &key).await;
        let mut second = otp.issue(STORE, &key).await;
        // Codes are random; make sure the two differ before asserting.
        while first == second {
            first = second;
            second = otp.issue(STORE, &key).await;
        }

        assert_eq!(otp.verify(STORE, &key, &first).await, Err(OtpError::InvalidOrExpired));
        assert!(otp.verify(STORE, &key, &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_are_case_insensitive_and_independent() {
        let (otp, _clock) = service();
        let upper = email_key("A@X.com");
        let lower = email_key("a@x.com");
        let phone = IdentityKey::Phone(Phone::parse("+1 555 0100").unwrap());

        let code = otp.issue(STORE, &upper).await;
        assert!(otp.verify(STORE, &phone, &code).await.is_err());
        assert!(otp.verify(STORE, &lower, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_without_challenge() {
        let (otp, _clock) = service();
        assert_eq!(
            otp.verify(STORE, &email_key("nobody@x.com"), "123456").await,
            Err(OtpError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_challenge_records_issue_window() {
        let (otp, _clock) = service();
        let key = email_key("a@x.com");
        otp.issue(STORE, &key).await;
        let challenge = otp.pending(STORE, &key).await.unwrap();
        assert_eq!(challenge.issued_at, testing::start());
        assert_eq!(
            challenge.expires_at - challenge.issued_at,
            chrono::Duration::minutes(10)
        );
    }

    #[tokio::test]
    async fn test_per_store_scope_keeps_challenges_apart() {
        let clock = Arc::new(testing::clock());
        let otp = OtpService::new(DEFAULT_TTL, UniquenessScope::PerStore, clock);
        let key = email_key("a@x.com");
        let (first, second) = (StoreId::new(1), StoreId::new(2));

        let first_code = otp.issue(first, &key).await;
        let mut second_code = otp.issue(second, &key).await;
        while second_code == first_code {
            second_code = otp.issue(second, &key).await;
        }

        assert!(otp.verify(first, &key, &second_code).await.is_err());
        assert!(otp.verify(first, &key, &first_code).await.is_ok());
        assert!(otp.verify(second, &key, &second_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_global_scope_shares_email_challenge() {
        let (otp, _clock) = service();
        let key = email_key("a@x.com");

        let code = otp.issue(StoreId::new(1), &key).await;
        assert!(otp.verify(StoreId::new(2), &key, &code).await.is_ok());
    }
}
