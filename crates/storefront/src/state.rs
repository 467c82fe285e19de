//! Application state shared across handlers.

use std::sync::Arc;

use scanlane_core::EngagementPolicy;

use crate::clock::Clock;
use crate::config::StorefrontConfig;
use crate::db::Repository;
use crate::services::{
    AnalyticsService, CatalogService, IdentityService, InteractionLedger, OtpService,
    PurchaseService, ReviewService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the repository, the OTP cache and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    otp: OtpService,
    policy: EngagementPolicy,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `repo` - Storage backend (Postgres or in-memory)
    /// * `clock` - Time source for OTP expiry and ledger timestamps
    #[must_use]
    pub fn new(config: StorefrontConfig, repo: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        let otp = OtpService::new(
            config.engagement.otp_ttl,
            config.engagement.identity_scope,
            Arc::clone(&clock),
        );
        let policy = EngagementPolicy::new(config.engagement.gate_threshold);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                clock,
                otp,
                policy,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the repository.
    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.inner.repo.as_ref()
    }

    /// Get a reference to the clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Get a reference to the OTP service.
    #[must_use]
    pub fn otp(&self) -> &OtpService {
        &self.inner.otp
    }

    /// The engagement gating rule.
    #[must_use]
    pub fn policy(&self) -> EngagementPolicy {
        self.inner.policy
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(
            self.repo(),
            self.clock(),
            self.config().engagement.anonymous_item_limit,
        )
    }

    #[must_use]
    pub fn identity(&self) -> IdentityService<'_> {
        IdentityService::new(
            self.repo(),
            self.clock(),
            self.config().engagement.identity_scope,
        )
    }

    #[must_use]
    pub fn ledger(&self) -> InteractionLedger<'_> {
        InteractionLedger::new(self.repo(), self.clock())
    }

    #[must_use]
    pub fn purchases(&self) -> PurchaseService<'_> {
        PurchaseService::new(self.repo(), self.clock())
    }

    #[must_use]
    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(self.repo(), self.clock())
    }

    #[must_use]
    pub fn analytics(&self) -> AnalyticsService<'_> {
        AnalyticsService::new(self.repo())
    }
}
