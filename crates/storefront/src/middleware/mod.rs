//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//! 5. Rate limiting on the OTP routes (governor)
//!
//! Customer and admin authentication are extractors, not layers.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalCustomer, RequireAdmin, RequireCustomer, generate_token, hash_token};
pub use rate_limit::otp_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use session::{
    clear_session, create_session_layer, current_customer, load_engagement, save_engagement,
    set_current_customer,
};
