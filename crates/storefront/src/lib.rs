//! Scanlane Storefront library.
//!
//! The customer engagement funnel (QR scan, gated catalog, OTP verification,
//! purchases and reviews) and the admin analytics API, as a library so the
//! binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
