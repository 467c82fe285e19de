//! Scanlane Core - Shared types library.
//!
//! This crate provides common types used across all Scanlane components:
//! - `storefront` - Customer and admin JSON API
//! - `cli` - Command-line tools for migrations, seeding and admin tokens
//!
//! # Architecture
//!
//! The core crate contains only types and pure policy - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, phones, ratings and review answers
//! - [`engagement`] - The anonymous browsing counter and its gating policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod engagement;
pub mod types;

pub use engagement::{EngagementPolicy, EngagementSession};
pub use types::*;
