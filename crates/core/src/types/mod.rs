//! Core types for Scanlane.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod identity;
pub mod interaction;
pub mod phone;
pub mod rating;
pub mod review;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{IdentityKey, UniquenessScope};
pub use interaction::InteractionType;
pub use phone::{Phone, PhoneError};
pub use rating::{Rating, RatingError, average_rating, round2};
pub use review::{Answer, AnswerError, QuestionType};
