//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scanlane_core::{Answer, CatalogItemId, CustomerId, Rating, ReviewId, ReviewQuestionId};

/// A submitted review with its per-question answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub customer_id: CustomerId,
    pub catalog_item_id: CatalogItemId,
    pub overall_rating: Rating,
    pub comment: Option<String>,
    pub answers: Vec<ReviewAnswer>,
    pub created_at: DateTime<Utc>,
}

/// An answer to one of the store's review questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewAnswer {
    pub question_id: ReviewQuestionId,
    pub answer: Answer,
}

/// Input for inserting a review; answers are written in the same unit.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub customer_id: CustomerId,
    pub catalog_item_id: CatalogItemId,
    pub overall_rating: Rating,
    pub comment: Option<String>,
    pub answers: Vec<ReviewAnswer>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a set of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReviewStats {
    pub total: i64,
    /// Unrounded mean, `None` when there are no reviews.
    pub mean: Option<f64>,
}
