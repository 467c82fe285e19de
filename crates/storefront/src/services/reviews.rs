//! Review questions and review submission.
//!
//! A submission is validated in full before anything is written: the rating,
//! the item, and every answer against the store's active questions. Only then
//! are the review and its answers stored (as one unit) and a `review_submit`
//! interaction appended.
//!
//! Having purchased the item is not required to review it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use scanlane_core::{
    Answer, CatalogItemId, CustomerId, InteractionType, Rating, ReviewId, ReviewQuestionId,
};

use super::ledger::{InteractionLedger, LedgerEntry};
use super::{FieldError, ServiceError};
use crate::clock::Clock;
use crate::db::Repository;
use crate::models::{Customer, NewReview, ReviewAnswer, ReviewQuestion};

/// One answer in a submission. The answer stays undecoded until it is
/// checked against its question, so a malformed answer is reported against
/// its position like any other mismatch.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: ReviewQuestionId,
    pub answer: serde_json::Value,
}

impl AnswerSubmission {
    #[must_use]
    pub fn typed(question_id: ReviewQuestionId, answer: &Answer) -> Self {
        Self {
            question_id,
            answer: serde_json::to_value(answer).unwrap_or_default(),
        }
    }
}

/// A review as submitted. The rating is kept raw so range errors surface as
/// field errors rather than decoding failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub catalog_item_id: Option<CatalogItemId>,
    pub overall_rating: Option<i64>,
    pub comment: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerSubmission>,
}

/// Confirmation returned after a review is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewConfirmation {
    pub id: ReviewId,
    pub catalog_item_id: CatalogItemId,
    pub overall_rating: Rating,
    pub comment: Option<String>,
    pub answers_count: usize,
    pub created_at: DateTime<Utc>,
}

pub struct ReviewService<'a> {
    repo: &'a dyn Repository,
    clock: &'a dyn Clock,
    ledger: InteractionLedger<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, clock: &'a dyn Clock) -> Self {
        Self {
            repo,
            clock,
            ledger: InteractionLedger::new(repo, clock),
        }
    }

    async fn customer(&self, customer_id: CustomerId) -> Result<Customer, ServiceError> {
        self.repo
            .customer(customer_id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))
    }

    async fn active_questions(
        &self,
        customer: &Customer,
    ) -> Result<Vec<ReviewQuestion>, ServiceError> {
        Ok(self
            .repo
            .review_questions(customer.store_id)
            .await?
            .into_iter()
            .filter(|q| q.active)
            .collect())
    }

    /// Active questions of the customer's store, in display order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown customer.
    pub async fn questions(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ReviewQuestion>, ServiceError> {
        let customer = self.customer(customer_id).await?;
        self.active_questions(&customer).await
    }

    /// Validate and store a review.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown customer.
    /// Returns `ServiceError::Validation` listing every problem with the
    /// submission; nothing is written in that case.
    #[instrument(skip(self, submission), fields(customer_id = %customer_id))]
    pub async fn submit(
        &self,
        customer_id: CustomerId,
        submission: ReviewSubmission,
    ) -> Result<ReviewConfirmation, ServiceError> {
        let customer = self.customer(customer_id).await?;
        let mut errors = Vec::new();

        let rating = match submission.overall_rating {
            None => {
                errors.push(FieldError::new("overall_rating", "can't be blank"));
                None
            }
            Some(raw) => Rating::new(raw)
                .map_err(|e| errors.push(FieldError::new("overall_rating", e.to_string())))
                .ok(),
        };

        let item = match submission.catalog_item_id {
            None => {
                errors.push(FieldError::new("catalog_item_id", "can't be blank"));
                None
            }
            Some(item_id) => {
                let item = self
                    .repo
                    .catalog_item(item_id)
                    .await?
                    .filter(|item| item.store_id == customer.store_id);
                if item.is_none() {
                    errors.push(FieldError::new(
                        "catalog_item_id",
                        "must be an item of this store",
                    ));
                }
                item
            }
        };

        let questions: HashMap<ReviewQuestionId, ReviewQuestion> = self
            .active_questions(&customer)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();
        let answers = validate_answers(&submission.answers, &questions, &mut errors);

        let (Some(rating), Some(item), true) = (rating, item, errors.is_empty()) else {
            return Err(ServiceError::Validation(errors));
        };

        let comment = submission
            .comment
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        let review = self
            .repo
            .insert_review(NewReview {
                customer_id,
                catalog_item_id: item.id,
                overall_rating: rating,
                comment,
                answers,
                created_at: self.clock.now(),
            })
            .await?;

        self.ledger
            .append(
                LedgerEntry::new(customer.store_id, InteractionType::ReviewSubmit)
                    .customer(Some(customer_id))
                    .item(item.id)
                    .at(review.created_at),
            )
            .await?;

        info!(review_id = %review.id, rating = rating.get(), "Review submitted");

        Ok(ReviewConfirmation {
            id: review.id,
            catalog_item_id: review.catalog_item_id,
            overall_rating: review.overall_rating,
            comment: review.comment,
            answers_count: review.answers.len(),
            created_at: review.created_at,
        })
    }
}

/// Check each answer against its question, collecting field errors.
fn validate_answers(
    submitted: &[AnswerSubmission],
    questions: &HashMap<ReviewQuestionId, ReviewQuestion>,
    errors: &mut Vec<FieldError>,
) -> Vec<ReviewAnswer> {
    let mut seen = HashSet::new();
    let mut answers = Vec::with_capacity(submitted.len());

    for (index, submission) in submitted.iter().enumerate() {
        let field = format!("answers[{index}]");

        let Some(question) = questions.get(&submission.question_id) else {
            errors.push(FieldError::new(field, "refers to an unknown question"));
            continue;
        };
        if !seen.insert(question.id) {
            errors.push(FieldError::new(field, "answers the same question twice"));
            continue;
        }
        let answer = match Answer::deserialize(&submission.answer) {
            Ok(answer) => answer,
            Err(e) => {
                errors.push(FieldError::new(field, e.to_string()));
                continue;
            }
        };
        if let Err(e) = answer.validate(question.question_type, &question.options) {
            errors.push(FieldError::new(field, e.to_string()));
            continue;
        }

        answers.push(ReviewAnswer {
            question_id: question.id,
            answer,
        });
    }

    answers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scanlane_core::{QuestionType, StoreId, UniquenessScope};

    use super::*;
    use crate::db::{InteractionRepository, MemoryRepository, Provisioning, ReviewRepository};
    use crate::models::NewReviewQuestion;
    use crate::services::identity::{IdentityService, RegistrationForm};
    use crate::services::testing;

    struct Fixture {
        repo: MemoryRepository,
        store: StoreId,
        customer: CustomerId,
        item: CatalogItemId,
        rating_q: ReviewQuestionId,
        choice_q: ReviewQuestionId,
        retired_q: ReviewQuestionId,
    }

    async fn question(
        repo: &MemoryRepository,
        store_id: StoreId,
        text: &str,
        question_type: QuestionType,
        order_index: i32,
        active: bool,
    ) -> ReviewQuestionId {
        let options = if question_type == QuestionType::MultipleChoice {
            vec!["Friend".to_string(), "Online".to_string()]
        } else {
            Vec::new()
        };
        repo.insert_review_question(NewReviewQuestion {
            store_id,
            question: text.to_string(),
            question_type,
            options,
            order_index,
            active,
        })
        .await
        .unwrap()
        .id
    }

    async fn fixture() -> Fixture {
        let repo = MemoryRepository::new();
        let clock = testing::clock();
        let store = testing::store(&repo).await;
        let item = testing::item(&repo, store.id, "Lamp", 100, None, 0).await;
        let customer = IdentityService::new(&repo, &clock, UniquenessScope::Global)
            .register(
                store.id,
                RegistrationForm {
                    name: "Ada".to_string(),
                    email: "a@x.com".to_string(),
                    phone: "5550100".to_string(),
                    address: None,
                },
            )
            .await
            .unwrap();
        let choice_q = question(&repo, store.id, "How did you hear of us?", QuestionType::MultipleChoice, 2, true).await;
        let rating_q = question(&repo, store.id, "Rate the service", QuestionType::Rating, 1, true).await;
        let retired_q = question(&repo, store.id, "Old question", QuestionType::Text, 0, false).await;

        Fixture {
            repo,
            store: store.id,
            customer: customer.id,
            item: item.id,
            rating_q,
            choice_q,
            retired_q,
        }
    }

    fn submission(item: CatalogItemId, rating: i64) -> ReviewSubmission {
        ReviewSubmission {
            catalog_item_id: Some(item),
            overall_rating: Some(rating),
            comment: Some("Lovely".to_string()),
            answers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_questions_are_active_and_ordered() {
        let f = fixture().await;
        let clock = testing::clock();
        let questions = ReviewService::new(&f.repo, &clock)
            .questions(f.customer)
            .await
            .unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![f.rating_q, f.choice_q]);
    }

    #[tokio::test]
    async fn test_submit_stores_review_answers_and_interaction() {
        let f = fixture().await;
        let clock = testing::clock();
        let reviews = ReviewService::new(&f.repo, &clock);

        let confirmation = reviews
            .submit(
                f.customer,
                ReviewSubmission {
                    answers: vec![
                        AnswerSubmission::typed(f.rating_q, &Answer::Rating(Rating::new(4).unwrap())),
                        AnswerSubmission::typed(f.choice_q, &Answer::Choice("Online".to_string())),
                    ],
                    ..submission(f.item, 5)
                },
            )
            .await
            .unwrap();
        assert_eq!(confirmation.answers_count, 2);
        assert_eq!(confirmation.overall_rating.get(), 5);

        let stored = f.repo.recent_reviews(f.store, 50).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].answers.len(), 2);
        assert_eq!(stored[0].comment.as_deref(), Some("Lovely"));

        let records = f.repo.recent_interactions(f.store, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].interaction_type, InteractionType::ReviewSubmit);
        assert_eq!(records[0].catalog_item_id, Some(f.item));
    }

    #[tokio::test]
    async fn test_out_of_range_rating_writes_nothing() {
        let f = fixture().await;
        let clock = testing::clock();
        let reviews = ReviewService::new(&f.repo, &clock);

        for rating in [0, 6] {
            let err = reviews
                .submit(f.customer, submission(f.item, rating))
                .await
                .unwrap_err();
            let ServiceError::Validation(fields) = err else {
                panic!("expected validation error, got {err:?}");
            };
            assert_eq!(fields[0].field, "overall_rating");
        }

        assert!(f.repo.recent_reviews(f.store, 50).await.unwrap().is_empty());
        assert_eq!(f.repo.count_interactions(f.store, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_answers_are_all_reported() {
        let f = fixture().await;
        let clock = testing::clock();
        let reviews = ReviewService::new(&f.repo, &clock);

        let err = reviews
            .submit(
                f.customer,
                ReviewSubmission {
                    answers: vec![
                        AnswerSubmission::typed(f.rating_q, &Answer::Text("great".to_string())),
                        AnswerSubmission::typed(f.choice_q, &Answer::Choice("Billboard".to_string())),
                        AnswerSubmission::typed(f.retired_q, &Answer::Text("hi".to_string())),
                        AnswerSubmission::typed(f.choice_q, &Answer::Choice("Friend".to_string())),
                    ],
                    ..submission(f.item, 4)
                },
            )
            .await
            .unwrap_err();

        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["answers[0]", "answers[1]", "answers[2]", "answers[3]"]);
        assert!(f.repo.recent_reviews(f.store, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_answer_is_reported_by_position() {
        let f = fixture().await;
        let clock = testing::clock();
        let reviews = ReviewService::new(&f.repo, &clock);

        let err = reviews
            .submit(
                f.customer,
                ReviewSubmission {
                    answers: vec![
                        AnswerSubmission::typed(f.choice_q, &Answer::Choice("Friend".to_string())),
                        AnswerSubmission {
                            question_id: f.rating_q,
                            answer: serde_json::json!({"type": "rating", "value": 9}),
                        },
                    ],
                    ..submission(f.item, 4)
                },
            )
            .await
            .unwrap_err();

        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "answers[1]");
        assert!(fields[0].message.contains("between 1 and 5"));
        assert!(f.repo.recent_reviews(f.store, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_and_foreign_item() {
        let f = fixture().await;
        let clock = testing::clock();
        let other = testing::store_named(&f.repo, "Other").await;
        let foreign = testing::item(&f.repo, other.id, "Vase", 10, None, 0).await;
        let reviews = ReviewService::new(&f.repo, &clock);

        let err = reviews
            .submit(
                f.customer,
                ReviewSubmission {
                    catalog_item_id: None,
                    overall_rating: None,
                    comment: None,
                    answers: Vec::new(),
                },
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields.len(), 2);

        let err = reviews
            .submit(f.customer, submission(foreign.id, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = reviews
            .submit(CustomerId::new(999), submission(f.item, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("customer")));
    }

    #[tokio::test]
    async fn test_review_without_purchase_is_accepted() {
        let f = fixture().await;
        let clock = testing::clock();
        let reviews = ReviewService::new(&f.repo, &clock);
        assert!(reviews.submit(f.customer, submission(f.item, 3)).await.is_ok());
    }
}
