//! Review question kinds and typed answers.
//!
//! Each store defines its own review questions. An answer is a tagged value
//! that must agree with the declared type of the question it answers:
//!
//! | Question type     | Answer                          |
//! |-------------------|---------------------------------|
//! | `rating`          | `Rating(1..=5)`                 |
//! | `text`            | `Text(non-empty)`               |
//! | `boolean`         | `Boolean(bool)`                 |
//! | `multiple_choice` | `Choice(one of the options)`    |

use core::fmt;

use serde::{Deserialize, Serialize};

use super::Rating;

/// Declared type of a review question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "question_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Rating,
    Text,
    Boolean,
    MultipleChoice,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rating => write!(f, "rating"),
            Self::Text => write!(f, "text"),
            Self::Boolean => write!(f, "boolean"),
            Self::MultipleChoice => write!(f, "multiple_choice"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rating" => Ok(Self::Rating),
            "text" => Ok(Self::Text),
            "boolean" => Ok(Self::Boolean),
            "multiple_choice" => Ok(Self::MultipleChoice),
            _ => Err(format!("invalid question type: {s}")),
        }
    }
}

/// Why an answer does not fit its question.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("expected a {expected} answer")]
    TypeMismatch { expected: QuestionType },
    #[error("answer cannot be empty")]
    Empty,
    #[error("'{0}' is not one of the question's options")]
    UnknownChoice(String),
}

/// A typed answer to one review question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Rating(Rating),
    Text(String),
    Boolean(bool),
    Choice(String),
}

impl Answer {
    /// Check this answer against a question's declared type and options.
    ///
    /// # Errors
    ///
    /// Returns [`AnswerError`] when the variant does not match the question
    /// type, a text answer is blank, or a choice is not among `options`.
    pub fn validate(&self, question_type: QuestionType, options: &[String]) -> Result<(), AnswerError> {
        match (question_type, self) {
            (QuestionType::Rating, Self::Rating(_)) | (QuestionType::Boolean, Self::Boolean(_)) => {
                Ok(())
            }
            (QuestionType::Text, Self::Text(text)) => {
                if text.trim().is_empty() {
                    Err(AnswerError::Empty)
                } else {
                    Ok(())
                }
            }
            (QuestionType::MultipleChoice, Self::Choice(choice)) => {
                if options.iter().any(|option| option == choice) {
                    Ok(())
                } else {
                    Err(AnswerError::UnknownChoice(choice.clone()))
                }
            }
            (expected, _) => Err(AnswerError::TypeMismatch { expected }),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rating(rating) => write!(f, "{}", rating.get()),
            Self::Text(text) | Self::Choice(text) => f.write_str(text),
            Self::Boolean(true) => f.write_str("yes"),
            Self::Boolean(false) => f.write_str("no"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Email".to_string(), "Friend".to_string()]
    }

    #[test]
    fn test_matching_answers_validate() {
        let rating = Answer::Rating(Rating::new(4).unwrap());
        assert!(rating.validate(QuestionType::Rating, &[]).is_ok());
        assert!(Answer::Boolean(false).validate(QuestionType::Boolean, &[]).is_ok());
        assert!(
            Answer::Text("Great".into())
                .validate(QuestionType::Text, &[])
                .is_ok()
        );
        assert!(
            Answer::Choice("Friend".into())
                .validate(QuestionType::MultipleChoice, &options())
                .is_ok()
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            Answer::Text("5".into()).validate(QuestionType::Rating, &[]),
            Err(AnswerError::TypeMismatch {
                expected: QuestionType::Rating
            })
        );
        assert_eq!(
            Answer::Choice("yes".into()).validate(QuestionType::Boolean, &[]),
            Err(AnswerError::TypeMismatch {
                expected: QuestionType::Boolean
            })
        );
    }

    #[test]
    fn test_blank_text_and_unknown_choice() {
        assert_eq!(
            Answer::Text("  ".into()).validate(QuestionType::Text, &[]),
            Err(AnswerError::Empty)
        );
        assert_eq!(
            Answer::Choice("Billboard".into()).validate(QuestionType::MultipleChoice, &options()),
            Err(AnswerError::UnknownChoice("Billboard".into()))
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::json!({"type": "rating", "value": 5});
        let answer: Answer = serde_json::from_value(json).unwrap();
        assert_eq!(answer, Answer::Rating(Rating::new(5).unwrap()));

        let bad = serde_json::json!({"type": "rating", "value": 9});
        assert!(serde_json::from_value::<Answer>(bad).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Answer::Boolean(true).to_string(), "yes");
        assert_eq!(Answer::Rating(Rating::new(3).unwrap()).to_string(), "3");
        assert_eq!(Answer::Choice("Email".into()).to_string(), "Email");
    }
}
