//! Star ratings.

use serde::{Deserialize, Serialize};

/// Error for a rating outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i64,
}

/// A 1-5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] if `value` is outside 1..=5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// Mean of `ratings` rounded to two decimals, `0.0` when empty.
///
/// ```
/// use scanlane_core::{Rating, average_rating};
///
/// let ratings: Vec<Rating> = [5, 3, 4].into_iter().map(|r| Rating::new(r).unwrap()).collect();
/// assert!((average_rating(&ratings) - 4.0).abs() < f64::EPSILON);
/// assert!(average_rating(&[]).abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.get())).sum();
    #[allow(clippy::cast_precision_loss)] // review counts never approach 2^52
    let mean = f64::from(sum) / ratings.len() as f64;
    round2(mean)
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_bounds() {
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
        assert_eq!(Rating::new(0), Err(RatingError { got: 0 }));
        assert_eq!(Rating::new(6), Err(RatingError { got: 6 }));
        assert_eq!(Rating::new(-3), Err(RatingError { got: -3 }));
        assert_eq!(Rating::new(300), Err(RatingError { got: 300 }));
    }

    #[test]
    fn test_average() {
        assert!((average_rating(&ratings(&[5, 3, 4])) - 4.0).abs() < f64::EPSILON);
        assert!((average_rating(&ratings(&[5, 4])) - 4.5).abs() < f64::EPSILON);
        assert!(average_rating(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        // 13 / 3 = 4.333...
        assert!((average_rating(&ratings(&[5, 4, 4])) - 4.33).abs() < 1e-9);
        // 11 / 3 = 3.666...
        assert!((average_rating(&ratings(&[4, 4, 3])) - 3.67).abs() < 1e-9);
    }

    #[test]
    fn test_serde_validates() {
        assert_eq!(serde_json::to_string(&Rating::new(4).unwrap()).unwrap(), "4");
        assert!(serde_json::from_str::<Rating>("6").is_err());
        assert_eq!(serde_json::from_str::<Rating>("2").unwrap().get(), 2);
    }
}
