//! Catalog items and review questions (read-only for the engagement core).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use scanlane_core::{CatalogItemId, QuestionType, ReviewQuestionId, StoreId};

/// A product or service offered by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    #[serde(skip)]
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub category: Option<String>,
    #[serde(skip)]
    pub active: bool,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// What a purchase pays when no price is given: the offer price if any,
    /// otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.offer_price.unwrap_or(self.price)
    }

    #[must_use]
    pub const fn has_offer(&self) -> bool {
        self.offer_price.is_some()
    }
}

/// Input for provisioning a catalog item.
#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A question a store asks alongside the overall rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewQuestion {
    pub id: ReviewQuestionId,
    #[serde(skip)]
    pub store_id: StoreId,
    pub question: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    #[serde(skip)]
    pub order_index: i32,
    #[serde(skip)]
    pub active: bool,
}

/// Input for provisioning a review question.
#[derive(Debug, Clone)]
pub struct NewReviewQuestion {
    pub store_id: StoreId,
    pub question: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub order_index: i32,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, offer: Option<i64>) -> CatalogItem {
        CatalogItem {
            id: CatalogItemId::new(1),
            store_id: StoreId::new(1),
            name: "Lamp".to_string(),
            description: None,
            price: Decimal::from(price),
            offer_price: offer.map(Decimal::from),
            category: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_price_prefers_offer() {
        assert_eq!(item(100, Some(80)).effective_price(), Decimal::from(80));
        assert_eq!(item(100, None).effective_price(), Decimal::from(100));
        assert!(item(100, Some(80)).has_offer());
    }
}
