//! Interaction kinds recorded in the ledger.

use serde::{Deserialize, Serialize};

/// The kind of customer action an interaction record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "interaction_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// A product detail view.
    View,
    /// Catalog browsing, including purchases made while browsing.
    CatalogBrowse,
    /// A submitted review.
    ReviewSubmit,
}

impl InteractionType {
    /// All known kinds.
    pub const ALL: [Self; 3] = [Self::View, Self::CatalogBrowse, Self::ReviewSubmit];

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::CatalogBrowse => "catalog_browse",
            Self::ReviewSubmit => "review_submit",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InteractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("invalid interaction type: {s}"))
    }
}
