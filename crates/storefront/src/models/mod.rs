//! Domain models for the storefront.
//!
//! These types represent validated domain objects, separate from database row
//! types. Catalog items, stores and review questions are owned by catalog
//! management and are only read here.

pub mod admin;
pub mod catalog;
pub mod customer;
pub mod interaction;
pub mod purchase;
pub mod review;
pub mod session;
pub mod store;

pub use admin::{Admin, AuthorizedAdmin, NewAdmin};
pub use catalog::{CatalogItem, NewCatalogItem, NewReviewQuestion, ReviewQuestion};
pub use customer::{Customer, NewCustomer};
pub use interaction::{InteractionRecord, Metadata, NewInteraction};
pub use purchase::{NewPurchase, Purchase};
pub use review::{NewReview, Review, ReviewAnswer, ReviewStats};
pub use session::{SessionCustomer, keys as session_keys};
pub use store::{NewStore, Store};
