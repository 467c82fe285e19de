//! Seed the database with stores, catalogs and review questions.
//!
//! Reads a YAML file in the same shape as the bundled
//! `crates/storefront/seed/demo.yaml`, validates it before connecting, then
//! inserts it. Seeding is not idempotent: run it once against a fresh
//! database.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use scanlane_storefront::clock::SystemClock;
use scanlane_storefront::db::PgRepository;
use scanlane_storefront::seed::{SeedData, SeedError};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedCommandError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Seed from `file`, or from the bundled demo data when `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an insert fails.
pub async fn run(file: Option<&str>) -> Result<(), SeedCommandError> {
    let data = match file {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(SeedCommandError::FileNotFound(file_path.to_owned()));
            }
            info!(path = %file_path, "Loading seed data from file");
            SeedData::from_yaml(&tokio::fs::read_to_string(path).await?)?
        }
        None => {
            info!("Loading bundled demo data");
            SeedData::demo()?
        }
    };

    info!(stores = data.stores.len(), "Parsed seed data");

    let pool = connect().await?;
    let repo = PgRepository::new(pool);
    let report = data.apply(&repo, &SystemClock).await?;

    for (store_id, name, code) in &report.stores {
        info!(%store_id, %name, qr_code = %code, "Store ready");
    }
    info!(
        admin_id = %report.admin_id,
        "Seeding complete. Issue an admin token with: scanlane-cli admin token -e {}",
        data.admin.email
    );

    Ok(())
}
