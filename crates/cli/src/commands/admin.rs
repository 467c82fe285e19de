//! Admin management commands.
//!
//! Admins authenticate to the analytics API with bearer tokens. Only the
//! SHA-256 hash of a token is stored, so the token is shown once, here.
//!
//! # Usage
//!
//! ```bash
//! scanlane-cli admin create -e admin@example.com -n "Admin Name"
//! scanlane-cli admin token -e admin@example.com
//! ```

use chrono::Utc;
use thiserror::Error;

use scanlane_core::{AdminId, Email};
use scanlane_storefront::db::{PgRepository, Provisioning, RepositoryError};
use scanlane_storefront::middleware::{generate_token, hash_token};
use scanlane_storefront::models::NewAdmin;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Admin already exists.
    #[error("Admin already exists with email: {0}")]
    AdminExists(String),

    /// No such admin.
    #[error("No admin with email: {0}")]
    UnknownAdmin(String),
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email} ({e})")))
}

async fn issue(repo: &PgRepository, admin_id: AdminId) -> Result<String, AdminError> {
    let token = generate_token();
    repo.insert_admin_token(admin_id, &hash_token(&token), Utc::now())
        .await?;
    Ok(token)
}

/// Create a new admin and print a bearer token for them.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid or taken, or the database fails.
pub async fn create(email: &str, name: &str) -> Result<AdminId, AdminError> {
    let email = parse_email(email)?;
    let repo = PgRepository::new(connect().await?);

    tracing::info!("Creating admin: {}", email);
    let admin = repo
        .insert_admin(NewAdmin {
            name: name.to_owned(),
            email: email.clone(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::AdminExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    let token = issue(&repo, admin.id).await?;

    tracing::info!("Admin created successfully! ID: {}, Email: {}", admin.id, email);
    tracing::info!("Bearer token (shown once): {token}");
    Ok(admin.id)
}

/// Issue an additional bearer token for an existing admin.
///
/// # Errors
///
/// Returns `AdminError` if no admin has this email or the database fails.
pub async fn issue_token(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    let admin_id = sqlx::query_scalar::<_, i32>("SELECT id FROM admin WHERE lower(email) = $1")
        .bind(email.normalized())
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AdminError::UnknownAdmin(email.to_string()))?;

    let token = issue(&PgRepository::new(pool), AdminId::new(admin_id)).await?;
    tracing::info!("Bearer token for {} (shown once): {token}", email);
    Ok(())
}
