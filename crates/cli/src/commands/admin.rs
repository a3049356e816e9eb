//! Admin capability management.
//!
//! Customer accounts are created by the authentication service; this only
//! flips `is_admin` on an existing account.
//!
//! # Usage
//!
//! ```bash
//! proshop-cli admin grant -e admin@example.com
//! proshop-cli admin revoke -e admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No customer account with this email.
    #[error("No customer with email: {0}")]
    CustomerNotFound(String),
}

fn validate_email(email: &str) -> Result<(), AdminError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AdminError::InvalidEmail(email.to_owned())),
    }
}

/// Set or clear the admin capability for the customer with `email`.
///
/// Returns the customer's id.
///
/// # Errors
///
/// Returns an error if the email is malformed, no customer has it, or the
/// database is unreachable.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<i32, AdminError> {
    validate_email(email)?;

    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let customer_id: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE storefront.customer
        SET is_admin = $2, updated_at = NOW()
        WHERE LOWER(email) = LOWER($1)
        RETURNING id
        ",
    )
    .bind(email)
    .bind(is_admin)
    .fetch_optional(&pool)
    .await?;

    let customer_id = customer_id.ok_or_else(|| AdminError::CustomerNotFound(email.to_owned()))?;

    if is_admin {
        tracing::info!(customer_id, email, "Admin capability granted");
    } else {
        tracing::info!(customer_id, email, "Admin capability revoked");
    }

    Ok(customer_id)
}
