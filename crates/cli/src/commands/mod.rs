//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod quote;

use secrecy::SecretString;

/// Storefront database URL from `STOREFRONT_DATABASE_URL`, falling back to
/// `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
