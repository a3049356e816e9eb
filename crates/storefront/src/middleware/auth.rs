//! Authentication extractors.
//!
//! Login itself belongs to the authentication service; these extractors only
//! read the identity it left in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a logged-in customer.
///
/// Rejects with `401` and a JSON error body when the session carries no
/// customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(customer): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", customer.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let customer: CurrentCustomer = session
            .get(session_keys::CURRENT_CUSTOMER)
            .await
            .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        set_sentry_user(&customer.id, Some(&customer.email));

        Ok(Self(customer))
    }
}

/// Store the current customer in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}
