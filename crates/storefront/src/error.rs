//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Every error leaves as a JSON
//! [`ErrorBody`]. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use proshop_core::{ErrorBody, ErrorKind, OrderError};

use crate::db::RepositoryError;
use crate::services::ServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A lifecycle rule rejected the request.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Customer is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::EmptyOrder | OrderError::InvalidLineItem { .. } => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::AlreadyPaid(_) | OrderError::NotPaid(_) => StatusCode::CONFLICT,
                OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// JSON body for this error.
    ///
    /// Internal details never reach the client.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            Self::Order(err) => return err.to_body(),
            Self::Database(_) | Self::Internal(_) => {
                (ErrorKind::Internal, "Internal server error".to_string())
            }
            Self::Unauthorized(msg) => (ErrorKind::Unauthorized, msg.clone()),
            Self::BadRequest(msg) => (ErrorKind::BadRequest, msg.clone()),
        };

        ErrorBody {
            error,
            message,
            order_id: None,
            product: None,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Order(err) => Self::Order(err),
            ServiceError::Repository(err) => Self::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a customer ID.
///
/// Called by the auth extractor so errors are associated with customers.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for a customer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use proshop_core::OrderId;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::from(OrderError::EmptyOrder);
        assert_eq!(err.to_string(), "order has no items");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(OrderError::EmptyOrder.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(OrderError::NotFound(OrderId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrderError::AlreadyPaid(OrderId::new(1)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::NotPaid(OrderId::new(1)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::Forbidden("admin only".into()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(OrderError::UpstreamUnavailable("down".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Unauthorized("login".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let body = AppError::Database(RepositoryError::DataCorruption("bad row 9".into())).body();
        assert_eq!(body.error, ErrorKind::Internal);
        assert!(!body.message.contains("bad row"));
    }

    #[tokio::test]
    async fn test_response_body_is_json_error() {
        let response = AppError::from(OrderError::NotPaid(OrderId::new(5))).into_response();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("json body");

        assert_eq!(body.error, ErrorKind::NotPaid);
        assert_eq!(body.order_id, Some(OrderId::new(5)));
    }
}
