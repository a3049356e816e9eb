//! Error types for the client session.

use proshop_core::{ErrorBody, ErrorKind, OrderError, OrderId};
use thiserror::Error;

/// Errors surfaced by client lifecycle operations.
///
/// Lifecycle failures decoded from the storefront's error body come back as
/// [`ClientError::Order`], so callers match the same variants the server
/// raised. `Clone` so request states can hold a copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The storefront rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// No session, or the session expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The storefront answered with an error outside the lifecycle taxonomy.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error kind from the body, when the body could be read.
        kind: Option<ErrorKind>,
        /// Error message.
        message: String,
    },

    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Transport(String),

    /// Failed to parse a response or build a request URL.
    #[error("parse error: {0}")]
    Decode(String),

    /// Pay was requested before the widget was prepared for this order.
    #[error("payment widget is not ready for order {0}")]
    PaymentNotReady(OrderId),

    /// The payer closed the widget without approving.
    #[error("payment was cancelled")]
    PaymentCancelled,

    /// The operation needs an order in view.
    #[error("no order is being viewed")]
    NoOrderInView,
}

impl ClientError {
    /// Map a storefront error body to a client error.
    #[must_use]
    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        if body.error == ErrorKind::Unauthorized {
            return Self::Unauthorized(body.message);
        }

        let kind = body.error;
        let message = body.message.clone();
        body.into_order_error().map_or(
            Self::Api {
                status,
                kind: Some(kind),
                message,
            },
            Self::Order,
        )
    }

    /// The lifecycle error behind this failure, if any.
    #[must_use]
    pub const fn order_error(&self) -> Option<&OrderError> {
        match self {
            Self::Order(err) => Some(err),
            _ => None,
        }
    }

    /// Transport failures and upstream outages may be retried. Validation and
    /// state errors are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Order(err) => err.is_retryable(),
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Decode(format!("invalid URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proshop_core::ProductId;

    fn body(error: ErrorKind, message: &str) -> ErrorBody {
        ErrorBody {
            error,
            message: message.to_string(),
            order_id: None,
            product: None,
        }
    }

    #[test]
    fn test_lifecycle_body_decodes_to_order_error() {
        let mut not_paid = body(ErrorKind::NotPaid, "order 7 has not been paid");
        not_paid.order_id = Some(OrderId::new(7));

        let err = ClientError::from_body(409, not_paid);
        assert_eq!(err, ClientError::Order(OrderError::NotPaid(OrderId::new(7))));
        assert_eq!(err.to_string(), "order 7 has not been paid");
    }

    #[test]
    fn test_invalid_line_item_keeps_product() {
        let mut invalid = body(ErrorKind::InvalidLineItem, "quantity must be at least 1");
        invalid.product = Some(ProductId::new(3));

        let err = ClientError::from_body(400, invalid);
        assert_eq!(
            err.order_error(),
            Some(&OrderError::InvalidLineItem {
                product: ProductId::new(3),
                reason: "quantity must be at least 1".to_string(),
            })
        );
    }

    #[test]
    fn test_unauthorized_body() {
        let err = ClientError::from_body(401, body(ErrorKind::Unauthorized, "login required"));
        assert_eq!(err, ClientError::Unauthorized("login required".to_string()));
    }

    #[test]
    fn test_other_kinds_become_api_errors() {
        let err = ClientError::from_body(500, body(ErrorKind::Internal, "Internal server error"));
        assert_eq!(
            err,
            ClientError::Api {
                status: 500,
                kind: Some(ErrorKind::Internal),
                message: "Internal server error".to_string(),
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Transport("connection reset".into()).is_retryable());
        assert!(ClientError::Order(OrderError::UpstreamUnavailable("down".into())).is_retryable());
        assert!(!ClientError::Order(OrderError::EmptyOrder).is_retryable());
        assert!(!ClientError::PaymentCancelled.is_retryable());
    }
}
