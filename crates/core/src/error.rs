//! Order lifecycle errors.
//!
//! [`OrderError`] is the taxonomy every layer speaks. The storefront maps it
//! to an HTTP status plus an [`ErrorBody`]; the client decodes the body back
//! into an `OrderError` so callers can match on the same variants on both
//! sides of the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OrderId, ProductId};

/// Errors raised by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The cart had no items at checkout.
    #[error("order has no items")]
    EmptyOrder,

    /// A submitted line item is out of range.
    #[error("invalid line item for product {product}: {reason}")]
    InvalidLineItem { product: ProductId, reason: String },

    /// Unknown order id.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The order was already paid with a different receipt.
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// Delivery attempted before payment.
    #[error("order {0} has not been paid")]
    NotPaid(OrderId),

    /// The caller lacks the owner or admin capability the operation needs.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The payment gateway script or its configuration could not be loaded.
    #[error("payment gateway unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl OrderError {
    /// Wire kind for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyOrder => ErrorKind::EmptyOrder,
            Self::InvalidLineItem { .. } => ErrorKind::InvalidLineItem,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyPaid(_) => ErrorKind::AlreadyPaid,
            Self::NotPaid(_) => ErrorKind::NotPaid,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Only upstream failures may be retried; everything else is terminal
    /// for the request that produced it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// Build the wire body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let (order_id, product) = match self {
            Self::NotFound(id) | Self::AlreadyPaid(id) | Self::NotPaid(id) => (Some(*id), None),
            Self::InvalidLineItem { product, .. } => (None, Some(*product)),
            _ => (None, None),
        };
        let message = match self {
            Self::InvalidLineItem { reason, .. }
            | Self::Forbidden(reason)
            | Self::UpstreamUnavailable(reason) => reason.clone(),
            _ => self.to_string(),
        };

        ErrorBody {
            error: self.kind(),
            message,
            order_id,
            product,
        }
    }
}

/// Machine-readable error kind carried in [`ErrorBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyOrder,
    InvalidLineItem,
    NotFound,
    AlreadyPaid,
    NotPaid,
    Forbidden,
    UpstreamUnavailable,
    Unauthorized,
    BadRequest,
    Internal,
}

/// JSON error body returned by the storefront API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductId>,
}

impl ErrorBody {
    /// Recover the lifecycle error this body describes.
    ///
    /// Returns `None` for kinds outside the lifecycle taxonomy
    /// (`unauthorized`, `bad_request`, `internal`) or when a body lacks the
    /// id its kind needs.
    #[must_use]
    pub fn into_order_error(self) -> Option<OrderError> {
        match self.error {
            ErrorKind::EmptyOrder => Some(OrderError::EmptyOrder),
            ErrorKind::InvalidLineItem => Some(OrderError::InvalidLineItem {
                product: self.product?,
                reason: self.message,
            }),
            ErrorKind::NotFound => self.order_id.map(OrderError::NotFound),
            ErrorKind::AlreadyPaid => self.order_id.map(OrderError::AlreadyPaid),
            ErrorKind::NotPaid => self.order_id.map(OrderError::NotPaid),
            ErrorKind::Forbidden => Some(OrderError::Forbidden(self.message)),
            ErrorKind::UpstreamUnavailable => Some(OrderError::UpstreamUnavailable(self.message)),
            ErrorKind::Unauthorized | ErrorKind::BadRequest | ErrorKind::Internal => None,
        }
    }
}
