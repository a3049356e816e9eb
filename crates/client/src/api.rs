//! Storefront API transport.
//!
//! [`StorefrontApi`] is the seam between the lifecycle controller and the
//! trusted service. [`HttpStorefrontApi`] speaks the REST API over reqwest;
//! tests plug in an in-process implementation instead.

use std::future::Future;
use std::sync::Arc;

use proshop_core::{
    ErrorBody, Order, OrderDraft, OrderId, OrderSummary, PaymentConfig, PaymentReceipt,
};
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Order lifecycle operations offered by the storefront.
///
/// Every call runs as the session the implementation was built with.
pub trait StorefrontApi: Send + Sync {
    /// Place an order from a cart snapshot.
    fn create_order(
        &self,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    /// Order details with owner info.
    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<OrderSummary, ClientError>> + Send;

    /// Confirm payment with the gateway receipt.
    fn pay_order(
        &self,
        id: OrderId,
        receipt: &PaymentReceipt,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    /// Mark an order delivered (admin).
    fn deliver_order(&self, id: OrderId)
    -> impl Future<Output = Result<Order, ClientError>> + Send;

    /// Every order (admin).
    fn list_orders(&self) -> impl Future<Output = Result<Vec<OrderSummary>, ClientError>> + Send;

    /// The session's own orders.
    fn list_my_orders(
        &self,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, ClientError>> + Send;

    /// Gateway public client id.
    fn payment_config(&self) -> impl Future<Output = Result<PaymentConfig, ClientError>> + Send;
}

/// REST client for the storefront API.
#[derive(Clone)]
pub struct HttpStorefrontApi {
    inner: Arc<HttpStorefrontApiInner>,
}

struct HttpStorefrontApiInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStorefrontApi {
    /// Build a client that sends the configured session cookie with every
    /// request.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Decode` if the cookie is not a valid header
    /// value, or `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.session_cookie {
            let mut value = HeaderValue::from_str(cookie.expose_secret())
                .map_err(|e| ClientError::Decode(format!("invalid session cookie: {e}")))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpStorefrontApiInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path)?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle a response, decoding the error body on failure.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClientError::Decode(format!("Failed to parse response: {e}")))
        } else {
            Err(self.handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClientError {
        match response.text().await {
            Ok(body) => match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => ClientError::from_body(status.as_u16(), error),
                Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => {
                    ClientError::Unauthorized(body)
                }
                Err(_) => ClientError::Api {
                    status: status.as_u16(),
                    kind: None,
                    message: body,
                },
            },
            Err(e) => e.into(),
        }
    }
}

impl StorefrontApi for HttpStorefrontApi {
    #[instrument(skip_all, fields(items = draft.items.len()))]
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, ClientError> {
        let url = self.url("api/orders")?;
        self.send(self.inner.client.post(url).json(draft)).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: OrderId) -> Result<OrderSummary, ClientError> {
        let url = self.url(&format!("api/orders/{id}"))?;
        self.send(self.inner.client.get(url)).await
    }

    #[instrument(skip(self, receipt), fields(order_id = %id))]
    async fn pay_order(&self, id: OrderId, receipt: &PaymentReceipt) -> Result<Order, ClientError> {
        let url = self.url(&format!("api/orders/{id}/pay"))?;
        self.send(self.inner.client.put(url).json(receipt)).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn deliver_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let url = self.url(&format!("api/orders/{id}/deliver"))?;
        self.send(self.inner.client.put(url)).await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        let url = self.url("api/orders")?;
        self.send(self.inner.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn list_my_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        let url = self.url("api/orders/mine")?;
        self.send(self.inner.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn payment_config(&self) -> Result<PaymentConfig, ClientError> {
        let url = self.url("api/config/payment")?;
        self.send(self.inner.client.get(url)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpStorefrontApi {
        HttpStorefrontApi::new(&ClientConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn test_urls_join_under_base_path() {
        let api = api("https://shop.example.com/store");
        assert_eq!(
            api.url("api/orders/7/pay").unwrap().as_str(),
            "https://shop.example.com/store/api/orders/7/pay"
        );
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        let config = ClientConfig::new(Url::parse("http://localhost:3000").unwrap())
            .with_session_cookie("proshop_session=\nabc");
        assert!(matches!(
            HttpStorefrontApi::new(&config),
            Err(ClientError::Decode(_))
        ));
    }
}
