//! Integration test harness for Proshop.
//!
//! [`Shop`] runs the storefront's `OrderService` in process over the
//! in-memory repository and hands out client sessions wired to it through
//! [`InProcessApi`]. Errors cross the same `ErrorBody` mapping the HTTP API
//! uses, so client code sees exactly what it would see over the wire.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process scenarios
//! cargo test -p proshop-integration-tests
//!
//! # HTTP tests against a running storefront
//! PROSHOP_API_URL=http://localhost:3000 PROSHOP_SESSION_COOKIE=proshop_session=... \
//!     cargo test -p proshop-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proshop_client::{
    ClientError, LifecycleController, PaymentGateway, PaymentScript, PaymentSdk, PaymentWidget,
    SessionUser, StorefrontApi,
};
use proshop_core::{
    LineItem, Order, OrderDraft, OrderId, OrderSummary, PaymentConfig, PaymentReceipt,
    ProductId, ShippingPolicy, UserId,
};
use proshop_storefront::db::InMemoryOrderRepository;
use proshop_storefront::error::AppError;
use proshop_storefront::models::CurrentCustomer;
use proshop_storefront::services::{OrderService, ServiceError};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

pub type Session = LifecycleController<InProcessApi, TestSdk>;

/// Translate a service failure the way the HTTP layer does.
fn to_client_error(err: ServiceError) -> ClientError {
    let err = AppError::from(err);
    ClientError::from_body(err.status().as_u16(), err.body())
}

/// `StorefrontApi` calling `OrderService` directly as one customer.
pub struct InProcessApi {
    service: Arc<OrderService<InMemoryOrderRepository>>,
    customer: CurrentCustomer,
    read_delays: Arc<Mutex<HashMap<OrderId, Duration>>>,
    pay_calls: AtomicU32,
}

impl InProcessApi {
    /// Number of payment confirmations sent by this session.
    pub fn pay_calls(&self) -> u32 {
        self.pay_calls.load(Ordering::SeqCst)
    }

    fn read_delay(&self, id: OrderId) -> Option<Duration> {
        self.read_delays.lock().unwrap().get(&id).copied()
    }
}

impl StorefrontApi for InProcessApi {
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, ClientError> {
        self.service
            .create_order(&self.customer, draft.clone())
            .await
            .map_err(to_client_error)
    }

    async fn get_order(&self, id: OrderId) -> Result<OrderSummary, ClientError> {
        if let Some(delay) = self.read_delay(id) {
            tokio::time::sleep(delay).await;
        }
        self.service
            .get_order(&self.customer, id)
            .await
            .map_err(to_client_error)
    }

    async fn pay_order(&self, id: OrderId, receipt: &PaymentReceipt) -> Result<Order, ClientError> {
        self.pay_calls.fetch_add(1, Ordering::SeqCst);
        self.service
            .pay_order(&self.customer, id, receipt.clone())
            .await
            .map_err(to_client_error)
    }

    async fn deliver_order(&self, id: OrderId) -> Result<Order, ClientError> {
        self.service
            .deliver_order(&self.customer, id)
            .await
            .map_err(to_client_error)
    }

    async fn list_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        self.service
            .list_orders(&self.customer)
            .await
            .map_err(to_client_error)
    }

    async fn list_my_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        self.service
            .list_my_orders(&self.customer)
            .await
            .map_err(to_client_error)
    }

    async fn payment_config(&self) -> Result<PaymentConfig, ClientError> {
        Ok(self.service.payment_config(&self.customer))
    }
}

/// Payment SDK stand-in. Loads instantly and approves every widget with a
/// receipt named after the order, unless told to cancel.
#[derive(Default)]
pub struct TestSdk {
    loads: AtomicU32,
    cancel: AtomicBool,
    approval_delay: Mutex<Option<Duration>>,
}

impl TestSdk {
    pub fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Make the payer close the widget instead of approving.
    pub fn cancel_next(&self, cancel: bool) {
        self.cancel.store(cancel, Ordering::SeqCst);
    }

    /// Keep the widget open for `delay` before approving.
    pub fn delay_approval(&self, delay: Option<Duration>) {
        *self.approval_delay.lock().unwrap() = delay;
    }
}

impl PaymentSdk for TestSdk {
    async fn load_script(&self, _client_id: &str) -> Result<(), String> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render(
        &self,
        widget: &PaymentWidget,
        on_approve: oneshot::Sender<PaymentReceipt>,
    ) -> Result<(), String> {
        if self.cancel.load(Ordering::SeqCst) {
            return Ok(());
        }

        let approved = receipt(&format!("PAY-{}", widget.order_id));
        match *self.approval_delay.lock().unwrap() {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = on_approve.send(approved);
                });
            }
            None => {
                let _ = on_approve.send(approved);
            }
        }
        Ok(())
    }
}

/// An in-process storefront with registered customers.
pub struct Shop {
    service: Arc<OrderService<InMemoryOrderRepository>>,
    script: Arc<PaymentScript<TestSdk>>,
    read_delays: Arc<Mutex<HashMap<OrderId, Duration>>>,
}

impl Default for Shop {
    fn default() -> Self {
        Self::new()
    }
}

impl Shop {
    pub fn new() -> Self {
        let repo = InMemoryOrderRepository::new();
        let service = OrderService::new(
            repo,
            ShippingPolicy::default(),
            PaymentConfig {
                client_id: "sb-client".to_string(),
            },
        );
        Self {
            service: Arc::new(service),
            script: Arc::new(PaymentScript::new(TestSdk::default(), 3)),
            read_delays: Arc::default(),
        }
    }

    pub fn service(&self) -> &OrderService<InMemoryOrderRepository> {
        &self.service
    }

    pub fn sdk(&self) -> &TestSdk {
        self.script.sdk()
    }

    /// Register a customer and open a client session for them.
    pub fn session(&self, id: i32, name: &str, is_admin: bool) -> Session {
        let email = format!("{}@example.com", name.to_lowercase());
        self.service
            .repository()
            .add_customer(UserId::new(id), name, email.clone());

        let customer = CurrentCustomer {
            id: UserId::new(id),
            name: name.to_string(),
            email,
            is_admin,
        };
        let api = InProcessApi {
            service: Arc::clone(&self.service),
            customer,
            read_delays: Arc::clone(&self.read_delays),
            pay_calls: AtomicU32::new(0),
        };
        let user = SessionUser {
            id: UserId::new(id),
            name: name.to_string(),
            is_admin,
        };

        LifecycleController::new(
            api,
            PaymentGateway::new(Arc::clone(&self.script)),
            user,
            ShippingPolicy::default(),
        )
    }

    /// Delay detail reads of `id` for every session.
    pub fn slow_reads(&self, id: OrderId, delay: Duration) {
        self.read_delays.lock().unwrap().insert(id, delay);
    }
}

pub fn item(product: i32, unit_price: Decimal, quantity: u32) -> LineItem {
    LineItem {
        product: ProductId::new(product),
        name: format!("Product {product}"),
        image: format!("/images/{product}.jpg"),
        unit_price,
        quantity,
    }
}

pub fn receipt(id: &str) -> PaymentReceipt {
    PaymentReceipt {
        id: id.to_string(),
        status: "COMPLETED".to_string(),
        update_time: "2026-10-17T10:00:00Z".to_string(),
        email_address: Some("payer@example.com".to_string()),
    }
}

/// Fill the session's cart with `items` and place the order.
pub async fn place_order(session: &Session, items: Vec<LineItem>) -> Order {
    session.update_cart(|cart| {
        for line in items {
            cart.add_item(line, 99);
        }
        cart.set_payment_method("PayPal");
    });
    session.place_order().await.unwrap()
}
