//! Client-side lifecycle controller.
//!
//! One [`LifecycleController`] drives a client session through
//! create → pay → deliver. It owns the cart and one [`RequestState`] per
//! operation. Session state sits behind a `std::sync::Mutex` that is never
//! held across an await, so operations may overlap.
//!
//! Every order-scoped request captures a [`ViewToken`]. Viewing another order
//! or calling [`LifecycleController::leave`] bumps the generation, and
//! results carrying an older token are dropped.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use proshop_core::{
    Cart, Order, OrderError, OrderId, OrderSummary, PaymentConfig, PaymentReceipt,
    PriceBreakdown, RequestState, ShippingPolicy, UserId,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::api::StorefrontApi;
use crate::error::ClientError;
use crate::payment::{PaymentGateway, PaymentSdk, PaymentWidget};

/// Identity of the logged-in customer, as issued by the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub is_admin: bool,
}

/// Identifies the order view a request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewToken {
    pub order_id: OrderId,
    pub generation: u64,
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub cart: Cart,
    pub viewing: Option<OrderId>,
    pub create: RequestState<Order, ClientError>,
    pub details: RequestState<OrderSummary, ClientError>,
    pub payment: RequestState<PaymentWidget, ClientError>,
    pub pay: RequestState<Order, ClientError>,
    pub deliver: RequestState<Order, ClientError>,
}

#[derive(Default)]
struct SessionState {
    generation: u64,
    view: Option<ViewToken>,
    cart: Cart,
    create: RequestState<Order, ClientError>,
    details: RequestState<OrderSummary, ClientError>,
    payment: RequestState<PaymentWidget, ClientError>,
    pay: RequestState<Order, ClientError>,
    deliver: RequestState<Order, ClientError>,
}

impl SessionState {
    fn is_current(&self, token: ViewToken) -> bool {
        self.view == Some(token)
    }

    fn clear_view(&mut self) {
        self.details.reset();
        self.payment.reset();
        self.pay.reset();
        self.deliver.reset();
    }

    /// Replace the order in the details view after a transition.
    fn apply(&mut self, order: &Order) {
        if let RequestState::Succeeded(summary) = &mut self.details {
            summary.order = order.clone();
        }
    }
}

/// Orchestrates the order lifecycle for one client session.
pub struct LifecycleController<A, S> {
    api: A,
    gateway: PaymentGateway<S>,
    user: SessionUser,
    shipping: ShippingPolicy,
    payment_config: OnceCell<PaymentConfig>,
    config_failures: AtomicU32,
    state: Mutex<SessionState>,
}

impl<A: StorefrontApi, S: PaymentSdk> LifecycleController<A, S> {
    #[must_use]
    pub fn new(
        api: A,
        gateway: PaymentGateway<S>,
        user: SessionUser,
        shipping: ShippingPolicy,
    ) -> Self {
        Self {
            api,
            gateway,
            user,
            shipping,
            payment_config: OnceCell::new(),
            config_failures: AtomicU32::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn user(&self) -> &SessionUser {
        &self.user
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            cart: state.cart.clone(),
            viewing: state.view.map(|token| token.order_id),
            create: state.create.clone(),
            details: state.details.clone(),
            payment: state.payment.clone(),
            pay: state.pay.clone(),
            deliver: state.deliver.clone(),
        }
    }

    /// Mutate the cart.
    pub fn update_cart<T>(&self, update: impl FnOnce(&mut Cart) -> T) -> T {
        update(&mut self.lock().cart)
    }

    /// Client-side price estimate for the cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidLineItem` when a line's amount overflows.
    pub fn cart_totals(&self) -> Result<PriceBreakdown, OrderError> {
        self.lock().cart.totals(&self.shipping)
    }

    /// Whether the payment widget is prepared for `order_id`, the order in
    /// view.
    #[must_use]
    pub fn ready_for(&self, order_id: OrderId) -> bool {
        let state = self.lock();
        state.view.is_some_and(|token| token.order_id == order_id)
            && state
                .payment
                .value()
                .is_some_and(|widget| widget.order_id == order_id)
    }

    /// Submit the cart as an order.
    ///
    /// The cart is reset only after the storefront accepted the order. That
    /// reset is not atomic with creation: a crash in between leaves the cart
    /// intact and a resubmission creates a second order.
    ///
    /// # Errors
    ///
    /// Returns the storefront's rejection, e.g. `EmptyOrder`.
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn place_order(&self) -> Result<Order, ClientError> {
        let draft = {
            let mut state = self.lock();
            state.create = RequestState::Loading;
            state.cart.to_draft(&self.shipping)
        };

        let result = self.api.create_order(&draft).await;

        let mut state = self.lock();
        if let Ok(order) = &result {
            if draft.client_totals() != Some(order.prices()) {
                debug!(order_id = %order.id, "Storefront repriced the order");
            }
            state.cart.reset();
            info!(order_id = %order.id, "Order placed");
        }
        state.create.finish(result.clone());
        result
    }

    /// Show an order, replacing whatever was in view.
    ///
    /// For an unpaid order this also prepares the payment widget; a failure
    /// there is recorded in the payment state and does not fail the view.
    /// Returns `Ok(None)` if the view changed before the details arrived.
    ///
    /// # Errors
    ///
    /// Returns the storefront's rejection (`NotFound`, `Forbidden`).
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn view_order(&self, id: OrderId) -> Result<Option<OrderSummary>, ClientError> {
        let token = {
            let mut state = self.lock();
            state.generation += 1;
            let token = ViewToken {
                order_id: id,
                generation: state.generation,
            };
            state.view = Some(token);
            state.clear_view();
            state.details = RequestState::Loading;
            token
        };

        self.refresh(token).await
    }

    /// Stop viewing the current order. In-flight results for it are dropped.
    pub fn leave(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.view = None;
        state.clear_view();
    }

    /// Load the payment script and build the widget for the order in view.
    ///
    /// Called by [`Self::view_order`] for unpaid orders. Call again to retry
    /// after an `UpstreamUnavailable` failure. Returns `Ok(None)` if the view
    /// changed meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `NoOrderInView` without loaded details, `AlreadyPaid` for a
    /// paid order and `UpstreamUnavailable` when the gateway config or script
    /// cannot load.
    pub async fn prepare_payment(&self) -> Result<Option<PaymentWidget>, ClientError> {
        let (token, order) = {
            let mut state = self.lock();
            let token = state.view.ok_or(ClientError::NoOrderInView)?;
            let order = state
                .details
                .value()
                .map(|summary| summary.order.clone())
                .ok_or(ClientError::NoOrderInView)?;
            state.payment = RequestState::Loading;
            (token, order)
        };

        let result = self.load_widget(&order).await;

        let mut state = self.lock();
        if !state.is_current(token) {
            debug!(order_id = %token.order_id, "Discarding stale payment widget");
            return Ok(None);
        }
        state.payment.finish(result.clone());
        result.map(Some)
    }

    /// Wait for the payer to approve in the widget, then confirm payment.
    ///
    /// A receipt is always sent to the storefront, even if the view changed
    /// while the widget was open; only the resulting state update is dropped.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotReady` if the widget is not prepared for the order
    /// in view, `PaymentCancelled` if the payer backs out, or the
    /// storefront's rejection.
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn pay(&self) -> Result<Option<Order>, ClientError> {
        let (token, widget) = {
            let state = self.lock();
            let token = state.view.ok_or(ClientError::NoOrderInView)?;
            let widget = state
                .payment
                .value()
                .filter(|widget| widget.order_id == token.order_id)
                .cloned()
                .ok_or(ClientError::PaymentNotReady(token.order_id))?;
            (token, widget)
        };

        let receipt = match self.gateway.await_receipt(&widget).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let mut state = self.lock();
                if state.is_current(token) {
                    state.pay = RequestState::Failed(err.clone());
                }
                return Err(err);
            }
        };

        self.confirm(token, receipt).await
    }

    /// Confirm payment of the order in view with a receipt obtained
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `NoOrderInView` or the storefront's rejection.
    pub async fn confirm_payment(
        &self,
        receipt: PaymentReceipt,
    ) -> Result<Option<Order>, ClientError> {
        let token = self.lock().view.ok_or(ClientError::NoOrderInView)?;
        self.confirm(token, receipt).await
    }

    /// Mark the order in view delivered.
    ///
    /// Non-admin sessions are turned away here without calling the
    /// storefront, which enforces the same rule.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, `NoOrderInView`, or the
    /// storefront's rejection (`NotPaid`).
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn deliver(&self) -> Result<Option<Order>, ClientError> {
        if !self.user.is_admin {
            return Err(OrderError::Forbidden("admin capability required".to_string()).into());
        }

        let token = {
            let mut state = self.lock();
            let token = state.view.ok_or(ClientError::NoOrderInView)?;
            state.deliver = RequestState::Loading;
            token
        };

        let result = self.api.deliver_order(token.order_id).await;

        let mut state = self.lock();
        if !state.is_current(token) {
            debug!(order_id = %token.order_id, "Discarding stale delivery result");
            return result.map(|_| None);
        }
        if let Ok(order) = &result {
            state.apply(order);
            info!(order_id = %order.id, "Order delivered");
        }
        state.deliver.finish(result.clone());
        result.map(Some)
    }

    /// The session's order history.
    ///
    /// # Errors
    ///
    /// Returns the storefront's rejection.
    pub async fn my_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        self.api.list_my_orders().await
    }

    /// Every order, for the admin order list.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, or the storefront's rejection.
    pub async fn all_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        if !self.user.is_admin {
            return Err(OrderError::Forbidden("admin capability required".to_string()).into());
        }
        self.api.list_orders().await
    }

    async fn refresh(&self, token: ViewToken) -> Result<Option<OrderSummary>, ClientError> {
        let result = self.api.get_order(token.order_id).await;

        let unpaid = {
            let mut state = self.lock();
            if !state.is_current(token) {
                debug!(order_id = %token.order_id, "Discarding stale order details");
                return Ok(None);
            }
            state.details.finish(result.clone());
            result.as_ref().is_ok_and(|summary| !summary.order.is_paid)
        };

        if unpaid {
            if let Err(err) = self.prepare_payment().await {
                warn!(order_id = %token.order_id, error = %err, "Payment widget unavailable");
            }
        }

        result.map(Some)
    }

    async fn confirm(
        &self,
        token: ViewToken,
        receipt: PaymentReceipt,
    ) -> Result<Option<Order>, ClientError> {
        {
            let mut state = self.lock();
            if state.is_current(token) {
                state.pay = RequestState::Loading;
            }
        }

        let result = match self.api.pay_order(token.order_id, &receipt).await {
            Err(ClientError::Order(OrderError::AlreadyPaid(id))) => {
                // Paid by an earlier confirmation; show the stored result.
                info!(order_id = %id, "Order already paid, refetching");
                self.api.get_order(id).await.map(|summary| summary.order)
            }
            other => other,
        };

        let mut state = self.lock();
        if !state.is_current(token) {
            debug!(order_id = %token.order_id, "Discarding stale payment result");
            return result.map(|_| None);
        }
        if let Ok(order) = &result {
            state.apply(order);
            state.payment.reset();
            info!(order_id = %order.id, receipt_id = %receipt.id, "Payment confirmed");
        }
        state.pay.finish(result.clone());
        result.map(Some)
    }

    async fn load_widget(&self, order: &Order) -> Result<PaymentWidget, ClientError> {
        let config = self.payment_config().await?;
        self.gateway.prepare(order, &config.client_id).await
    }

    /// Gateway settings, fetched once per session.
    ///
    /// Failed lookups count against the script's attempt bound and surface
    /// as `UpstreamUnavailable`; once the bound is reached the storefront is
    /// not asked again.
    async fn payment_config(&self) -> Result<&PaymentConfig, ClientError> {
        let max_attempts = self.gateway.script().max_attempts();
        self.payment_config
            .get_or_try_init(|| async {
                let failed = self.config_failures.load(Ordering::Acquire);
                if failed >= max_attempts {
                    return Err(ClientError::from(OrderError::UpstreamUnavailable(format!(
                        "payment config lookup failed after {failed} attempts"
                    ))));
                }

                self.api.payment_config().await.map_err(|err| {
                    let attempt = self.config_failures.fetch_add(1, Ordering::AcqRel) + 1;
                    warn!(attempt, error = %err, "Payment config lookup failed");
                    ClientError::from(OrderError::UpstreamUnavailable(format!(
                        "payment config lookup failed: {err}"
                    )))
                })
            })
            .await
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
