//! Payment gateway integration.
//!
//! The gateway ships a client script that renders a payment widget. The
//! script is loaded at most once per process by [`PaymentScript`]; the
//! widget's approval callback is bridged into Rust through a
//! `tokio::sync::oneshot` channel by [`PaymentGateway::await_receipt`].

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use proshop_core::{Order, OrderError, OrderId, PaymentReceipt};
use rust_decimal::Decimal;
use tokio::sync::{OnceCell, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::error::ClientError;

/// Gateway script SDK.
pub trait PaymentSdk: Send + Sync {
    /// Load the gateway script for the given public client id.
    fn load_script(&self, client_id: &str) -> impl Future<Output = Result<(), String>> + Send;

    /// Render the widget for `widget`.
    ///
    /// The SDK sends the receipt through `on_approve` when the payer
    /// approves, and drops the sender if the payer cancels.
    ///
    /// # Errors
    ///
    /// Returns the SDK's reason if the widget could not be rendered.
    fn render(
        &self,
        widget: &PaymentWidget,
        on_approve: oneshot::Sender<PaymentReceipt>,
    ) -> Result<(), String>;
}

/// Load state of the gateway script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptState {
    Unrequested,
    Loading,
    Ready,
    Failed { attempts: u32, reason: String },
}

/// The gateway script, loaded at most once per process.
///
/// Concurrent requesters share the in-flight load, including its failure.
/// A failed load is retried by the next requester until `max_attempts`
/// loads have failed; after that every request fails with
/// `UpstreamUnavailable` without touching the SDK. Share one instance
/// through an `Arc`.
pub struct PaymentScript<S> {
    sdk: S,
    ready: OnceCell<()>,
    failed_loads: AtomicU32,
    max_attempts: u32,
    state: Mutex<ScriptState>,
}

impl<S: PaymentSdk> PaymentScript<S> {
    #[must_use]
    pub fn new(sdk: S, max_attempts: u32) -> Self {
        Self {
            sdk,
            ready: OnceCell::new(),
            failed_loads: AtomicU32::new(0),
            max_attempts,
            state: Mutex::new(ScriptState::Unrequested),
        }
    }

    pub const fn sdk(&self) -> &S {
        &self.sdk
    }

    /// How many failed loads are tolerated before giving up.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> ScriptState {
        self.lock_state().clone()
    }

    /// Loads that have failed so far.
    #[must_use]
    pub fn failed_loads(&self) -> u32 {
        self.failed_loads.load(Ordering::Acquire)
    }

    /// Make sure the script is loaded.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UpstreamUnavailable` if this load (or the
    /// in-flight load it joined) failed, or if the attempt budget is spent.
    pub async fn ensure_loaded(&self, client_id: &str) -> Result<(), OrderError> {
        if self.ready.initialized() {
            return Ok(());
        }

        let observed = self.failed_loads();
        self.ready
            .get_or_try_init(|| self.load(client_id, observed))
            .await
            .map(|_| ())
    }

    // `OnceCell` runs one initializer at a time, so the failure counter is
    // only written here.
    #[instrument(skip(self, client_id))]
    async fn load(&self, client_id: &str, observed: u32) -> Result<(), OrderError> {
        let failed = self.failed_loads();
        if failed != observed {
            // Queued behind a load that failed.
            return Err(self.last_failure());
        }
        if failed >= self.max_attempts {
            return Err(OrderError::UpstreamUnavailable(format!(
                "payment script failed to load after {failed} attempts"
            )));
        }

        let attempt = failed + 1;
        *self.lock_state() = ScriptState::Loading;
        debug!(attempt, "Loading payment script");

        match self.sdk.load_script(client_id).await {
            Ok(()) => {
                *self.lock_state() = ScriptState::Ready;
                info!(attempt, "Payment script loaded");
                Ok(())
            }
            Err(reason) => {
                warn!(attempt, %reason, "Payment script failed to load");
                self.failed_loads.store(attempt, Ordering::Release);
                *self.lock_state() = ScriptState::Failed {
                    attempts: attempt,
                    reason: reason.clone(),
                };
                Err(OrderError::UpstreamUnavailable(reason))
            }
        }
    }

    fn last_failure(&self) -> OrderError {
        match &*self.lock_state() {
            ScriptState::Failed { reason, .. } => OrderError::UpstreamUnavailable(reason.clone()),
            _ => OrderError::UpstreamUnavailable("payment script failed to load".to_string()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A widget bound to one order's trusted total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentWidget {
    pub order_id: OrderId,
    pub amount: Decimal,
}

impl PaymentWidget {
    #[must_use]
    pub const fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            amount: order.total_price,
        }
    }
}

/// Bridges the payment widget into the order lifecycle.
pub struct PaymentGateway<S> {
    script: Arc<PaymentScript<S>>,
}

impl<S> Clone for PaymentGateway<S> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
        }
    }
}

impl<S: PaymentSdk> PaymentGateway<S> {
    #[must_use]
    pub const fn new(script: Arc<PaymentScript<S>>) -> Self {
        Self { script }
    }

    #[must_use]
    pub fn script(&self) -> &PaymentScript<S> {
        &self.script
    }

    /// Load the script and build the widget for an unpaid order.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPaid` for a paid order and `UpstreamUnavailable` when
    /// the script cannot be loaded.
    #[instrument(skip_all, fields(order_id = %order.id))]
    pub async fn prepare(
        &self,
        order: &Order,
        client_id: &str,
    ) -> Result<PaymentWidget, ClientError> {
        if order.is_paid {
            return Err(OrderError::AlreadyPaid(order.id).into());
        }

        self.script.ensure_loaded(client_id).await?;
        Ok(PaymentWidget::for_order(order))
    }

    /// Render the widget and wait for the payer's approval.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable` if the widget cannot be rendered and
    /// `PaymentCancelled` if the payer closes it without approving.
    #[instrument(skip_all, fields(order_id = %widget.order_id))]
    pub async fn await_receipt(&self, widget: &PaymentWidget) -> Result<PaymentReceipt, ClientError> {
        let (on_approve, approved) = oneshot::channel();
        self.script
            .sdk()
            .render(widget, on_approve)
            .map_err(OrderError::UpstreamUnavailable)?;

        let receipt = approved.await.map_err(|_| ClientError::PaymentCancelled)?;
        info!(receipt_id = %receipt.id, "Payment approved");
        Ok(receipt)
    }
}
