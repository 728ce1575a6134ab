use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::Result;
use crate::models::{PaymentQuery, PaymentSession, PaymentStatus};

/// Delay between payment-status requests.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Anything that can report the gateway status of a payment.
pub trait PaymentStatusSource: Send + Sync + 'static {
    fn payment_status(
        &self,
        session: &PaymentSession,
    ) -> impl Future<Output = Result<PaymentStatus>> + Send;
}

/// Background task polling a pending payment until it is approved.
///
/// The first request goes out one interval after start. Each tick issues
/// exactly one request and waits for it before the next tick, so requests
/// never overlap. Non-approved answers and request errors are retried on the
/// next tick forever. Dropping the poller stops it.
#[derive(Debug)]
pub struct PaymentPoller {
    handle: JoinHandle<bool>,
}

impl PaymentPoller {
    /// Start polling the payment named by `query`.
    ///
    /// Returns `None`, and polls nothing, when `payment_id`, `userId` or
    /// `productId` is missing.
    pub fn from_query<S, F>(
        source: Arc<S>,
        query: &PaymentQuery,
        interval: Duration,
        on_approved: F,
    ) -> Option<Self>
    where
        S: PaymentStatusSource,
        F: FnOnce(PaymentSession) + Send + 'static,
    {
        let Some(session) = query.session() else {
            tracing::debug!("Payment query incomplete, not polling");
            return None;
        };
        Some(Self::spawn(source, session, interval, on_approved))
    }

    pub fn spawn<S, F>(source: Arc<S>, session: PaymentSession, interval: Duration, on_approved: F) -> Self
    where
        S: PaymentStatusSource,
        F: FnOnce(PaymentSession) + Send + 'static,
    {
        // tokio intervals reject a zero period
        let interval = interval.max(MIN_POLL_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut attempts: u64 = 0;
            loop {
                ticker.tick().await;
                attempts += 1;

                match source.payment_status(&session).await {
                    Ok(PaymentStatus::Approved) => {
                        tracing::info!(
                            payment_id = %session.payment_id,
                            attempts,
                            "Payment approved"
                        );
                        on_approved(session);
                        return true;
                    }
                    Ok(status) => {
                        tracing::debug!(payment_id = %session.payment_id, %status, "Payment not approved yet");
                    }
                    Err(e) => {
                        tracing::debug!(payment_id = %session.payment_id, "Payment status request failed: {}", e);
                    }
                }
            }
        });

        Self { handle }
    }

    /// Poll until approved and hand back the approved session.
    ///
    /// Resolves to `None` only if the poller is cancelled.
    pub async fn approved<S: PaymentStatusSource>(
        source: Arc<S>,
        session: PaymentSession,
        interval: Duration,
    ) -> Option<PaymentSession> {
        let (tx, rx) = oneshot::channel();
        let _poller = Self::spawn(source, session, interval, move |approved| {
            let _ = tx.send(approved);
        });
        rx.await.ok()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end. `true` means the approval callback ran.
    pub async fn wait(mut self) -> bool {
        (&mut self.handle).await.unwrap_or(false)
    }
}

impl Drop for PaymentPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
