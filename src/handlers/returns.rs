use axum::extract::{RawQuery, State};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::models::{CheckoutKind, PaymentQuery};

/// How the gateway says the checkout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnOutcome {
    Approved,
    Pending,
    Failed,
}

/// A customer arriving back from the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnEvent {
    pub outcome: ReturnOutcome,
    /// None for the generic error page, which serves every checkout kind
    pub kind: Option<CheckoutKind>,
    pub query: PaymentQuery,
}

#[derive(Clone)]
pub struct ReturnState {
    events: mpsc::Sender<ReturnEvent>,
}

impl ReturnState {
    pub fn new(events: mpsc::Sender<ReturnEvent>) -> Self {
        Self { events }
    }
}

async fn forward(
    state: &ReturnState,
    outcome: ReturnOutcome,
    kind: Option<CheckoutKind>,
    raw_query: Option<String>,
) -> Result<()> {
    // Parsed by hand: the gateway repeats keys (status + collection_status)
    let query = PaymentQuery::parse(raw_query.as_deref().unwrap_or_default());

    tracing::info!(
        outcome = ?outcome,
        kind = kind.as_ref().map(|k| k.as_ref()).unwrap_or("unknown"),
        payment_id = query.payment_id.as_deref().unwrap_or("-"),
        "Customer returned from payment gateway"
    );

    state
        .events
        .send(ReturnEvent { outcome, kind, query })
        .await
        .map_err(|_| AppError::Internal("No checkout is waiting for this payment".into()))
}

/// GET /dashboard/pendente
pub async fn script_pending(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Pending, Some(CheckoutKind::Script), raw).await?;
    Ok("Payment pending! We received your order but the payment has not been confirmed yet. \
        Access is released automatically once it is approved.")
}

/// GET /dashboard/pendente-launcher
pub async fn launcher_pending(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Pending, Some(CheckoutKind::Launcher), raw).await?;
    Ok("Launcher payment pending! As soon as it is approved you can configure your launcher. \
        You can close this tab and return to pzstore.")
}

/// GET /dashboard/obrigado
pub async fn script_approved(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Approved, Some(CheckoutKind::Script), raw).await?;
    Ok("Thank you for your purchase! Finishing up in pzstore.")
}

/// GET /dashboard/obrigado-launcher
pub async fn launcher_approved(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Approved, Some(CheckoutKind::Launcher), raw).await?;
    Ok("Thank you for your purchase! Configure your launcher license in pzstore.")
}

/// GET /dashboard/obrigado-renovacao
pub async fn renewal_approved(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Approved, Some(CheckoutKind::Renewal), raw).await?;
    Ok("Renewal started! Once the payment is approved the license gains 30 more days automatically.")
}

/// GET /dashboard/erro
pub async fn payment_failed(State(state): State<ReturnState>, RawQuery(raw): RawQuery) -> Result<&'static str> {
    forward(&state, ReturnOutcome::Failed, None, raw).await?;
    Ok("Something went wrong with your payment. Please contact support.")
}
