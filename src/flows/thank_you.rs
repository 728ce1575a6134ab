use std::sync::Arc;

use thiserror::Error;

use super::PurchaseBackend;
use crate::error::AppError;
use crate::models::{CheckoutKind, PaymentQuery, PaymentSession, PaymentStatus, ProvisionedLicense};

/// View state of a page the gateway returns to after payment.
///
/// `Verifying → Form → Success` for launchers, `Verifying → Success` for
/// scripts. `Error` is terminal: the customer has to navigate away.
#[derive(Debug, Clone, PartialEq)]
pub enum ThankYouState {
    Verifying,
    Form,
    Success(Completion),
    Error(VerificationFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Script access was released
    Purchase { product_id: String },
    /// Launcher license was created
    License(ProvisionedLicense),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("We could not identify your purchase")]
    MissingParameters,
    #[error("Payment was not approved (status: {0})")]
    NotApproved(PaymentStatus),
    #[error("We could not confirm your purchase: {0}")]
    VerificationFailed(String),
}

impl From<VerificationFailure> for AppError {
    fn from(failure: VerificationFailure) -> Self {
        AppError::PaymentVerification(failure.to_string())
    }
}

impl ThankYouState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ThankYouState::Success(_) | ThankYouState::Error(_))
    }

    /// State after the payment of `session` was confirmed.
    fn verified(kind: CheckoutKind, session: &PaymentSession) -> Self {
        match kind {
            CheckoutKind::Launcher => ThankYouState::Form,
            CheckoutKind::Script | CheckoutKind::Renewal => ThankYouState::Success(Completion::Purchase {
                product_id: session.product_id.clone(),
            }),
        }
    }
}

/// Check the returned query and have the API confirm the purchase.
pub(crate) async fn verify_return<B: PurchaseBackend>(
    backend: &B,
    kind: CheckoutKind,
    query: &PaymentQuery,
) -> std::result::Result<PaymentSession, VerificationFailure> {
    let session = query.session().ok_or(VerificationFailure::MissingParameters)?;

    if let Some(status) = &session.status {
        if !status.is_approved() {
            return Err(VerificationFailure::NotApproved(status.clone()));
        }
    }

    backend
        .verify_purchase(kind, &session)
        .await
        .map_err(|e| VerificationFailure::VerificationFailed(e.to_string()))?;

    Ok(session)
}

/// Thank-you flow for an ordinary script purchase.
pub struct ScriptPurchase<B> {
    backend: Arc<B>,
    query: PaymentQuery,
    state: ThankYouState,
}

impl<B: PurchaseBackend> ScriptPurchase<B> {
    pub fn new(backend: Arc<B>, query: PaymentQuery) -> Self {
        Self {
            backend,
            query,
            state: ThankYouState::Verifying,
        }
    }

    pub async fn verify(&mut self) -> &ThankYouState {
        if self.state != ThankYouState::Verifying {
            return &self.state;
        }

        self.state = match verify_return(self.backend.as_ref(), CheckoutKind::Script, &self.query).await {
            Ok(session) => match self.backend.record_purchase(&session).await {
                Ok(()) => {
                    tracing::info!(product_id = %session.product_id, "Script purchase confirmed");
                    ThankYouState::verified(CheckoutKind::Script, &session)
                }
                Err(e) => {
                    tracing::warn!(product_id = %session.product_id, "Failed to release script: {}", e);
                    ThankYouState::Error(VerificationFailure::VerificationFailed(e.to_string()))
                }
            },
            Err(failure) => {
                tracing::warn!("Script purchase verification failed: {}", failure);
                ThankYouState::Error(failure)
            }
        };
        &self.state
    }

    pub fn state(&self) -> &ThankYouState {
        &self.state
    }
}

/// What the renewal thank-you page tells the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalNotice {
    Complete { user_id: String, license_id: String },
    Incomplete,
}

impl RenewalNotice {
    pub fn from_query(query: &PaymentQuery) -> Self {
        match (query.user_id(), query.license_id()) {
            (Some(user_id), Some(license_id)) => RenewalNotice::Complete {
                user_id: user_id.to_string(),
                license_id: license_id.to_string(),
            },
            _ => RenewalNotice::Incomplete,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RenewalNotice::Complete { .. } => {
                "Renewal started! Once the payment is approved the license gains 30 more days automatically."
            }
            RenewalNotice::Incomplete => {
                "Renewal details are incomplete. If the payment was approved it will be confirmed within a few minutes."
            }
        }
    }
}
