//! Multi-step customer flows that run after the payment gateway hands the
//! customer back: payment confirmation, license provisioning and the
//! duplicate-domain check the provisioning form depends on.

mod domain_check;
mod provisioning;
mod thank_you;

pub use domain_check::*;
pub use provisioning::*;
pub use thank_you::{Completion, RenewalNotice, ScriptPurchase, ThankYouState, VerificationFailure};

use std::future::Future;

use crate::error::Result;
use crate::models::{CheckoutKind, CreateLicense, PaymentSession, ProvisionedLicense};

/// Backend operations the thank-you flows need.
pub trait PurchaseBackend: Send + Sync + 'static {
    /// Confirm that the API recorded the purchase behind `session`.
    fn verify_purchase(
        &self,
        kind: CheckoutKind,
        session: &PaymentSession,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Release a confirmed script purchase to the buyer.
    fn record_purchase(&self, session: &PaymentSession) -> impl Future<Output = Result<()>> + Send;

    fn provision_license(
        &self,
        request: &CreateLicense,
    ) -> impl Future<Output = Result<ProvisionedLicense>> + Send;
}
