use std::sync::Arc;
use std::time::Duration;

use super::thank_you::{Completion, ThankYouState, verify_return};
use super::{DomainCheckState, DomainChecker, DomainLookup, PurchaseBackend};
use crate::error::{AppError, Result};
use crate::models::{CheckoutKind, CreateLicense, PaymentQuery, PaymentSession, ProvisionedLicense};

/// Fields of the license-configuration form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseForm {
    pub domain: String,
    pub theme_url: String,
    pub update_url: String,
}

impl LicenseForm {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("domain", &self.domain),
            ("theme URL", &self.theme_url),
            ("update URL", &self.update_url),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Thank-you flow for a launcher purchase: confirm the payment, then collect
/// the domain and URLs the new license is bound to.
pub struct LauncherProvisioning<B> {
    backend: Arc<B>,
    query: PaymentQuery,
    session: Option<PaymentSession>,
    state: ThankYouState,
    form: LicenseForm,
    domain_check: DomainChecker<B>,
}

impl<B: PurchaseBackend + DomainLookup> LauncherProvisioning<B> {
    pub fn new(backend: Arc<B>, query: PaymentQuery, debounce: Duration) -> Self {
        Self {
            domain_check: DomainChecker::new(backend.clone(), debounce),
            backend,
            query,
            session: None,
            state: ThankYouState::Verifying,
            form: LicenseForm::default(),
        }
    }

    /// Run the verification step. Does nothing once past `Verifying`.
    pub async fn verify(&mut self) -> &ThankYouState {
        if self.state != ThankYouState::Verifying {
            return &self.state;
        }

        match verify_return(self.backend.as_ref(), CheckoutKind::Launcher, &self.query).await {
            Ok(session) => {
                tracing::info!(payment_id = %session.payment_id, "Launcher purchase confirmed");
                self.session = Some(session);
                self.state = ThankYouState::Form;
            }
            Err(failure) => {
                tracing::warn!("Launcher purchase verification failed: {}", failure);
                self.state = ThankYouState::Error(failure);
            }
        }
        &self.state
    }

    pub fn state(&self) -> &ThankYouState {
        &self.state
    }

    pub fn form(&self) -> &LicenseForm {
        &self.form
    }

    pub fn set_domain(&mut self, domain: &str) {
        self.form.domain = domain.to_string();
        self.domain_check.edit(domain);
    }

    pub fn set_theme_url(&mut self, url: &str) {
        self.form.theme_url = url.to_string();
    }

    pub fn set_update_url(&mut self, url: &str) {
        self.form.update_url = url.to_string();
    }

    pub fn domain_check(&self) -> DomainCheckState {
        self.domain_check.state()
    }

    /// Wait for a pending duplicate-domain check to finish.
    pub async fn domain_checked(&self) -> DomainCheckState {
        self.domain_check.settled().await
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        self.state == ThankYouState::Form && !self.domain_check.blocks_submit()
    }

    /// Create the license. Failures leave the form open for another attempt.
    pub async fn submit(&mut self) -> Result<ProvisionedLicense> {
        if self.state != ThankYouState::Form {
            return Err(AppError::BadRequest("The license form is not open".into()));
        }

        let check = self.domain_check.state();
        if check.exists {
            return Err(AppError::DuplicateDomain(self.form.domain.trim().to_string()));
        }
        if check.checking {
            return Err(AppError::BadRequest("The domain is still being checked".into()));
        }

        let missing = self.form.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Fill in all fields (missing: {})",
                missing.join(", ")
            )));
        }

        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AppError::Internal("Verified payment missing".into()))?;

        let request = CreateLicense {
            user_id: Some(session.user_id.clone()),
            product_id: Some(session.product_id.clone()),
            domain: self.form.domain.trim().to_string(),
            theme_url: self.form.theme_url.trim().to_string(),
            update_url: self.form.update_url.trim().to_string(),
        };

        match self.backend.provision_license(&request).await {
            Ok(license) => {
                self.state = ThankYouState::Success(Completion::License(license.clone()));
                Ok(license)
            }
            Err(e) => {
                tracing::warn!(domain = %request.domain, "Failed to save license: {}", e);
                Err(e)
            }
        }
    }
}
