use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::{
    CheckoutResponse, DomainCheckResponse, Envelope, ErrorBody, LoginResponse, Navigation,
    PaymentStatusResponse,
};
use crate::config::Config;
use crate::error::{AppError, Result, map_upstream_error};
use crate::flows::{DomainLookup, PurchaseBackend};
use crate::models::{
    Category, CheckoutKind, Counts, CreateLicense, CreatePayment, LoginUser, PaymentSession,
    PaymentStatus, Product, ProvisionedLicense, RegisterUser, UpdateLicense, User,
};
use crate::payments::PaymentStatusSource;
use crate::session::Session;

/// Client for the storefront REST API.
///
/// Authenticated calls attach the session's bearer token. A 401 on any of them
/// purges the token and emits [`Navigation::Login`].
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
    navigation: Option<mpsc::UnboundedSender<Navigation>>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("pzstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            session,
            navigation: None,
        })
    }

    /// Deliver navigation side effects (the `/login` redirect) to `tx`.
    pub fn with_navigation(mut self, tx: mpsc::UnboundedSender<Navigation>) -> Self {
        self.navigation = Some(tx);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn force_login(&self) {
        self.session.clear_token();
        if let Some(tx) = &self.navigation {
            let _ = tx.send(Navigation::Login);
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        match self.session.token() {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => {
                tracing::debug!("No stored token, redirecting to login");
                self.force_login();
                Err(AppError::Unauthorized)
            }
        }
    }

    /// Send a request and decode its JSON body.
    ///
    /// `authenticated` marks calls whose 401 must end the session. `domain` is
    /// reported when the API rejects a duplicate license domain.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        authenticated: bool,
        domain: Option<&str>,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or(text);

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if !authenticated {
                    // Public endpoints (login) answer 401 for bad credentials
                    return Err(AppError::BadRequest(message));
                }
                tracing::info!("API rejected the session token, redirecting to login");
                self.force_login();
            } else {
                tracing::debug!(status = status.as_u16(), "API error: {}", message);
            }
            return Err(map_upstream_error(status.as_u16(), &message, domain));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse API response: {}", e)))
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let body = RegisterUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let envelope: Envelope<serde_json::Value> = self
            .send(self.client.post(self.url("/users/register")).json(&body), false, None)
            .await?;
        envelope.into_ack()
    }

    /// Log in and keep the returned token in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let body = LoginUser {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .send(self.client.post(self.url("/users/login")).json(&body), false, None)
            .await?;

        match (response.success, response.token) {
            (true, Some(token)) => {
                self.session.store_token(&token);
                tracing::info!("Logged in");
                Ok(())
            }
            _ => Err(AppError::BadRequest(
                response.message.unwrap_or_else(|| "Invalid credentials".into()),
            )),
        }
    }

    pub fn logout(&self) {
        self.session.clear_token();
    }

    pub async fn me(&self) -> Result<User> {
        let builder = self.authorized(self.client.get(self.url("/users/me")))?;
        let envelope: Envelope<User> = self.send(builder, true, None).await?;
        envelope.into_data()
    }

    pub async fn counts(&self) -> Result<Counts> {
        let builder = self.authorized(self.client.get(self.url("/users/counts")))?;
        let envelope: Envelope<Counts> = self.send(builder, true, None).await?;
        envelope.into_data()
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        let envelope: Envelope<Vec<Product>> = self
            .send(self.client.get(self.url("/products")), false, None)
            .await?;
        envelope.into_data()
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let envelope: Envelope<Vec<Category>> = self
            .send(self.client.get(self.url("/category")), false, None)
            .await?;
        envelope.into_data()
    }

    pub async fn check_domain(&self, domain: &str) -> Result<bool> {
        let response: DomainCheckResponse = self
            .send(
                self.client
                    .get(self.url("/launcher/check-domain"))
                    .query(&[("domain", domain)]),
                false,
                None,
            )
            .await?;
        Ok(response.exists)
    }

    pub async fn create_license(&self, request: &CreateLicense) -> Result<ProvisionedLicense> {
        let builder = self.authorized(self.client.post(self.url("/buy/license")).json(request))?;
        let envelope: Envelope<ProvisionedLicense> =
            self.send(builder, true, Some(&request.domain)).await?;
        let license = envelope.into_data()?;
        tracing::info!(domain = %request.domain, "License created");
        Ok(license)
    }

    /// Release a paid script to the buyer named by `session`.
    pub async fn buy_product(&self, session: &PaymentSession) -> Result<()> {
        let body = serde_json::json!({
            "userId": session.user_id,
            "productId": session.product_id,
        });
        let builder = self.authorized(self.client.post(self.url("/buy/product")).json(&body))?;
        let envelope: Envelope<serde_json::Value> = self.send(builder, true, None).await?;
        envelope.into_ack()
    }

    pub async fn update_license(&self, token: &str, update: &UpdateLicense) -> Result<()> {
        let path = format!("/launcher/{}", urlencoding::encode(token));
        let builder = self.authorized(self.client.put(self.url(&path)).json(update))?;
        let envelope: Envelope<serde_json::Value> =
            self.send(builder, true, Some(&update.domain)).await?;
        envelope.into_ack()
    }

    /// Create a gateway payment and return its `init_point` checkout URL.
    pub async fn create_payment(&self, kind: CheckoutKind, request: &CreatePayment) -> Result<String> {
        let builder = self.authorized(
            self.client
                .post(self.url(kind.create_endpoint()))
                .json(request),
        )?;
        let response: CheckoutResponse = self.send(builder, true, None).await?;

        if response.success == Some(false) {
            return Err(AppError::BadRequest(
                response.message.unwrap_or_else(|| "Payment could not be created".into()),
            ));
        }
        response
            .init_point
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Internal("Payment response carried no init_point".into()))
    }

    pub async fn fetch_payment_status(&self, session: &PaymentSession) -> Result<PaymentStatus> {
        let response: PaymentStatusResponse = self
            .send(
                self.client
                    .get(self.url("/payment/payment-status"))
                    .query(&session.query_pairs()),
                false,
                None,
            )
            .await?;
        Ok(response.status)
    }

    /// Ask the API to confirm a returned payment. The API has already recorded
    /// the purchase through the gateway webhook by the time this succeeds.
    pub async fn confirm_purchase(&self, kind: CheckoutKind, session: &PaymentSession) -> Result<()> {
        let Some(endpoint) = kind.verify_endpoint() else {
            return Ok(());
        };
        let builder = self.authorized(
            self.client
                .get(self.url(endpoint))
                .query(&session.query_pairs()),
        )?;
        let envelope: Envelope<serde_json::Value> = self.send(builder, true, None).await?;
        envelope.into_ack()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

impl PaymentStatusSource for ApiClient {
    async fn payment_status(&self, session: &PaymentSession) -> Result<PaymentStatus> {
        self.fetch_payment_status(session).await
    }
}

impl DomainLookup for ApiClient {
    async fn domain_exists(&self, domain: &str) -> Result<bool> {
        self.check_domain(domain).await
    }
}

impl PurchaseBackend for ApiClient {
    async fn verify_purchase(&self, kind: CheckoutKind, session: &PaymentSession) -> Result<()> {
        self.confirm_purchase(kind, session).await
    }

    async fn record_purchase(&self, session: &PaymentSession) -> Result<()> {
        self.buy_product(session).await
    }

    async fn provision_license(&self, request: &CreateLicense) -> Result<ProvisionedLicense> {
        self.create_license(request).await
    }
}
