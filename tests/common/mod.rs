//! Shared fixtures: an in-process mock of the storefront API and in-memory
//! fakes for the flow traits.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub use pzstore::api::{ApiClient, Navigation};
pub use pzstore::config::Config;
pub use pzstore::error::{AppError, Result};
pub use pzstore::flows::{DomainLookup, PurchaseBackend};
pub use pzstore::models::{
    CheckoutKind, CreateLicense, PaymentQuery, PaymentSession, PaymentStatus, ProvisionedLicense,
};
pub use pzstore::payments::PaymentStatusSource;
pub use pzstore::session::Session;
pub use pzstore::storage::MemoryStorage;

pub const VALID_TOKEN: &str = "valid-token";
/// Well-formed token whose account lost access; the API answers 403
pub const FORBIDDEN_TOKEN: &str = "forbidden-token";
pub const TEST_EMAIL: &str = "cliente@example.com";
pub const TEST_PASSWORD: &str = "senha123";

// ============ Mock storefront API ============

#[derive(Default)]
pub struct MockState {
    pub taken_domains: HashSet<String>,
    pub domain_checks: Vec<String>,
    pub license_requests: Vec<Value>,
    pub payment_status_calls: usize,
    /// Answers for /payment/payment-status; the last one repeats
    pub statuses: VecDeque<String>,
    pub verify_calls: Vec<HashMap<String, String>>,
    pub payment_requests: Vec<(String, Value)>,
    pub purchases: Vec<Value>,
}

#[derive(Clone)]
pub struct MockApi {
    pub state: Arc<Mutex<MockState>>,
    pub base_url: String,
}

impl MockApi {
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

type Shared = Arc<Mutex<MockState>>;

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", VALID_TOKEN))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token inválido" }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == TEST_EMAIL && body["password"] == TEST_PASSWORD {
        Json(json!({ "success": true, "token": VALID_TOKEN })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Credenciais inválidas" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == TEST_EMAIL {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "E-mail já cadastrado" }))).into_response()
    } else {
        Json(json!({ "success": true })).into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": {
            "name": "Cliente",
            "email": TEST_EMAIL,
            "licenses": [{
                "_id": "lic-1",
                "token": "tok-1",
                "domain": "loja.com.br",
                "expirationDate": "2099-01-01T00:00:00.000Z",
                "themeUrl": "https://loja.com.br/theme",
                "updateUrl": "https://loja.com.br/update",
                "downloader": "active",
                "dashboard": "disabled",
                "status": "expired"
            }],
            "licenseScript": [{
                "_id": "script-1",
                "productName": "Mapa Custom",
                "downloadLink": "https://cdn.example.com/mapa.zip",
                "status": "active"
            }]
        }
    }))
    .into_response()
}

async fn counts(headers: HeaderMap) -> Response {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    if auth == Some(format!("Bearer {}", FORBIDDEN_TOKEN).as_str()) {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "Acesso negado" }))).into_response();
    }
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": { "launcherCount": 1, "scriptCount": 2, "totalCount": 3 }
    }))
    .into_response()
}

async fn products() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [
            {
                "_id": "p-launcher",
                "name": "Launcher PZ",
                "description": "Launcher completo",
                "price": 199.9,
                "isLauncher": true,
                "category": { "_id": "cat-a", "name": "Launchers" },
                "subcategory": ["B1"]
            },
            {
                "_id": "p-script",
                "name": "Script de Loja",
                "description": null,
                "price": "49.90",
                "image": "/uploads/script.png",
                "category": "cat-b",
                "subcategory": "B2"
            }
        ]
    }))
}

async fn categories() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [
            { "_id": "cat-a", "name": "Launchers", "subcategories": ["B1"] },
            { "_id": "cat-b", "name": "Scripts", "subcategories": ["B2"] }
        ]
    }))
}

async fn check_domain(State(state): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let domain = params.get("domain").cloned().unwrap_or_default();
    let mut state = state.lock().unwrap();
    state.domain_checks.push(domain.clone());
    Json(json!({ "exists": state.taken_domains.contains(&domain) }))
}

async fn create_license(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state.license_requests.push(body.clone());
    let domain = body["domain"].as_str().unwrap_or_default().to_string();
    if state.taken_domains.contains(&domain) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "E11000 duplicate key error collection: licenses index: domain_1" })),
        )
            .into_response();
    }
    state.taken_domains.insert(domain);
    Json(json!({
        "success": true,
        "data": { "token": "new-token", "expirationDate": "2099-02-01T00:00:00.000Z" }
    }))
    .into_response()
}

async fn update_license(headers: HeaderMap, Path(token): Path<String>) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    if token == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Licença não encontrada" }))).into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn buy_product(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().purchases.push(body);
    Json(json!({ "success": true })).into_response()
}

fn payment_created(state: Shared, endpoint: &str, headers: HeaderMap, body: Value) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    state
        .lock()
        .unwrap()
        .payment_requests
        .push((endpoint.to_string(), body));
    Json(json!({ "success": true, "init_point": "https://gateway.example.com/checkout?pref=123" }))
        .into_response()
}

async fn payment_status(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.payment_status_calls += 1;
    let status = if state.statuses.len() > 1 {
        state.statuses.pop_front().unwrap_or_default()
    } else {
        state.statuses.front().cloned().unwrap_or_else(|| "pending".into())
    };
    Json(json!({ "status": status }))
}

async fn verify_purchase(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().verify_calls.push(params);
    Json(json!({ "success": true })).into_response()
}

/// Start the mock API on an ephemeral port.
pub async fn spawn_mock_api() -> MockApi {
    let state: Shared = Arc::new(Mutex::new(MockState::default()));

    let app = Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/register", post(register))
        .route("/api/users/me", get(me))
        .route("/api/users/counts", get(counts))
        .route("/api/products", get(products))
        .route("/api/category", get(categories))
        .route("/api/launcher/check-domain", get(check_domain))
        .route("/api/launcher/{token}", put(update_license))
        .route("/api/buy/license", post(create_license))
        .route("/api/buy/product", post(buy_product))
        .route(
            "/api/payment/create",
            post(|State(s): State<Shared>, h: HeaderMap, Json(b): Json<Value>| async move {
                payment_created(s, "/payment/create", h, b)
            }),
        )
        .route(
            "/api/payment/create-launcher",
            post(|State(s): State<Shared>, h: HeaderMap, Json(b): Json<Value>| async move {
                payment_created(s, "/payment/create-launcher", h, b)
            }),
        )
        .route(
            "/api/payment/create-renew",
            post(|State(s): State<Shared>, h: HeaderMap, Json(b): Json<Value>| async move {
                payment_created(s, "/payment/create-renew", h, b)
            }),
        )
        .route("/api/payment/payment-status", get(payment_status))
        .route("/api/dashboard/obrigado", get(verify_purchase))
        .route("/api/dashboard/obrigado-launcher", get(verify_purchase))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        state,
        base_url: format!("http://{}/api", addr),
    }
}

/// Client against `api`, without a stored token.
pub fn client_for(api: &MockApi) -> (Arc<ApiClient>, mpsc::UnboundedReceiver<Navigation>) {
    let session = Session::new(Arc::new(MemoryStorage::new()));
    let (tx, rx) = mpsc::unbounded_channel();
    let client = ApiClient::new(&Config::for_api(&api.base_url), session)
        .unwrap()
        .with_navigation(tx);
    (Arc::new(client), rx)
}

/// Client against `api` holding `token`.
pub fn client_with_token(api: &MockApi, token: &str) -> (Arc<ApiClient>, mpsc::UnboundedReceiver<Navigation>) {
    let (client, rx) = client_for(api);
    client.session().store_token(token);
    (client, rx)
}

pub fn approved_query() -> PaymentQuery {
    PaymentQuery::parse("payment_id=pay-1&userId=user-1&productId=p-launcher&status=approved")
}

// ============ In-memory fakes ============

/// Scripted backend for flow and poller tests.
#[derive(Default)]
pub struct FakeBackend {
    pub statuses: Mutex<VecDeque<Result<PaymentStatus>>>,
    pub status_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub taken_domains: Mutex<HashSet<String>>,
    pub lookups: Mutex<Vec<String>>,
    pub verify_error: Mutex<Option<AppError>>,
    pub verify_calls: AtomicUsize,
    pub record_error: Mutex<Option<AppError>>,
    pub recorded: Mutex<Vec<PaymentSession>>,
    pub provision_error: Mutex<Option<AppError>>,
    pub provisioned: Mutex<Vec<CreateLicense>>,
    /// Simulated latency of each payment-status request
    pub status_latency: Mutex<Option<std::time::Duration>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_statuses(statuses: Vec<Result<PaymentStatus>>) -> Arc<Self> {
        let backend = Self::default();
        *backend.statuses.lock().unwrap() = statuses.into();
        Arc::new(backend)
    }

    pub fn take_domain(&self, domain: &str) {
        self.taken_domains.lock().unwrap().insert(domain.to_string());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn provisioned_count(&self) -> usize {
        self.provisioned.lock().unwrap().len()
    }
}

impl PaymentStatusSource for FakeBackend {
    async fn payment_status(&self, _session: &PaymentSession) -> Result<PaymentStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.status_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                None
            }
        };
        let answer = match next {
            Some(answer) => answer,
            None => match self.statuses.lock().unwrap().front() {
                Some(Ok(status)) => Ok(status.clone()),
                Some(Err(_)) => Err(AppError::Internal("status unavailable".into())),
                None => Ok(PaymentStatus::Pending),
            },
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

impl DomainLookup for FakeBackend {
    async fn domain_exists(&self, domain: &str) -> Result<bool> {
        self.lookups.lock().unwrap().push(domain.to_string());
        Ok(self.taken_domains.lock().unwrap().contains(domain))
    }
}

impl PurchaseBackend for FakeBackend {
    async fn verify_purchase(&self, _kind: CheckoutKind, _session: &PaymentSession) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match self.verify_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn record_purchase(&self, session: &PaymentSession) -> Result<()> {
        if let Some(e) = self.record_error.lock().unwrap().take() {
            return Err(e);
        }
        self.recorded.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn provision_license(&self, request: &CreateLicense) -> Result<ProvisionedLicense> {
        if let Some(e) = self.provision_error.lock().unwrap().take() {
            return Err(e);
        }
        self.provisioned.lock().unwrap().push(request.clone());
        Ok(ProvisionedLicense {
            token: "new-token".into(),
            expiration_date: chrono::DateTime::parse_from_rfc3339("2099-02-01T00:00:00Z")
                .unwrap()
                .into(),
        })
    }
}
