//! Local listener for the storefront pages the payment gateway redirects to.

mod returns;

pub use returns::*;

use std::net::SocketAddr;

use axum::{Json, Router, routing::get};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: ReturnState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard/pendente", get(script_pending))
        .route("/dashboard/pendente-launcher", get(launcher_pending))
        .route("/dashboard/obrigado", get(script_approved))
        .route("/dashboard/obrigado-launcher", get(launcher_approved))
        .route("/dashboard/obrigado-renovacao", get(renewal_approved))
        .route("/dashboard/erro", get(payment_failed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running return listener. Stops when dropped.
#[derive(Debug)]
pub struct ReturnListener {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ReturnListener {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for ReturnListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bind `addr` and serve the return pages, forwarding every hit to `events`.
pub async fn serve(addr: &str, events: mpsc::Sender<ReturnEvent>) -> Result<ReturnListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Internal(format!("Failed to read listener address: {}", e)))?;

    let app = router(ReturnState::new(events));
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Return listener stopped: {}", e);
        }
    });

    tracing::info!("Listening for payment returns on http://{}", addr);
    Ok(ReturnListener { addr, handle })
}
