mod client;

pub use client::*;

use serde::Deserialize;

/// Page the storefront must move to as a side effect of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
}

impl Navigation {
    pub fn path(self) -> &'static str {
        match self {
            Navigation::Login => "/login",
        }
    }
}

/// `{ success, data, message }` wrapper most endpoints answer with.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> crate::error::Result<T> {
        if self.success == Some(false) {
            return Err(crate::error::AppError::BadRequest(
                self.message.unwrap_or_else(|| "Request was not accepted".into()),
            ));
        }
        self.data
            .ok_or_else(|| crate::error::AppError::Internal("Response carried no data".into()))
    }

    /// For endpoints whose only payload is the success flag.
    pub fn into_ack(self) -> crate::error::Result<()> {
        if self.success == Some(false) {
            return Err(crate::error::AppError::BadRequest(
                self.message.unwrap_or_else(|| "Request was not accepted".into()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainCheckResponse {
    #[serde(default)]
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckoutResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub init_point: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentStatusResponse {
    pub status: crate::models::PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
