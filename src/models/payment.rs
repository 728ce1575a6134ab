use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::AsRefStr;

/// Status reported by the payment gateway for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Pending,
    Rejected,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approved" => PaymentStatus::Approved,
            "pending" | "in_process" => PaymentStatus::Pending,
            "rejected" => PaymentStatus::Rejected,
            other => PaymentStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Other(s) => s,
        }
    }

    pub fn is_approved(&self) -> bool {
        *self == PaymentStatus::Approved
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PaymentStatus::parse(&String::deserialize(deserializer)?))
    }
}

/// Query string the gateway appends when it sends the customer back.
///
/// Every field is optional: the pages that consume it decide what a missing
/// parameter means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, rename = "productId", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, rename = "licenseId", skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(default, alias = "collection_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PaymentQuery {
    /// Parse a raw query string (`a=1&b=2`, leading `?` allowed).
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            let slot = match key {
                "payment_id" => &mut parsed.payment_id,
                "userId" => &mut parsed.user_id,
                "productId" => &mut parsed.product_id,
                "licenseId" => &mut parsed.license_id,
                "status" | "collection_status" => &mut parsed.status,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        parsed
    }

    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn user_id(&self) -> Option<&str> {
        Self::field(&self.user_id)
    }

    pub fn product_id(&self) -> Option<&str> {
        Self::field(&self.product_id)
    }

    pub fn license_id(&self) -> Option<&str> {
        Self::field(&self.license_id)
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        Self::field(&self.status).map(PaymentStatus::parse)
    }

    /// The payment this query identifies, if `payment_id`, `userId` and
    /// `productId` are all present and non-empty.
    pub fn session(&self) -> Option<PaymentSession> {
        Some(PaymentSession {
            payment_id: Self::field(&self.payment_id)?.to_string(),
            user_id: self.user_id()?.to_string(),
            product_id: self.product_id()?.to_string(),
            status: self.status(),
        })
    }

}

/// A pending or completed gateway payment, identified by its redirect
/// parameters. Lives only as long as the flow that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub payment_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
}

impl PaymentSession {
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("payment_id", self.payment_id.as_str()),
            ("userId", self.user_id.as_str()),
            ("productId", self.product_id.as_str()),
        ];
        if let Some(status) = &self.status {
            pairs.push(("status", status.as_str()));
        }
        pairs
    }
}

/// Which payment-creation endpoint a checkout goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckoutKind {
    Script,
    Launcher,
    Renewal,
}

impl CheckoutKind {
    pub fn create_endpoint(self) -> &'static str {
        match self {
            CheckoutKind::Script => "/payment/create",
            CheckoutKind::Launcher => "/payment/create-launcher",
            CheckoutKind::Renewal => "/payment/create-renew",
        }
    }

    /// API endpoint confirming a returned payment. Renewals are confirmed by
    /// the gateway webhook alone.
    pub fn verify_endpoint(self) -> Option<&'static str> {
        match self {
            CheckoutKind::Script => Some("/dashboard/obrigado"),
            CheckoutKind::Launcher => Some("/dashboard/obrigado-launcher"),
            CheckoutKind::Renewal => None,
        }
    }

    /// Storefront page the gateway returns to on success.
    pub fn success_path(self) -> &'static str {
        match self {
            CheckoutKind::Script => "/dashboard/obrigado",
            CheckoutKind::Launcher => "/dashboard/obrigado-launcher",
            CheckoutKind::Renewal => "/dashboard/obrigado-renovacao",
        }
    }

    /// Storefront page the gateway returns to while the payment is pending.
    pub fn pending_path(self) -> &'static str {
        match self {
            CheckoutKind::Launcher => "/dashboard/pendente-launcher",
            CheckoutKind::Script | CheckoutKind::Renewal => "/dashboard/pendente",
        }
    }
}

/// Body of the `POST /payment/create*` endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    /// Storefront origin the gateway sends the customer back to
    pub return_url: String,
}
