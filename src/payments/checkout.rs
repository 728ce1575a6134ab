use crate::api::ApiClient;
use crate::error::{AppError, Result};
use crate::models::{CheckoutKind, CreatePayment, License, Product};

/// A created gateway checkout the customer must be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub kind: CheckoutKind,
    /// Gateway checkout URL (`init_point`)
    pub init_point: String,
}

/// Start a purchase of `product`. Launchers and scripts go through different
/// payment endpoints.
pub async fn start_purchase(client: &ApiClient, product: &Product, return_url: &str) -> Result<Checkout> {
    let kind = product.checkout_kind();
    let request = CreatePayment {
        product_id: Some(product.id.clone()),
        license_id: None,
        return_url: return_url.to_string(),
    };

    let init_point = client.create_payment(kind, &request).await?;
    tracing::info!(product_id = %product.id, kind = kind.as_ref(), "Checkout created");

    Ok(Checkout { kind, init_point })
}

/// Start a renewal of `license`. The API extends it by 30 days once the
/// gateway approves the payment.
pub async fn start_renewal(client: &ApiClient, license: &License, return_url: &str) -> Result<Checkout> {
    if license.id.is_empty() {
        return Err(AppError::BadRequest("License has no id".into()));
    }

    let request = CreatePayment {
        product_id: None,
        license_id: Some(license.id.clone()),
        return_url: return_url.to_string(),
    };

    let init_point = client.create_payment(CheckoutKind::Renewal, &request).await?;
    tracing::info!(license_id = %license.id, "Renewal checkout created");

    Ok(Checkout {
        kind: CheckoutKind::Renewal,
        init_point,
    })
}
