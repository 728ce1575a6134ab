use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::util::api_date;

/// Licenses expiring within this many days are flagged on the dashboard.
pub const EXPIRING_SOON_DAYS: i64 = 7;

/// A launcher license bound to a customer domain.
///
/// The API also sends a `status` field; it is deliberately not modelled.
/// Status is always derived from `expiration_date` via [`License::status_at`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub token: String,
    pub domain: String,
    #[serde(with = "api_date")]
    pub expiration_date: DateTime<Utc>,
    #[serde(default)]
    pub theme_url: String,
    #[serde(default)]
    pub update_url: String,
    #[serde(default)]
    pub downloader: FeatureFlag,
    #[serde(default)]
    pub dashboard: FeatureFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFlag {
    Active,
    #[default]
    Disabled,
}

impl FeatureFlag {
    pub fn is_active(self) -> bool {
        self == FeatureFlag::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Active,
    Expired,
}

/// Traffic-light state used by the dashboard's recent activity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseHealth {
    Healthy,
    ExpiringSoon,
    Expired,
}

impl LicenseHealth {
    pub fn label(self) -> &'static str {
        match self {
            LicenseHealth::Healthy => "License active",
            LicenseHealth::ExpiringSoon => "Expires soon",
            LicenseHealth::Expired => "License expired",
        }
    }
}

impl License {
    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.expiration_date < now {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Active
        }
    }

    pub fn status(&self) -> LicenseStatus {
        self.status_at(Utc::now())
    }

    pub fn health_at(&self, now: DateTime<Utc>) -> LicenseHealth {
        if self.expiration_date < now {
            LicenseHealth::Expired
        } else if self.expiration_date < now + Duration::days(EXPIRING_SOON_DAYS) {
            LicenseHealth::ExpiringSoon
        } else {
            LicenseHealth::Healthy
        }
    }
}

/// Body of `POST /buy/license`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub domain: String,
    pub theme_url: String,
    pub update_url: String,
}

/// Body of `PUT /launcher/:token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLicense {
    pub domain: String,
    pub theme_url: String,
    pub update_url: String,
}

/// What the API returns once a license has been created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedLicense {
    pub token: String,
    #[serde(with = "api_date")]
    pub expiration_date: DateTime<Utc>,
}
