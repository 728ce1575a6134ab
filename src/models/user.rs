use serde::{Deserialize, Serialize};

use crate::models::{License, LicenseStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub licenses: Vec<License>,
    /// Purchased scripts
    #[serde(default, rename = "licenseScript", alias = "scripts")]
    pub scripts: Vec<ScriptLicense>,
}

/// A purchased downloadable script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLicense {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub product_name: String,
    #[serde(default)]
    pub download_link: Option<String>,
    #[serde(default)]
    pub status: LicenseStatus,
}

/// Per-user purchase counters from `GET /users/counts`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    #[serde(default)]
    pub launcher_count: u32,
    #[serde(default)]
    pub script_count: u32,
    #[serde(default)]
    pub total_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}
