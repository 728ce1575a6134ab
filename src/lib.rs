//! Customer-side core of the PZ storefront: catalog, account dashboard,
//! checkout through the payment gateway and launcher license provisioning,
//! all backed by the storefront REST API.

pub mod api;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod flows;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod session;
pub mod storage;
pub mod util;
