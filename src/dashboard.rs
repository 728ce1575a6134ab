//! Account dashboard view models. Every status is derived from the
//! expiration date at build time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Counts, FeatureFlag, License, LicenseHealth, LicenseStatus, User};

/// Number of licenses listed under recent activity.
const RECENT_ACTIVITY_LEN: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub name: String,
    pub total_licenses: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    /// Expiration of the first expired license, for the "expired since" hint
    pub first_expired_at: Option<DateTime<Utc>>,
    pub total_products: u32,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub token: String,
    pub expiration_date: DateTime<Utc>,
    pub health: LicenseHealth,
}

impl DashboardSummary {
    pub fn build(user: &User, counts: &Counts, now: DateTime<Utc>) -> Self {
        let healths: Vec<LicenseHealth> = user.licenses.iter().map(|l| l.health_at(now)).collect();

        let first_expired_at = user
            .licenses
            .iter()
            .zip(&healths)
            .find(|(_, h)| **h == LicenseHealth::Expired)
            .map(|(l, _)| l.expiration_date);

        let mut by_expiration: Vec<&License> = user.licenses.iter().collect();
        by_expiration.sort_by(|a, b| b.expiration_date.cmp(&a.expiration_date));

        let recent_activity = by_expiration
            .into_iter()
            .take(RECENT_ACTIVITY_LEN)
            .map(|l| ActivityEntry {
                token: l.token.clone(),
                expiration_date: l.expiration_date,
                health: l.health_at(now),
            })
            .collect();

        Self {
            name: user.name.clone(),
            total_licenses: user.licenses.len(),
            expiring_soon: healths.iter().filter(|h| **h == LicenseHealth::ExpiringSoon).count(),
            expired: healths.iter().filter(|h| **h == LicenseHealth::Expired).count(),
            first_expired_at,
            total_products: counts.total_count,
            recent_activity,
        }
    }
}

/// One row of the launcher licenses page.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseView {
    pub id: String,
    pub token: String,
    pub domain: String,
    pub expiration_date: DateTime<Utc>,
    pub status: LicenseStatus,
    pub downloader: FeatureFlag,
    pub dashboard: FeatureFlag,
}

impl LicenseView {
    pub fn from_license(license: &License, now: DateTime<Utc>) -> Self {
        Self {
            id: license.id.clone(),
            token: license.token.clone(),
            domain: license.domain.clone(),
            expiration_date: license.expiration_date,
            status: license.status_at(now),
            downloader: license.downloader,
            dashboard: license.dashboard,
        }
    }

    pub fn list(licenses: &[License], now: DateTime<Utc>) -> Vec<Self> {
        licenses.iter().map(|l| Self::from_license(l, now)).collect()
    }
}
