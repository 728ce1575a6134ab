//! Client-local session slots: the bearer token and the display language.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};

use crate::storage::{StorageAdapter, keys};

/// Display language preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    Pt,
    En,
    Es,
}

impl Language {
    /// Pick a language from a locale string such as `pt_BR.UTF-8` or `en-US`.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let prefix = locale.split(['-', '_', '.']).next()?;
        prefix.parse().ok()
    }
}

#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn StorageAdapter>,
}

impl Session {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// The stored bearer token.
    ///
    /// A JWT whose `exp` has passed is purged and treated as absent.
    pub fn token(&self) -> Option<String> {
        let token = self.storage.get(keys::TOKEN)?;
        if jwt_expired(&token, chrono::Utc::now().timestamp()) {
            tracing::info!("Stored token has expired, removing it");
            self.clear_token();
            return None;
        }
        Some(token)
    }

    pub fn store_token(&self, token: &str) {
        self.storage.set(keys::TOKEN, token);
    }

    pub fn clear_token(&self) {
        self.storage.remove(keys::TOKEN);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stored language, else the process locale, else Portuguese.
    pub fn language(&self) -> Language {
        if let Some(lang) = self
            .storage
            .get(keys::LANGUAGE)
            .and_then(|v| v.parse::<Language>().ok())
        {
            return lang;
        }

        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|locale| Language::from_locale(&locale))
            .unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) {
        self.storage.set(keys::LANGUAGE, language.as_ref());
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.storage.get(keys::TOKEN).is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<f64>,
}

/// Whether `token` is a JWT that expired before `now` (Unix seconds).
///
/// The signature is not checked; the API remains the authority. Tokens that do
/// not decode as a JWT are never considered expired.
fn jwt_expired(token: &str, now: i64) -> bool {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()
        .and_then(|bytes| serde_json::from_slice::<ExpiryClaim>(&bytes).ok())
        .and_then(|claims| claims.exp)
        .map(|exp| (exp as i64) < now)
        .unwrap_or(false)
}
