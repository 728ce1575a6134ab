use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://apisite.pzdev.com.br/api";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the storefront REST API, e.g. `https://host/api`
    pub api_url: String,
    /// Origin that relative product image paths are served from
    pub asset_url: String,
    pub listen_host: String,
    pub listen_port: u16,
    /// Delay between payment-status requests while a payment is pending
    pub poll_interval: Duration,
    /// Quiet period before the duplicate-domain check fires
    pub domain_debounce: Duration,
    /// Directory holding the session file (None = platform default)
    pub data_dir: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_url = env::var("PZSTORE_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let asset_url = env::var("PZSTORE_ASSET_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| asset_origin(&api_url));

        Self {
            asset_url,
            api_url,
            listen_host: env::var("PZSTORE_LISTEN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            listen_port: parse_or("PZSTORE_LISTEN_PORT", 4780),
            poll_interval: Duration::from_secs(parse_nonzero_or("PZSTORE_POLL_INTERVAL_SECS", 10)),
            domain_debounce: Duration::from_millis(parse_or("PZSTORE_DOMAIN_DEBOUNCE_MS", 500)),
            data_dir: env::var("PZSTORE_DATA_DIR").ok().map(PathBuf::from),
            http_timeout: Duration::from_secs(parse_nonzero_or("PZSTORE_HTTP_TIMEOUT_SECS", 15)),
        }
    }

    /// Configuration pointing at a specific API, with defaults for the rest.
    pub fn for_api(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            asset_url: asset_origin(&api_url),
            api_url,
            listen_host: "127.0.0.1".to_string(),
            listen_port: 4780,
            poll_interval: Duration::from_secs(10),
            domain_debounce: Duration::from_millis(500),
            data_dir: None,
            http_timeout: Duration::from_secs(15),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

/// Strip a trailing `/api` segment, leaving the host the assets live on.
fn asset_origin(api_url: &str) -> String {
    api_url
        .strip_suffix("/api")
        .unwrap_or(api_url)
        .to_string()
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    parse_setting(key, env::var(key).ok().as_deref(), default, |_| true)
}

/// Like `parse_or`, for settings where zero would stall a timer.
fn parse_nonzero_or(key: &str, default: u64) -> u64 {
    parse_setting(key, env::var(key).ok().as_deref(), default, |v| *v > 0)
}

fn parse_setting<T: FromStr + Copy + std::fmt::Display>(
    key: &str,
    raw: Option<&str>,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) if accept(&value) => value,
        _ => {
            tracing::warn!("Invalid {key} value {raw:?}, using default: {default}");
            default
        }
    }
}
