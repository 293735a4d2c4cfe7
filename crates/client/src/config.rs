use std::time::Duration;

use pinmap_shared::models::MARKER_NAMESPACE;

use crate::location::WatchOptions;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Client settings. The defaults describe the stock app.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub namespace: String,
    pub tracking: WatchOptions,
    /// `None` leaves remote calls without a deadline.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            namespace: MARKER_NAMESPACE.to_string(),
            tracking: WatchOptions::default(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the backend URL taken from `PINMAP_API_URL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ClientConfig::default();
        if let Some(url) = lookup("PINMAP_API_URL").filter(|u| !u.trim().is_empty()) {
            config.api_url = url;
        }
        config
    }
}
