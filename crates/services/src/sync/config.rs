use std::env;
use std::time::Duration;

use url::Url;

/// Delay between the last local change and the upload it triggers.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1200;

/// Connection settings for the hosted backend.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub base_url: Url,
    pub api_key: String,
    pub debounce: Duration,
}

impl SyncConfig {
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Read sync settings from the environment.
    ///
    /// Returns `None` when `THEORY_SYNC_URL` or `THEORY_SYNC_API_KEY` is
    /// missing or unusable; the app then runs purely on local storage.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("THEORY_SYNC_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let raw_url = env::var("THEORY_SYNC_URL").ok()?;
        let base_url = match Url::parse(&raw_url) {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(%raw_url, %error, "ignoring invalid THEORY_SYNC_URL");
                return None;
            }
        };
        let debounce = env::var("THEORY_SYNC_DEBOUNCE_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or(Duration::from_millis(DEFAULT_DEBOUNCE_MS), Duration::from_millis);

        Some(Self {
            base_url,
            api_key,
            debounce,
        })
    }
}
