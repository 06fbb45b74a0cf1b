use std::time::Duration;

use super::auth::Credentials;
use crate::error::{Error, Result};

/// Upper bound on virtual users per tier; one tokio task each.
const MAX_CONCURRENCY: u64 = 100_000;

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub login_path: String,
    /// JSON field holding the bearer token in the login response.
    pub token_field: String,
    /// Concurrency levels, run in order.
    pub tiers: Vec<u64>,
    pub tier_duration: Duration,
    /// Pause after every request of a virtual user. Zero is valid.
    pub request_delay: Duration,
    /// Pause between two consecutive tiers.
    pub settle_pause: Duration,
    pub request_timeout: Option<Duration>,
}

impl LoadConfig {
    pub const DEFAULT_TIERS: &'static [u64] = &[1, 5, 10, 20, 50];
    pub const DEFAULT_TIER_DURATION: Duration = Duration::from_secs(30);
    pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_SETTLE_PAUSE: Duration = Duration::from_secs(2);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_LOGIN_PATH: &'static str = "/api/auth/login";
    pub const DEFAULT_TOKEN_FIELD: &'static str = "token";

    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
            token_field: Self::DEFAULT_TOKEN_FIELD.to_string(),
            tiers: Self::DEFAULT_TIERS.to_vec(),
            tier_duration: Self::DEFAULT_TIER_DURATION,
            request_delay: Self::DEFAULT_REQUEST_DELAY,
            settle_pause: Self::DEFAULT_SETTLE_PAUSE,
            request_timeout: Some(Self::DEFAULT_REQUEST_TIMEOUT),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() || self.tiers.iter().any(|&c| c == 0 || c > MAX_CONCURRENCY) {
            return Err(Error::InvalidTiers);
        }
        if self.tier_duration.is_zero() {
            return Err(Error::InvalidDuration);
        }

        let parsed = url::Url::parse(&self.base_url)
            .map_err(|_| Error::InvalidBaseUrl(self.base_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(Error::InvalidBaseUrl(self.base_url.clone()));
        }

        Ok(())
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }
}
