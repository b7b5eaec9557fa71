use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://app-prod.kumocloud.com";
pub const DEFAULT_API_VERSION: &str = "v3";
pub const DEFAULT_APP_VERSION: &str = "3.0.3";

/// Backoff policy for 429 responses and request timeouts.
///
/// A 429 on attempt `n` (zero based) sleeps `initial_backoff * 2^n` before the
/// next attempt. Timeouts retry immediately. Both share `max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to sleep after a 429 on `attempt`, or `None` when it was the last one.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        Some(self.initial_backoff.saturating_mul(1u32 << attempt.min(16)))
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(60),
        }
    }
}

/// Endpoint and timing settings. Defaults match the production backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_version: String,
    pub app_version: String,
    /// Lifetime assumed for a freshly issued access token.
    pub token_ttl: Duration,
    /// Refresh this long before the assumed expiry.
    pub token_expiry_margin: Duration,
    pub min_request_interval: Duration,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            endpoint
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            token_ttl: Duration::from_secs(1200),
            token_expiry_margin: Duration::from_secs(300),
            min_request_interval: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(45),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_stops_on_last_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Some(Duration::from_secs(60)));
        assert_eq!(policy.backoff(1), Some(Duration::from_secs(120)));
        assert_eq!(policy.backoff(2), None);
    }

    #[test]
    fn single_attempt_never_backs_off() {
        let policy = RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(0), None);
        assert!(!policy.has_attempts_left(0));
    }

    #[test]
    fn url_joins_prefix() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8080/".into(),
            ..Default::default()
        };
        assert_eq!(config.url("/sites/"), "http://127.0.0.1:8080/v3/sites/");
        assert_eq!(
            ClientConfig::default().url("/login"),
            "https://app-prod.kumocloud.com/v3/login"
        );
    }
}
