use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::command::{Command, payload};
use crate::config::{ClientConfig, RetryPolicy};
use crate::gate::RequestGate;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::token::{TokenPair, TokenStore};
use crate::transport::{Attempt, Reply, Transport};
use crate::{Error, Result};

#[derive(Deserialize)]
struct RawTokens {
    access: String,
    refresh: String,
}

#[derive(Deserialize)]
struct LoginTokens {
    token: RawTokens,
}

impl From<RawTokens> for TokenPair {
    fn from(raw: RawTokens) -> Self {
        TokenPair::new(raw.access, raw.refresh)
    }
}

pub struct KumoClientBuilder {
    config: ClientConfig,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl KumoClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app_version = version.into();
        self
    }

    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.config.token_ttl = ttl;
        self
    }

    pub fn token_expiry_margin(mut self, margin: Duration) -> Self {
        self.config.token_expiry_margin = margin;
        self
    }

    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.config.min_request_interval = interval;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<KumoClient> {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(KumoClient {
            inner: Mutex::new(Inner {
                tokens: TokenStore::default(),
                gate: RequestGate::new(self.config.min_request_interval),
                transport: None,
                logger,
                closed: false,
            }),
            config: self.config,
        })
    }
}

impl Default for KumoClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that must change together under the client lock.
struct Inner {
    tokens: TokenStore,
    gate: RequestGate,
    transport: Option<Transport>,
    logger: Option<MessageLogger>,
    closed: bool,
}

/// Kumo Cloud API client.
///
/// All outbound traffic (login, refresh, authenticated calls) runs under one
/// lock, so at most one request is in flight at a time, including while a
/// rate-limited call is backing off. Dropping a pending future releases the
/// lock. Share one instance per account behind an `Arc`.
pub struct KumoClient {
    config: ClientConfig,
    inner: Mutex<Inner>,
}

impl KumoClient {
    pub fn builder() -> KumoClientBuilder {
        KumoClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Logs in and stores the issued tokens. Returns the full account payload.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Value> {
        let mut inner = self.lock().await?;
        inner.gate.acquire().await;

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
            "appVersion": self.config.app_version,
        });
        debug!(username, "logging in");
        // A new login supersedes whatever session was held before.
        inner.tokens.clear();
        let (id, reply) = inner
            .send(&self.config, Method::POST, "/login", Some(&body), None, None)
            .await?;

        let status = reply.status;
        if status == StatusCode::FORBIDDEN {
            inner.log_failure(id, "/login", 0, "invalid credentials");
            return Err(Error::auth("invalid credentials"));
        }
        if !status.is_success() {
            inner.log_failure(id, "/login", 0, status.as_str());
            return Err(Error::status(status));
        }

        let result = inner.finish(id, "/login", reply);
        let tokens: LoginTokens = serde_json::from_value(result.clone())
            .map_err(|e| Error::connection(format!("invalid login response: {e}")))?;
        inner
            .tokens
            .set_from_login(username, tokens.token.into(), self.config.token_ttl);
        inner.gate.record_completion();
        debug!(username, "login successful");
        Ok(result)
    }

    /// Exchanges the refresh token for a new token pair.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let mut inner = self.lock().await?;
        inner.gate.acquire().await;
        inner.refresh(&self.config).await?;
        inner.gate.record_completion();
        Ok(())
    }

    /// Reinstates tokens persisted from an earlier session. They are refreshed
    /// before the next request.
    pub async fn restore_session(&self, username: &str, tokens: TokenPair) {
        self.inner.lock().await.tokens.set_from_restore(username, tokens);
    }

    pub async fn username(&self) -> Option<String> {
        self.inner.lock().await.tokens.username().map(str::to_string)
    }

    pub async fn has_token(&self) -> bool {
        self.inner.lock().await.tokens.has_token()
    }

    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.tokens.expires_at()
    }

    /// Current token pair, for the caller to persist.
    pub async fn tokens(&self) -> Option<TokenPair> {
        self.inner.lock().await.tokens.snapshot()
    }

    /// Authenticated, rate limited, retried request against `endpoint`
    /// (relative to the versioned API prefix).
    pub async fn request(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        let mut inner = self.lock().await?;
        inner.gate.acquire().await;

        if !inner.tokens.has_token() {
            return Err(Error::auth("no access token available"));
        }
        if inner.tokens.is_near_expiry(self.config.token_expiry_margin) {
            inner.refresh(&self.config).await?;
        }
        let access = inner
            .tokens
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| Error::auth("no access token available"))?;

        let (id, reply) = inner
            .send(&self.config, method, endpoint, body, Some(access.as_str()), Some(&self.config.retry))
            .await?;

        let status = reply.status;
        if status == StatusCode::UNAUTHORIZED {
            inner.log_failure(id, endpoint, 0, "unauthorized");
            return Err(Error::auth("authentication failed"));
        }
        if !status.is_success() {
            inner.log_failure(id, endpoint, 0, status.as_str());
            return Err(Error::status(status));
        }

        let value = inner.finish(id, endpoint, reply);
        inner.gate.record_completion();
        Ok(value)
    }

    pub async fn get_account_info(&self) -> Result<Value> {
        self.request(Method::GET, "/accounts/me", None).await
    }

    pub async fn get_sites(&self) -> Result<Value> {
        self.request(Method::GET, "/sites/", None).await
    }

    pub async fn get_zones(&self, site_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/sites/{site_id}/zones"), None)
            .await
    }

    pub async fn get_device_details(&self, serial: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/devices/{serial}"), None)
            .await
    }

    pub async fn get_device_profile(&self, serial: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/devices/{serial}/profile"), None)
            .await
    }

    pub async fn send_command(&self, serial: &str, commands: &Command) -> Result<Value> {
        debug!(serial, ?commands, "sending command");
        let body = payload(serial, commands);
        self.request(Method::POST, "/devices/send-command", Some(&body))
            .await
    }

    /// Sends `commands`, then returns fresh device details so the caller can
    /// replace its device snapshot.
    pub async fn send_command_and_refresh(&self, serial: &str, commands: &Command) -> Result<Value> {
        self.send_command(serial, commands).await?;
        self.get_device_details(serial).await
    }

    /// Drops the HTTP session. Later calls fail with a connection error.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.transport = None;
        inner.closed = true;
        debug!("client closed");
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(Error::connection("client closed"));
        }
        Ok(inner)
    }
}

impl Inner {
    fn transport(&mut self, config: &ClientConfig) -> Result<Transport> {
        if let Some(transport) = &self.transport {
            return Ok(transport.clone());
        }
        let transport = Transport::new(config)?;
        self.transport = Some(transport.clone());
        Ok(transport)
    }

    /// Refresh while already holding the lock.
    async fn refresh(&mut self, config: &ClientConfig) -> Result<()> {
        let refresh = self
            .tokens
            .refresh_token()
            .map(str::to_string)
            .ok_or_else(|| Error::auth("no refresh token available"))?;
        debug!("refreshing access token");

        let body = json!({ "refresh": refresh });
        let (id, reply) = self
            .send(config, Method::POST, "/refresh", Some(&body), None, Some(&config.retry))
            .await?;

        let status = reply.status;
        if status == StatusCode::UNAUTHORIZED {
            self.log_failure(id, "/refresh", 0, "refresh token expired");
            return Err(Error::auth("refresh token expired"));
        }
        if !status.is_success() {
            self.log_failure(id, "/refresh", 0, status.as_str());
            return Err(Error::status(status));
        }

        let result = self.finish(id, "/refresh", reply);
        let tokens: RawTokens = serde_json::from_value(result)
            .map_err(|e| Error::connection(format!("invalid refresh response: {e}")))?;
        self.tokens.set_from_refresh(tokens.into(), config.token_ttl);
        debug!("access token refreshed");
        Ok(())
    }

    /// Sends one logical call. With a retry policy, 429s back off and
    /// timeouts retry immediately until the policy runs out; without one a
    /// single attempt is made. Any other response is returned as is.
    async fn send(
        &mut self,
        config: &ClientConfig,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
        retry: Option<&RetryPolicy>,
    ) -> Result<(Uuid, Reply)> {
        let transport = self.transport(config)?;
        let url = config.url(endpoint);
        let id = Uuid::new_v4();
        let mut attempt = 0;

        loop {
            if let Some(logger) = self.logger.as_mut() {
                logger.log_request(id, method.as_str(), endpoint, body);
            }
            debug!(%method, endpoint, attempt = attempt + 1, "sending request");
            let outcome = transport.send_once(method.clone(), &url, body, bearer).await?;

            let Some(policy) = retry else {
                return match outcome {
                    Attempt::Response(reply) => Ok((id, reply)),
                    Attempt::TimedOut => {
                        self.log_failure(id, endpoint, attempt, "timeout");
                        Err(Error::connection("timeout"))
                    }
                };
            };

            match outcome {
                Attempt::Response(reply) if reply.status == StatusCode::TOO_MANY_REQUESTS => {
                    self.log_failure(id, endpoint, attempt, "rate limited");
                    let Some(delay) = policy.backoff(attempt) else {
                        warn!(endpoint, attempts = policy.max_attempts, "rate limit retries exhausted");
                        return Err(Error::connection("rate limit exceeded"));
                    };
                    warn!(
                        endpoint,
                        delay_secs = delay.as_secs(),
                        retry = attempt + 1,
                        max_attempts = policy.max_attempts,
                        "rate limited (429), backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::Response(reply) => return Ok((id, reply)),
                Attempt::TimedOut => {
                    self.log_failure(id, endpoint, attempt, "timeout");
                    if !policy.has_attempts_left(attempt) {
                        return Err(Error::connection("timeout"));
                    }
                    warn!(
                        endpoint,
                        retry = attempt + 1,
                        max_attempts = policy.max_attempts,
                        "request timeout, retrying"
                    );
                }
            }
            attempt += 1;
        }
    }

    fn finish(&mut self, id: Uuid, endpoint: &str, reply: Reply) -> Value {
        let status = reply.status.as_u16();
        trace!(endpoint, status, body = %reply.body, "response");
        if let Some(logger) = self.logger.as_mut() {
            logger.log_response(id, endpoint, status, &reply.body);
        }
        reply.body
    }

    fn log_failure(&mut self, id: Uuid, endpoint: &str, attempt: u32, reason: &str) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log_failure(id, endpoint, attempt + 1, reason);
        }
    }
}
