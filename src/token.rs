use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Access/refresh token pair as issued by the login and refresh endpoints.
#[derive(Debug)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: SecretString::from(refresh.into()),
        }
    }

    fn duplicate(&self) -> Self {
        Self::new(
            self.access.expose_secret().to_owned(),
            self.refresh.expose_secret().to_owned(),
        )
    }
}

/// Current credentials. Every setter replaces tokens and expiry together.
#[derive(Debug, Default)]
pub(crate) struct TokenStore {
    username: Option<String>,
    tokens: Option<TokenPair>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenStore {
    pub fn set_from_login(&mut self, username: &str, tokens: TokenPair, ttl: Duration) {
        self.username = Some(username.to_string());
        self.tokens = Some(tokens);
        self.expires_at = Some(after(Utc::now(), ttl));
    }

    pub fn set_from_refresh(&mut self, tokens: TokenPair, ttl: Duration) {
        self.tokens = Some(tokens);
        self.expires_at = Some(after(Utc::now(), ttl));
    }

    /// Tokens persisted by the caller from an earlier session. Their real
    /// expiry is unknown, so they are treated as already due for refresh.
    pub fn set_from_restore(&mut self, username: &str, tokens: TokenPair) {
        self.username = Some(username.to_string());
        self.tokens = Some(tokens);
        self.expires_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.tokens = None;
        self.expires_at = None;
    }

    pub fn has_token(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn is_near_expiry(&self, margin: Duration) -> bool {
        self.is_near_expiry_at(Utc::now(), margin)
    }

    pub fn is_near_expiry_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => after(now, margin) >= expires_at,
            None => false,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access.expose_secret())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh.expose_secret())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn snapshot(&self) -> Option<TokenPair> {
        self.tokens.as_ref().map(TokenPair::duplicate)
    }
}

fn after(t: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(d)
        .ok()
        .and_then(|delta| t.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_token_and_never_expires() {
        let store = TokenStore::default();
        assert!(!store.has_token());
        assert!(!store.is_near_expiry(Duration::from_secs(300)));
        assert!(store.access_token().is_none());
    }

    #[test]
    fn login_sets_token_and_expiry_together() {
        let mut store = TokenStore::default();
        store.set_from_login("me@example.com", TokenPair::new("a1", "r1"), Duration::from_secs(1200));
        assert!(store.has_token());
        assert!(store.expires_at().is_some());
        assert_eq!(store.username(), Some("me@example.com"));
        assert_eq!(store.access_token(), Some("a1"));
        assert_eq!(store.refresh_token(), Some("r1"));
    }

    #[test]
    fn near_expiry_uses_margin() {
        let mut store = TokenStore::default();
        store.set_from_login("u", TokenPair::new("a", "r"), Duration::from_secs(1200));
        let expires = store.expires_at().unwrap();

        let early = expires - TimeDelta::seconds(600);
        assert!(!store.is_near_expiry_at(early, Duration::from_secs(300)));

        let late = expires - TimeDelta::seconds(200);
        assert!(store.is_near_expiry_at(late, Duration::from_secs(300)));

        let exact = expires - TimeDelta::seconds(300);
        assert!(store.is_near_expiry_at(exact, Duration::from_secs(300)));
    }

    #[test]
    fn refresh_replaces_pair_and_keeps_username() {
        let mut store = TokenStore::default();
        store.set_from_login("u", TokenPair::new("a1", "r1"), Duration::from_secs(0));
        store.set_from_refresh(TokenPair::new("a2", "r2"), Duration::from_secs(1200));
        assert_eq!(store.access_token(), Some("a2"));
        assert_eq!(store.refresh_token(), Some("r2"));
        assert_eq!(store.username(), Some("u"));
        assert!(!store.is_near_expiry(Duration::from_secs(300)));
    }

    #[test]
    fn restored_tokens_are_due_for_refresh() {
        let mut store = TokenStore::default();
        store.set_from_restore("u", TokenPair::new("a", "r"));
        assert!(store.has_token());
        assert!(store.is_near_expiry(Duration::ZERO));
    }

    #[test]
    fn clear_drops_tokens() {
        let mut store = TokenStore::default();
        store.set_from_login("u", TokenPair::new("a", "r"), Duration::from_secs(60));
        store.clear();
        assert!(!store.has_token());
        assert!(store.expires_at().is_none());
        assert!(store.snapshot().is_none());
    }
}
