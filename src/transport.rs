use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::{Error, Result};

pub const APP_VERSION_HEADER: &str = "x-app-version";

/// A completed exchange. The body is decoded only for 2xx responses; any
/// other status carries an empty object.
#[derive(Debug)]
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

/// Result of a single HTTP attempt. Timeouts, whether waiting for the headers
/// or reading the body, are kept apart from other failures because they are
/// retried.
#[derive(Debug)]
pub(crate) enum Attempt {
    Response(Reply),
    TimedOut,
}

/// Shared HTTP session. Built once per client and reused for every call.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let version = HeaderValue::from_str(&config.app_version)
            .map_err(|e| Error::connection(format!("invalid app version header: {e}")))?;
        headers.insert(APP_VERSION_HEADER, version);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<Attempt> {
        let mut req = self.http.request(method, url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Ok(Attempt::TimedOut),
            Err(e) => return Err(Error::connection(format!("request failed: {e}"))),
        };

        let status = resp.status();
        if !status.is_success() {
            return Ok(Attempt::Response(Reply {
                status,
                body: Value::Object(Map::new()),
            }));
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => return Ok(Attempt::TimedOut),
            Err(e) => return Err(Error::connection(format!("failed to read response body: {e}"))),
        };
        let body = decode_body(is_json, &bytes)?;
        Ok(Attempt::Response(Reply { status, body }))
    }
}

/// Non-JSON or blank bodies become `{}`.
fn decode_body(is_json: bool, bytes: &[u8]) -> Result<Value> {
    if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| Error::connection(format!("invalid response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_or_non_json_bodies_decode_to_empty_object() {
        assert_eq!(decode_body(true, b"").unwrap(), json!({}));
        assert_eq!(decode_body(true, b" \n").unwrap(), json!({}));
        assert_eq!(decode_body(false, b"OK").unwrap(), json!({}));
        assert_eq!(decode_body(true, br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn malformed_json_is_connection_error() {
        let err = decode_body(true, b"{\"a\":").unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("invalid response body"));
    }
}
