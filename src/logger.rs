use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::diff::diff_json;

const REDACTED: &str = "***";
const SENSITIVE_KEYS: &[&str] = &["password", "access", "refresh"];

/// How response bodies are written to the traffic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLogMode {
    /// Every response body in full.
    Full,
    /// First response per path in full, later ones as change lists.
    Diffed,
}

/// NDJSON capture of API traffic. Credentials and tokens are redacted.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous: HashMap<String, Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: HashMap::new(),
        })
    }

    pub fn log_request(&mut self, id: Uuid, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "id": id.to_string(),
            "method": method,
            "path": path,
            "body": body.map(redact),
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, id: Uuid, path: &str, status: u16, body: &Value) {
        let body = redact(body);
        let mut entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "id": id.to_string(),
            "path": path,
            "status": status,
        });

        match self.mode {
            MessageLogMode::Full => {
                entry["body"] = body;
            }
            MessageLogMode::Diffed => match self.previous.get(path) {
                None => {
                    entry["full"] = json!(true);
                    entry["body"] = body.clone();
                    self.previous.insert(path.to_string(), body);
                }
                Some(prev) => {
                    let mut changes = Vec::new();
                    diff_json(prev, &body, "", &mut changes);
                    entry["changes"] = changes
                        .into_iter()
                        .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                        .collect();
                    self.previous.insert(path.to_string(), body);
                }
            },
        }
        self.write_line(&entry);
    }

    pub fn log_failure(&mut self, id: Uuid, path: &str, attempt: u32, reason: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "fail",
            "id": id.to_string(),
            "path": path,
            "attempt": attempt,
            "reason": reason,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write traffic log entry: {e}");
        }
    }
}

fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let v = if SENSITIVE_KEYS.contains(&k.as_str()) && !v.is_object() {
                    json!(REDACTED)
                } else {
                    redact(v)
                };
                (k.clone(), v)
            })
            .collect(),
        Value::Array(items) => items.iter().map(redact).collect(),
        other => other.clone(),
    }
}
