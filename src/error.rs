/// Failures surfaced by the client.
///
/// `Auth` means the caller has to run the login flow again; the client never
/// retries it. `Connection` covers everything else (timeouts, exhausted rate
/// limit retries, unexpected statuses) and may be retried later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("connection error: {0}")]
    Connection(String),
}

impl Error {
    pub(crate) fn auth(msg: impl Into<String>) -> Self {
        Error::Auth(msg.into())
    }

    pub(crate) fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    pub(crate) fn status(status: reqwest::StatusCode) -> Self {
        Error::Connection(format!("HTTP error: {}", status.as_u16()))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::connection("timeout")
        } else if let Some(status) = e.status() {
            Error::status(status)
        } else {
            Error::connection(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Connection(format!("IO error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
