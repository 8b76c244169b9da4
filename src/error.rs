use std::fmt;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum MarvelError {
    /// The API rejected the credentials or the signature (401/403).
    #[error("authentication error (http {status}): {body}")]
    Auth { status: u16, body: String },
    /// The API throttled the caller (429). Never retried.
    #[error("rate limited (http 429): {body}")]
    RateLimited {
        /// Value of the `Retry-After` header in seconds, when present.
        retry_after: Option<u64>,
        body: String,
    },
    /// Any other non-success status that retrying cannot fix.
    #[error("client error (http {status}): {body}")]
    Client { status: u16, body: String },
    /// 5xx response, returned once retries are exhausted.
    #[error("server error (http {status}) after {attempts} attempt(s): {body}")]
    Server {
        status: u16,
        body: String,
        attempts: u32,
    },
    /// Connection failure or timeout, returned once retries are exhausted
    /// or immediately when the cause is not transient.
    #[error("network error after {attempts} attempt(s): {source}")]
    Network {
        #[source]
        source: NetworkError,
        attempts: u32,
    },
    /// Response body does not match the expected shape.
    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },
    /// Request issued after [`MarvelClient::close`](crate::MarvelClient::close).
    #[error("client is closed")]
    ClientClosed,
    /// The caller's cancellation token fired while the request was in flight.
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
    /// Invalid credentials, base URL or HTTP stack setup.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Discriminant of [`MarvelError`] without the payload.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Client,
    Server,
    Network,
    Deserialization,
    ClientClosed,
    Cancelled,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::Client => "client",
            Self::Server => "server",
            Self::Network => "network",
            Self::Deserialization => "deserialization",
            Self::ClientClosed => "client_closed",
            Self::Cancelled => "cancelled",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

impl MarvelError {
    /// Classifies a non-success status into the matching error.
    ///
    /// `attempts` is only recorded for server errors, the one status class
    /// that goes through the retry loop.
    pub(crate) fn from_status(
        status: u16,
        body: String,
        retry_after: Option<u64>,
        attempts: u32,
    ) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            429 => Self::RateLimited { retry_after, body },
            500..=599 => Self::Server {
                status,
                body,
                attempts,
            },
            _ => Self::Client { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Client { .. } => ErrorKind::Client,
            Self::Server { .. } => ErrorKind::Server,
            Self::Network { .. } => ErrorKind::Network,
            Self::Deserialization { .. } => ErrorKind::Deserialization,
            Self::ClientClosed => ErrorKind::ClientClosed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status that triggered the error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Client { status, .. } | Self::Server { status, .. } => {
                Some(*status)
            }
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Server { attempts, .. }
            | Self::Network { attempts, .. }
            | Self::Cancelled { attempts } => Some(*attempts),
            _ => None,
        }
    }

    /// Whether this kind of failure is retried by the client.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Server { .. } => true,
            Self::Network { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Human-readable message the API placed in a JSON error body.
    ///
    /// The API answers errors with `{"code": ..., "message": ...}` and, for
    /// some gateway errors, `{"code": ..., "status": ...}`.
    pub fn api_message(&self) -> Option<String> {
        let body = match self {
            Self::Auth { body, .. }
            | Self::RateLimited { body, .. }
            | Self::Client { body, .. }
            | Self::Server { body, .. } => body,
            _ => return None,
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "status"]
            .iter()
            .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
    }

    /// Short advice for end users.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "check your API keys",
            Self::RateLimited { .. } => "wait before making more requests",
            Self::Client { status: 404, .. } => "the requested resource does not exist",
            Self::Client { .. } => "check the request parameters",
            Self::Server { .. } => "try again later",
            Self::Network { .. } => "check your internet connection and try again",
            Self::Deserialization { .. } => "the response did not have the expected shape",
            Self::ClientClosed => "create a new client",
            Self::Cancelled { .. } => "the request was cancelled by the caller",
            Self::Config(_) => "fix the client configuration",
        }
    }
}

/// Transport-level failure classification.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NetworkErrorKind {
    /// The per-attempt timeout expired.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The request failed mid-flight (e.g. connection reset).
    Request,
    /// The response body could not be read.
    Body,
    /// The transport was closed.
    Closed,
    /// Anything else reported by the HTTP stack.
    Other,
}

impl NetworkErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connect | Self::Request | Self::Body
        )
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Closed => "closed",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Network cause of a failed attempt.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
    message: String,
    #[source]
    source: Option<reqwest::Error>,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == NetworkErrorKind::Timeout
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            NetworkErrorKind::Body
        } else if err.is_request() {
            NetworkErrorKind::Request
        } else {
            NetworkErrorKind::Other
        };
        // reqwest's Display includes the full URL, which carries the signed
        // query string.
        let err = err.without_url();
        Self {
            kind,
            message: err.to_string(),
            source: Some(err),
        }
    }
}
