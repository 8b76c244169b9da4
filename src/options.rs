/// Default API gateway.
pub const DEFAULT_BASE_URL: &str = "https://gateway.marvel.com";

/// Configures base URL, timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Base URL request paths are joined to.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 30_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}
