//! Per-request authentication parameters.
//!
//! The API authenticates server-side callers with three query parameters:
//! `ts`, `apikey` and `hash = md5(ts + private_key + public_key)` in lowercase
//! hex. The digest is fixed by the API contract.

use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};

use crate::Credentials;

/// Authentication parameters for a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthParams {
    pub apikey: String,
    pub ts: String,
    pub hash: String,
}

impl AuthParams {
    /// Query pairs in the order the API documents them.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("ts", self.ts.as_str()),
            ("apikey", self.apikey.as_str()),
            ("hash", self.hash.as_str()),
        ]
    }
}

/// Derives [`AuthParams`] for `timestamp`.
///
/// Pure: identical inputs always produce identical output.
pub fn sign(credentials: &Credentials, timestamp: u64) -> AuthParams {
    let ts = timestamp.to_string();
    let mut hasher = Md5::new();
    hasher.update(ts.as_bytes());
    hasher.update(credentials.private_key().as_bytes());
    hasher.update(credentials.public_key().as_bytes());

    AuthParams {
        apikey: credentials.public_key().to_owned(),
        ts,
        hash: hex::encode(hasher.finalize()),
    }
}

/// Source of signing timestamps.
pub trait Clock: Send + Sync {
    /// Current time in whole seconds.
    fn now(&self) -> u64;
}

/// Wall clock, Unix seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now(&self) -> u64 {
        self()
    }
}
