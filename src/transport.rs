use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bytes::Bytes;
use reqwest::header::{self, HeaderMap};
use url::Url;

use crate::{NetworkError, NetworkErrorKind, RequestDescriptor};

/// Status, headers and body of one attempt.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `Retry-After` header in seconds, when it is an integer.
    pub fn retry_after(&self) -> Option<u64> {
        self.headers
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }
}

#[derive(Debug)]
enum Pool {
    Active(reqwest::Client),
    Closed,
}

/// Owns the keep-alive connection pool for one client.
///
/// Sockets are opened by the first send; [`close`](Self::close) drops the
/// pool and every idle connection with it.
#[derive(Debug)]
pub(crate) struct HttpTransport {
    base_url: Url,
    timeout: Duration,
    pool: Mutex<Pool>,
}

impl HttpTransport {
    pub(crate) fn new(base_url: Url, timeout: Duration, http: reqwest::Client) -> Self {
        Self {
            base_url,
            timeout,
            pool: Mutex::new(Pool::Active(http)),
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn acquire(&self) -> Result<reqwest::Client, NetworkError> {
        match &*self.lock_pool() {
            Pool::Active(http) => Ok(http.clone()),
            Pool::Closed => Err(NetworkError::new(
                NetworkErrorKind::Closed,
                "transport is closed",
            )),
        }
    }

    /// Sends one attempt and buffers the full body.
    pub(crate) async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, NetworkError> {
        let http = self.acquire()?;
        let url = request.url(&self.base_url);

        let response = http
            .request(request.method().clone(), url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Releases pooled connections. Further calls are no-ops.
    pub(crate) fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock_pool(), Pool::Closed);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            base_url = %self.base_url,
            released = matches!(previous, Pool::Active(_)),
            "transport closed"
        );

        drop(previous);
    }

    fn lock_pool(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the pooled HTTP client. No connection is opened here.
pub(crate) fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("marvel-http/", env!("CARGO_PKG_VERSION")))
        .build()
}
