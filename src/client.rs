use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    decode::{decode_json, decode_with},
    retry::{Outcome, RetryPolicy, RetryState},
    signer::{sign, Clock, SystemClock},
    transport::{build_http_client, HttpTransport},
    ClientOptions, Credentials, JsonObject, MarvelError, RawResponse, RequestDescriptor, Result,
};

/// Inexpensive endpoint probed by [`MarvelClient::health_check`].
pub const HEALTH_CHECK_PATH: &str = "/v1/public/characters";

/// Lifecycle of a [`MarvelClient`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientState {
    /// Constructed; no transport yet.
    Created,
    /// Transport built; requests accepted.
    Open,
    /// Closed for good; requests fail with [`MarvelError::ClientClosed`].
    Closed,
}

enum State {
    Created,
    Open(Arc<HttpTransport>),
    Closed,
}

/// Result of [`MarvelClient::health_check`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// 2xx with the expected envelope.
    Ok,
    /// The API answered, but not successfully.
    Degraded,
    /// No response could be obtained.
    Unreachable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub status_code: Option<u16>,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.state == HealthState::Ok
    }

    fn ok(status: u16) -> Self {
        Self {
            state: HealthState::Ok,
            status_code: Some(status),
            message: None,
        }
    }

    fn degraded(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Degraded,
            status_code: status,
            message: Some(message.into()),
        }
    }

    fn unreachable(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unreachable,
            status_code: None,
            message: Some(message.into()),
        }
    }
}

/// Authenticated client for the Marvel Comics API.
///
/// Every attempt is signed with a fresh timestamp, 5xx responses and
/// transient network errors are retried with exponential backoff, and the
/// connection pool is released by [`close`](Self::close) or on drop.
pub struct MarvelClient {
    credentials: Credentials,
    options: ClientOptions,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    shutdown: CancellationToken,
}

impl fmt::Debug for MarvelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarvelClient")
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}

impl MarvelClient {
    /// Creates a client from a key pair.
    ///
    /// Returns [`MarvelError::Config`] if either key is empty.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use marvel_http::{MarvelClient, RequestDescriptor};
    ///
    /// # async fn run() -> marvel_http::Result<()> {
    /// let client = MarvelClient::new("public-key", "private-key")?;
    /// let body = client
    ///     .request(&RequestDescriptor::get("/v1/public/characters").limit(5))
    ///     .await?;
    /// println!("{}", body["data"]["total"]);
    /// client.close();
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(public_key: impl AsRef<str>, private_key: impl AsRef<str>) -> Result<Self> {
        Ok(Self::with_credentials(Credentials::new(
            public_key,
            private_key,
        )?))
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            options: ClientOptions::default(),
            clock: Arc::new(SystemClock),
            state: Mutex::new(State::Created),
            shutdown: CancellationToken::new(),
        }
    }

    /// Applies base URL, timeout and retry options.
    ///
    /// An already open transport is released so the next request picks the
    /// new options up.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let State::Open(transport) = state {
            transport.close();
            *state = State::Created;
        }
        self
    }

    /// Replaces the timestamp source used for signing.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> ClientState {
        match &*self.lock_state() {
            State::Created => ClientState::Created,
            State::Open(_) => ClientState::Open,
            State::Closed => ClientState::Closed,
        }
    }

    /// Validates the base URL and builds the transport.
    ///
    /// Fails with [`MarvelError::Config`] if either step fails. Sockets are
    /// only opened by the first request, which also calls this implicitly;
    /// calling it again while open is a no-op.
    pub fn open(&self) -> Result<()> {
        self.transport().map(drop)
    }

    /// Releases the connection pool and rejects further requests.
    ///
    /// In-flight requests stop at their next suspension point with
    /// [`MarvelError::ClientClosed`]. Calling it again has no effect.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Closed);
        self.shutdown.cancel();
        if let State::Open(transport) = previous {
            transport.close();

            #[cfg(feature = "tracing")]
            tracing::debug!("marvel client closed");
        }
    }

    /// Sends `descriptor` and returns the body as a JSON object.
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<JsonObject> {
        self.request_json(descriptor).await
    }

    /// Like [`request`](Self::request), aborting when `cancel` fires.
    pub async fn request_cancellable(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<JsonObject> {
        let response = self.execute(descriptor, cancel).await?;
        decode_json(&response)
    }

    /// Sends `descriptor` and deserializes the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T> {
        let response = self.execute(descriptor, &CancellationToken::new()).await?;
        decode_json(&response)
    }

    /// Sends `descriptor` and hands the raw body to `decode`.
    ///
    /// Decoder failures surface as [`MarvelError::Deserialization`].
    pub async fn request_with<T, E, F>(
        &self,
        descriptor: &RequestDescriptor,
        decode: F,
    ) -> Result<T>
    where
        F: FnOnce(&[u8]) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        let response = self.execute(descriptor, &CancellationToken::new()).await?;
        decode_with(&response, decode)
    }

    /// Runs the signed retry loop and returns the successful raw response.
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let policy = RetryPolicy::from(&self.options);
        self.send_with_retry(descriptor, cancel, policy).await
    }

    /// Probes [`HEALTH_CHECK_PATH`] with a single attempt.
    ///
    /// Non-2xx answers and network failures are reported in the returned
    /// status; only [`MarvelError::Config`] and [`MarvelError::ClientClosed`]
    /// are raised.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let descriptor = RequestDescriptor::get(HEALTH_CHECK_PATH).limit(1);
        let result = self
            .send_with_retry(&descriptor, &CancellationToken::new(), RetryPolicy::none())
            .await;

        let status = match result {
            Ok(response) => match decode_json::<JsonObject>(&response) {
                Ok(body) if body.contains_key("data") => HealthStatus::ok(response.status),
                Ok(_) => HealthStatus::degraded(
                    Some(response.status),
                    "response is missing the data container",
                ),
                Err(err) => HealthStatus::degraded(Some(response.status), err.to_string()),
            },
            Err(err @ (MarvelError::Config(_) | MarvelError::ClientClosed)) => return Err(err),
            Err(MarvelError::Network { source, .. }) => {
                HealthStatus::unreachable(source.to_string())
            }
            Err(err) => HealthStatus::degraded(err.status(), err.to_string()),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?status.state, status_code = ?status.status_code, "health check");

        Ok(status)
    }

    async fn send_with_retry(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationToken,
        policy: RetryPolicy,
    ) -> Result<RawResponse> {
        let transport = self.transport()?;
        let mut retry = RetryState::new(policy);

        loop {
            if cancel.is_cancelled() {
                return Err(MarvelError::Cancelled {
                    attempts: retry.attempts() - 1,
                });
            }

            let auth = sign(&self.credentials, self.clock.now());
            let signed = descriptor.signed(&auth);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %descriptor.method(),
                path = descriptor.path(),
                attempt = retry.attempts(),
                "sending request"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(MarvelError::Cancelled { attempts: retry.attempts() });
                }
                _ = self.shutdown.cancelled() => return Err(MarvelError::ClientClosed),
                result = transport.send(&signed) => result,
            };

            let (outcome, error) = match result {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => (
                    Outcome::Status(response.status),
                    MarvelError::from_status(
                        response.status,
                        response.text(),
                        response.retry_after(),
                        retry.attempts(),
                    ),
                ),
                Err(source) => (
                    Outcome::Network(source.kind()),
                    MarvelError::Network {
                        source,
                        attempts: retry.attempts(),
                    },
                ),
            };

            if !retry.record(outcome) {
                #[cfg(feature = "tracing")]
                log_give_up(descriptor, retry.attempts(), &error);

                return Err(error);
            }

            let delay = retry.next_delay();

            #[cfg(feature = "tracing")]
            tracing::warn!(
                path = descriptor.path(),
                attempt = retry.attempts(),
                delay_ms = delay.as_millis() as u64,
                "retrying request: {error}"
            );

            self.wait_before_retry(delay, retry.attempts(), cancel).await?;
            retry.advance();
        }
    }

    /// Sleeps for `delay` unless the caller or `close` interrupts it.
    async fn wait_before_retry(
        &self,
        delay: Duration,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MarvelError::Cancelled { attempts }),
            _ = self.shutdown.cancelled() => Err(MarvelError::ClientClosed),
            _ = sleep(delay) => Ok(()),
        }
    }

    /// Returns the open transport, opening the client if needed.
    fn transport(&self) -> Result<Arc<HttpTransport>> {
        let mut state = self.lock_state();
        match &*state {
            State::Open(transport) => return Ok(Arc::clone(transport)),
            State::Closed => return Err(MarvelError::ClientClosed),
            State::Created => {}
        }

        let base_url = parse_base_url(&self.options.base_url)?;
        let http = build_http_client()
            .map_err(|err| MarvelError::Config(format!("failed to build HTTP client: {err}")))?;
        let transport = Arc::new(HttpTransport::new(
            base_url,
            Duration::from_millis(self.options.timeout_ms),
            http,
        ));
        *state = State::Open(Arc::clone(&transport));

        #[cfg(feature = "tracing")]
        tracing::debug!(base_url = %transport.base_url(), "marvel client opened");

        Ok(transport)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MarvelClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(feature = "tracing")]
fn log_give_up(descriptor: &RequestDescriptor, attempts: u32, error: &MarvelError) {
    if error.is_retryable() {
        tracing::warn!(path = descriptor.path(), attempts, "retries exhausted: {error}");
    } else {
        tracing::debug!(
            path = descriptor.path(),
            attempts,
            kind = %error.kind(),
            "request failed"
        );
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| MarvelError::Config(format!("invalid base URL '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(MarvelError::Config(format!(
            "base URL '{raw}' must be an absolute http(s) URL"
        )));
    }
    Ok(url)
}
