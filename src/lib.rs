//! `marvel-http` is the request pipeline of an async client for the Marvel
//! Comics API.
//!
//! [`MarvelClient`] signs every attempt, retries transient failures with
//! exponential backoff and hands back either a generic JSON object or a
//! caller-decoded value:
//! - [`MarvelClient::request`]
//! - [`MarvelClient::request_json`]
//! - [`MarvelClient::request_with`]
//! - [`MarvelClient::health_check`]
//!
//! Entity schemas are out of scope; pair [`ApiEnvelope`] and
//! [`DataContainer`] with your own types.

mod client;
mod credentials;
mod decode;
mod envelope;
mod error;
mod options;
mod request;
pub mod retry;
pub mod signer;
mod transport;

pub use client::{ClientState, HealthState, HealthStatus, MarvelClient, HEALTH_CHECK_PATH};
pub use credentials::Credentials;
pub use decode::JsonObject;
pub use envelope::{ApiEnvelope, DataContainer};
pub use error::{ErrorKind, MarvelError, NetworkError, NetworkErrorKind};
pub use options::{ClientOptions, DEFAULT_BASE_URL};
pub use request::RequestDescriptor;
pub use retry::{Outcome, RetryDecision, RetryPolicy};
pub use signer::{AuthParams, Clock, SystemClock};
pub use transport::RawResponse;

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, MarvelError>;
