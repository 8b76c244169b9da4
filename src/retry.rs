//! Retry decisions and backoff math.
//!
//! [`RetryPolicy::decide`] is a pure function of the attempt number and the
//! outcome; sleeping happens in the client loop.

use std::time::Duration;

use crate::{ClientOptions, NetworkErrorKind};

/// Result of one attempt, as seen by the policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A response with this status code was received.
    Status(u16),
    /// The attempt failed before a response arrived.
    Network(NetworkErrorKind),
}

impl Outcome {
    /// 5xx and transient network errors. 429 is not retried.
    pub fn is_retryable(self) -> bool {
        match self {
            Self::Status(status) => (500..=599).contains(&status),
            Self::Network(kind) => kind.is_transient(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDecision {
    /// Wait this long, then try again.
    Retry(Duration),
    /// Surface the last outcome.
    Fail,
}

/// Exponential backoff policy: delay for retry `k` is `base * 2^k`,
/// capped at `max_delay`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Policy with no retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Decides what to do after `attempt` (0-indexed) produced `outcome`.
    pub fn decide(&self, attempt: u32, outcome: Outcome) -> RetryDecision {
        if outcome.is_retryable() && attempt < self.max_retries {
            RetryDecision::Retry(self.backoff(attempt))
        } else {
            RetryDecision::Fail
        }
    }

    /// Delay before retry `retry` (0-indexed).
    pub fn backoff(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .map_or(self.max_delay, |factor| self.base_delay.saturating_mul(factor))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ClientOptions::default())
    }
}

impl From<&ClientOptions> for RetryPolicy {
    fn from(options: &ClientOptions) -> Self {
        Self::new(
            options.max_retries,
            Duration::from_millis(options.retry_backoff_ms),
            Duration::from_millis(options.max_backoff_ms),
        )
    }
}

/// Progress of one logical call through the retry loop.
///
/// Holds the attempt counter and the pending delay. The last error is owned
/// by the loop in `MarvelClient::execute`, which returns it on
/// [`RetryDecision::Fail`].
#[derive(Debug)]
pub(crate) struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    next_delay: Duration,
}

impl RetryState {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            next_delay: Duration::ZERO,
        }
    }

    /// Attempts made so far, counting the one in progress.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempt + 1
    }

    pub(crate) fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// Records a failed attempt. Returns `false` when the call must fail.
    pub(crate) fn record(&mut self, outcome: Outcome) -> bool {
        match self.policy.decide(self.attempt, outcome) {
            RetryDecision::Retry(delay) => {
                self.next_delay = delay;
                true
            }
            RetryDecision::Fail => false,
        }
    }

    /// Moves to the next attempt after the backoff has elapsed.
    pub(crate) fn advance(&mut self) {
        self.attempt += 1;
        self.next_delay = Duration::ZERO;
    }
}
