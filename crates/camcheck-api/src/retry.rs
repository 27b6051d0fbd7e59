// Retry policy shared by the request client and UI-driven recovery.
//
// A fixed number of attempts with a fixed pause between them. Each failure is
// classified by the caller's error type: auth failures ask for a session
// refresh before the next attempt, transient failures just pause, anything
// else stops immediately.

use std::time::Duration;

/// How a single failed attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Session no longer accepted; refresh it, then retry.
    Auth,
    /// Network hiccup, timeout, non-2xx; pause, then retry.
    Transient,
    /// Retrying cannot help.
    Fatal,
}

/// Implemented by error types that can be fed to a [`RetryPolicy`].
pub trait Classify {
    fn class(&self) -> FaultClass;
}

/// What the caller should do after attempt `n` failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Refresh the session, pause, and try again.
    Refresh,
    /// Pause and try again.
    Backoff,
    /// Stop and surface the error.
    GiveUp,
}

/// Attempt budget and pause length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Decide what to do after the 1-based `attempt` failed with `err`.
    pub fn decide(&self, attempt: u32, err: &impl Classify) -> Decision {
        if attempt >= self.max_attempts.max(1) {
            return Decision::GiveUp;
        }
        match err.class() {
            FaultClass::Auth => Decision::Refresh,
            FaultClass::Transient => Decision::Backoff,
            FaultClass::Fatal => Decision::GiveUp,
        }
    }

    /// Sleep for the configured backoff.
    pub async fn pause(&self) {
        if !self.backoff.is_zero() {
            tokio::time::sleep(self.backoff).await;
        }
    }
}
