use thiserror::Error;

use crate::retry::{Classify, FaultClass};

/// Top-level error type for the `camcheck-api` crate.
///
/// Covers every failure mode of a single logical request against the
/// device's configuration endpoint: authentication, transport, HTTP status,
/// and the device-reported `returnCode`. `camcheck-core` wraps these into
/// stage-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The device answered 401 (session or credentials no longer accepted).
    #[error("Unauthorized -- device rejected the session (HTTP 401)")]
    Unauthorized,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, reset, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status other than 401.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The device did not answer its ready path within the bounded wait.
    #[error("Device not ready after {timeout_secs}s")]
    NotReady { timeout_secs: u64 },

    // ── Device semantics ────────────────────────────────────────────
    /// Transport succeeded but the device reported a non-success `returnCode`.
    #[error("Device rejected {action} (returnCode={code}) for params [{params}]")]
    Rejected {
        action: String,
        code: String,
        params: String,
    },

    /// Write response carried no `returnCode` field at all.
    #[error("Response to {action} carried no returnCode")]
    MissingReturnCode { action: String },

    // ── Retry ───────────────────────────────────────────────────────
    /// Every attempt failed; `source` is the last error observed.
    #[error("Gave up after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns `true` if this error indicates the session has expired
    /// and a refresh might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Http { .. } | Self::NotReady { .. } => true,
            Self::RetriesExhausted { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if the device itself reported the failure
    /// (as opposed to transport or auth).
    pub fn is_semantic(&self) -> bool {
        match self {
            Self::Rejected { .. } | Self::MissingReturnCode { .. } => true,
            Self::RetriesExhausted { source, .. } => source.is_semantic(),
            _ => false,
        }
    }

    /// The device-reported `returnCode`, if this is a rejection.
    pub fn return_code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::RetriesExhausted { source, .. } => source.return_code(),
            _ => None,
        }
    }

    /// Unwrap the last underlying error of an exhausted retry loop.
    pub fn root(&self) -> &Error {
        match self {
            Self::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

impl Classify for Error {
    fn class(&self) -> FaultClass {
        if self.is_auth_expired() {
            FaultClass::Auth
        } else if self.is_transient() {
            FaultClass::Transient
        } else {
            FaultClass::Fatal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_classifies_as_auth() {
        assert_eq!(Error::Unauthorized.class(), FaultClass::Auth);
    }

    #[test]
    fn http_status_is_transient() {
        let err = Error::Http {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.class(), FaultClass::Transient);
    }

    #[test]
    fn rejection_is_fatal_and_semantic() {
        let err = Error::Rejected {
            action: "systemInfo".into(),
            code: "-1".into(),
            params: "note=x".into(),
        };
        assert_eq!(err.class(), FaultClass::Fatal);
        assert!(err.is_semantic());
        assert_eq!(err.return_code(), Some("-1"));
    }

    #[test]
    fn exhausted_exposes_root() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            source: Box::new(Error::Unauthorized),
        };
        assert!(matches!(err.root(), Error::Unauthorized));
        assert!(err.to_string().contains("3 attempt"));
    }
}
