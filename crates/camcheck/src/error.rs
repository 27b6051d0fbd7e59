//! CLI error types with miette diagnostics.
//!
//! Maps API, workflow and config errors into user-facing errors with
//! actionable help text and a distinct exit code per failure family.

use miette::Diagnostic;
use thiserror::Error;

use camcheck_api::Error as ApiError;
use camcheck_config::ConfigError;
use camcheck_core::{CoreError, UiError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const MISMATCH: i32 = 10;
    pub const UI_FAILURE: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to device at {url}")]
    #[diagnostic(
        code(camcheck::connection_failed),
        help(
            "Check that the camera is powered and reachable.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(camcheck::tls_error),
        help("Use --insecure (-k) to accept self-signed certificates, or fix ca_cert in your profile.")
    )]
    TlsError { reason: String },

    #[error("WebDriver server at {url} is not available: {reason}")]
    #[diagnostic(
        code(camcheck::webdriver_unavailable),
        help(
            "Start chromedriver (e.g. `chromedriver --port=9515`) or point\n\
             --webdriver / the profile's `webdriver` key at a running server."
        )
    )]
    WebDriverUnavailable { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(camcheck::auth_failed),
        help(
            "The device kept answering 401 after session refreshes.\n\
             Run: camcheck config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(camcheck::no_credentials),
        help(
            "Configure credentials with: camcheck config init\n\
             Or set the CAMCHECK_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Device semantics ─────────────────────────────────────────────
    #[error("Device rejected {action} (returnCode={code}) for [{params}]")]
    #[diagnostic(code(camcheck::rejected))]
    Rejected {
        action: String,
        code: String,
        params: String,
    },

    #[error("Device API error: {message}")]
    #[diagnostic(code(camcheck::api_error))]
    Api { message: String },

    #[error("Field '{key}' not present in {action} response")]
    #[diagnostic(
        code(camcheck::field_missing),
        help("Run: camcheck get {action} to see the available keys")
    )]
    FieldMissing { action: String, key: String },

    // ── Workflow ─────────────────────────────────────────────────────
    #[error(
        "UI step failed{}: {message}",
        .stage.as_deref().map(|s| format!(" during {s}")).unwrap_or_default()
    )]
    #[diagnostic(
        code(camcheck::ui_failure),
        help(
            "Rerun with --headed -vv to watch the browser and see each step.\n\
             Selectors can be overridden per profile under [profiles.<name>.selectors]."
        )
    )]
    UiFailed {
        stage: Option<String>,
        message: String,
    },

    #[error("Round-trip mismatch on {field}: expected {expected:?}, device reports {actual:?}")]
    #[diagnostic(
        code(camcheck::mismatch),
        help("The import did not restore the value present at export time.")
    )]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(camcheck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(camcheck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: camcheck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(camcheck::no_config),
        help(
            "Create a profile with: camcheck config init\n\
             or pass --device. Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(camcheck::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(camcheck::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out: {what}")]
    #[diagnostic(
        code(camcheck::timeout),
        help("Increase --timeout or the profile's ready_wait, or check device responsiveness.")
    )]
    Timeout { what: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(camcheck::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(camcheck::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::TlsError { .. }
            | Self::WebDriverUnavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Mismatch { .. } => exit_code::MISMATCH,
            Self::UiFailed { .. } => exit_code::UI_FAILURE,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        // Report the last attempt's failure, not the retry wrapper.
        let mut err = err;
        while let ApiError::RetriesExhausted { source, .. } = err {
            err = *source;
        }

        match err {
            ApiError::Unauthorized => CliError::AuthFailed {
                profile: "current".into(),
            },

            ApiError::Transport(e) if e.is_timeout() => CliError::Timeout {
                what: format!("request to {}", e.url().map_or("device", |u| u.as_str())),
            },

            ApiError::Transport(e) => CliError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                source: Box::new(e),
            },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "device".into(),
                reason: e.to_string(),
            },

            ApiError::Tls(reason) => CliError::TlsError { reason },

            ApiError::NotReady { timeout_secs } => CliError::Timeout {
                what: format!("device not ready after {timeout_secs}s"),
            },

            ApiError::Rejected {
                action,
                code,
                params,
            } => CliError::Rejected {
                action,
                code,
                params,
            },

            other => CliError::Api {
                message: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let stage = err.stage().map(|s| s.to_string());
        let err = match err {
            CoreError::Stage { source, .. } => *source,
            other => other,
        };

        match err {
            CoreError::Api(e) => e.into(),

            CoreError::Ui(UiError::Timeout { what, after }) => CliError::Timeout {
                what: format!("{what} ({}ms)", after.as_millis()),
            },

            CoreError::FieldMissing { action, key } => CliError::FieldMissing { action, key },

            CoreError::Config { message } => CliError::Validation {
                field: "round-trip".into(),
                reason: message,
            },

            other => CliError::UiFailed {
                stage,
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile(name) => CliError::ProfileNotFound {
                name,
                available: "(see `camcheck config profiles`)".into(),
            },
            ConfigError::Keyring(reason) => CliError::Validation {
                field: "keyring".into(),
                reason,
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_401_maps_to_auth_exit_code() {
        let err: CliError = ApiError::RetriesExhausted {
            attempts: 3,
            source: Box::new(ApiError::Unauthorized),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn staged_ui_failure_keeps_stage_name() {
        let err: CliError = CoreError::DialogNotShown { timeout_ms: 10 }
            .at(camcheck_core::Stage::Imported)
            .into();
        assert_eq!(err.exit_code(), exit_code::UI_FAILURE);
        assert!(err.to_string().contains("during imported"));
    }

    #[test]
    fn rejected_write_is_general_failure() {
        let err: CliError = ApiError::Rejected {
            action: "systemInfo".into(),
            code: "-1".into(),
            params: "note=x".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert!(err.to_string().contains("returnCode=-1"));
    }
}
