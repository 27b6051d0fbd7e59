use std::path::PathBuf;

use thiserror::Error;

use camcheck_api::{Classify, FaultClass};

use crate::ui::UiError;
use crate::verify::Stage;

/// Errors from the workflow layer: popups, export/import, field writes and
/// the round-trip verifier.
///
/// Every variant is recoverable by the caller; nothing in this crate panics
/// on an unexpected device or UI state.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Popups ──────────────────────────────────────────────────────
    #[error("No dialog appeared within {timeout_ms}ms")]
    DialogNotShown { timeout_ms: u128 },

    #[error("Dialog button {index} is not visible ({available} button(s) shown)")]
    ButtonNotVisible { index: usize, available: usize },

    #[error("Dialog still open {timeout_ms}ms after clicking its button")]
    DialogStuckOpen { timeout_ms: u128 },

    // ── Settings file transfer ──────────────────────────────────────
    #[error("Export to {} failed: {reason}", .path.display())]
    ExportFailed { path: PathBuf, reason: String },

    #[error("Import from {} failed: {reason}", .path.display())]
    ImportFailed { path: PathBuf, reason: String },

    #[error("Writing the field through the UI failed: {reason}")]
    FieldWriteFailed { reason: String },

    #[error("Session did not recover after {attempts} attempt(s): {reason}")]
    SessionNotRecovered { attempts: u32, reason: String },

    // ── Verification ────────────────────────────────────────────────
    #[error("Field {key:?} missing from {action} response")]
    FieldMissing { action: String, key: String },

    #[error("Contamination not observed: wrote {expected:?}, device reports {actual:?}")]
    ContaminationNotObserved { expected: String, actual: String },

    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<CoreError>,
    },

    // ── Wrapped ─────────────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] camcheck_api::Error),

    #[error(transparent)]
    Ui(#[from] UiError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Attach the round-trip stage that produced this error.
    pub fn at(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage this error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, skipping stage wrappers.
    pub fn root(&self) -> &CoreError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Authentication failure anywhere underneath.
    pub fn is_auth(&self) -> bool {
        match self.root() {
            Self::Api(e) => e.root().is_auth_expired(),
            _ => false,
        }
    }
}

impl Classify for CoreError {
    fn class(&self) -> FaultClass {
        match self.root() {
            Self::Api(e) => e.class(),
            Self::Ui(e) => e.class(),
            Self::DialogNotShown { .. } | Self::DialogStuckOpen { .. } => FaultClass::Transient,
            _ => FaultClass::Fatal,
        }
    }
}
