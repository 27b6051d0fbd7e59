// Round-trip verification
//
// Setup → Exported → Contaminated → Imported → Verified. Writes go through
// the UI, reads through the API. A wrong final value is a `Mismatch` verdict
// in the report; only component failures come back as errors.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tracing::{error, info};

use camcheck_api::DeviceClient;

use crate::config::FieldTarget;
use crate::error::CoreError;
use crate::settings::SettingsController;
use crate::ui::UiDriver;

pub const DEFAULT_SENTINEL: &str = "AUTOMATION_TEST_VALUE_12345";
pub const DEFAULT_DIRTY: &str = "DIRTY_VALUE_999";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Exported,
    Contaminated,
    Imported,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Mismatch,
}

/// Values and artifact location for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripPlan {
    pub sentinel: String,
    pub dirty: String,
    pub artifact: PathBuf,
}

impl RoundTripPlan {
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.into(),
            dirty: DEFAULT_DIRTY.into(),
            artifact: artifact.into(),
        }
    }

    #[must_use]
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    #[must_use]
    pub fn with_dirty(mut self, dirty: impl Into<String>) -> Self {
        self.dirty = dirty.into();
        self
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.sentinel.is_empty() || self.dirty.is_empty() {
            return Err(CoreError::Config {
                message: "sentinel and dirty values must be non-empty".into(),
            });
        }
        if self.sentinel == self.dirty {
            return Err(CoreError::Config {
                message: format!(
                    "sentinel and dirty values are both {:?}; contamination would be invisible",
                    self.sentinel
                ),
            });
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundTripReport {
    pub field: FieldTarget,
    pub expected: String,
    pub contaminated: String,
    pub actual: String,
    pub verdict: Verdict,
    pub stages: Vec<Stage>,
    pub artifact: PathBuf,
    pub artifact_bytes: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RoundTripReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Orchestrates one export → mutate → import → verify run.
pub struct RoundTrip<'a, D> {
    settings: &'a mut SettingsController<D>,
    client: &'a DeviceClient,
    stages: Vec<Stage>,
}

impl<'a, D: UiDriver> RoundTrip<'a, D> {
    pub fn new(settings: &'a mut SettingsController<D>, client: &'a DeviceClient) -> Self {
        Self {
            settings,
            client,
            stages: Vec::with_capacity(5),
        }
    }

    fn reached(&mut self, stage: Stage) {
        info!(%stage, "round-trip stage reached");
        self.stages.push(stage);
    }

    /// Run every stage in order. The first failing stage aborts the run.
    pub async fn run(mut self, plan: &RoundTripPlan) -> Result<RoundTripReport, CoreError> {
        plan.validate()?;
        let started_at = Utc::now();
        let field = self.settings.config().field.clone();

        let result = self.stages_in_order(plan, &field).await;
        let (artifact_bytes, actual) = match result {
            Ok(done) => done,
            Err(e) => {
                error!(
                    stage = ?e.stage(),
                    completed = ?self.stages,
                    error = %e,
                    "round-trip aborted"
                );
                return Err(e);
            }
        };

        let verdict = if actual == plan.sentinel {
            Verdict::Pass
        } else {
            Verdict::Mismatch
        };
        match verdict {
            Verdict::Pass => info!(
                expected = %plan.sentinel,
                actual = %actual,
                "round-trip restored original value"
            ),
            Verdict::Mismatch => error!(
                expected = %plan.sentinel,
                actual = %actual,
                "round-trip mismatch: import did not restore the exported value"
            ),
        }

        Ok(RoundTripReport {
            field,
            expected: plan.sentinel.clone(),
            contaminated: plan.dirty.clone(),
            actual,
            verdict,
            stages: self.stages,
            artifact: plan.artifact.clone(),
            artifact_bytes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn stages_in_order(
        &mut self,
        plan: &RoundTripPlan,
        field: &FieldTarget,
    ) -> Result<(u64, String), CoreError> {
        self.settings
            .write_field(&plan.sentinel)
            .await
            .map_err(|e| e.at(Stage::Setup))?;
        self.reached(Stage::Setup);

        let artifact = self
            .settings
            .export(&plan.artifact)
            .await
            .map_err(|e| e.at(Stage::Exported))?;
        self.reached(Stage::Exported);

        self.settings
            .write_field(&plan.dirty)
            .await
            .map_err(|e| e.at(Stage::Contaminated))?;
        let observed = read_field(self.client, field)
            .await
            .map_err(|e| e.at(Stage::Contaminated))?;
        if observed != plan.dirty {
            return Err(CoreError::ContaminationNotObserved {
                expected: plan.dirty.clone(),
                actual: observed,
            }
            .at(Stage::Contaminated));
        }
        self.reached(Stage::Contaminated);

        self.settings
            .import(&artifact.path)
            .await
            .map_err(|e| e.at(Stage::Imported))?;
        // The device rebooted; the API session from before is gone.
        self.client
            .refresh_session()
            .await
            .map_err(|e| CoreError::from(e).at(Stage::Imported))?;
        self.reached(Stage::Imported);

        let actual = read_field(self.client, field)
            .await
            .map_err(|e| e.at(Stage::Verified))?;
        self.reached(Stage::Verified);

        Ok((artifact.bytes, actual))
    }
}

/// Read the target field through the API.
pub async fn read_field(client: &DeviceClient, field: &FieldTarget) -> Result<String, CoreError> {
    let record = client.get(&field.action).await?;
    record
        .get(&field.key)
        .map(str::to_owned)
        .ok_or_else(|| CoreError::FieldMissing {
            action: field.action.clone(),
            key: field.key.clone(),
        })
}
