// Settings export/import through the configuration UI
//
// Export always deletes the destination first and writes through a `.part`
// sibling, so an earlier export is never mistaken for a new one and a failed
// run never leaves a half-written artifact. Import answers "No" to the
// include-network-settings prompt and waits for the device to come back
// before returning.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use camcheck_api::{Decision, RetryPolicy};

use crate::config::SuiteConfig;
use crate::error::CoreError;
use crate::popup::{ButtonChoice, PopupResolver};
use crate::ui::{ElementState, Locator, UiDriver, UiError};

/// A completed export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Drives the settings pages of the configuration UI.
pub struct SettingsController<D> {
    driver: D,
    config: SuiteConfig,
    popup: PopupResolver,
}

impl<D: UiDriver> SettingsController<D> {
    pub fn new(driver: D, config: SuiteConfig) -> Self {
        let popup = config.popup();
        Self {
            driver,
            config,
            popup,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Open the home page, wait for the ready marker, then click through `nav`.
    async fn open(&mut self, nav: &[String]) -> Result<(), UiError> {
        let home = self
            .config
            .device
            .page_url(&self.config.selectors.home_path)
            .map_err(|e| UiError::Driver(e.to_string()))?;
        let timeout = self.config.timeouts.element;

        let ready = self.config.selectors.ready();
        self.driver.navigate(home.as_str()).await?;
        self.driver
            .wait_for(&ready, ElementState::Visible, self.config.timeouts.ready)
            .await?;
        for step in nav {
            self.driver.click(&Locator::css(step), timeout).await?;
        }
        Ok(())
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Download the device configuration to `dest`.
    pub async fn export(&mut self, dest: &Path) -> Result<ExportArtifact, CoreError> {
        let failed = |reason: String| CoreError::ExportFailed {
            path: dest.to_path_buf(),
            reason,
        };

        remove_stale(dest)
            .await
            .map_err(|e| failed(format!("cannot remove previous artifact: {e}")))?;

        let nav = self.config.selectors.maintenance_nav.clone();
        self.open(&nav)
            .await
            .map_err(|e| failed(format!("navigating to export control: {e}")))?;

        let trigger = Locator::css(&self.config.selectors.export_button);
        let download = self
            .driver
            .expect_download(&trigger, self.config.timeouts.download)
            .await
            .map_err(|e| failed(format!("download did not complete: {e}")))?;
        debug!(
            from = %download.path.display(),
            suggested = download.suggested_name.as_deref().unwrap_or("-"),
            "download captured"
        );

        persist(&download.path, dest)
            .await
            .map_err(|e| failed(format!("saving download: {e}")))?;

        let bytes = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(e) => return Err(failed(format!("artifact missing after save: {e}"))),
        };
        if bytes == 0 {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(failed("downloaded file is empty".into()));
        }

        info!(path = %dest.display(), bytes, "settings exported");
        Ok(ExportArtifact {
            path: dest.to_path_buf(),
            bytes,
        })
    }

    // ── Import ──────────────────────────────────────────────────────

    /// Upload `src` as the device configuration, declining network settings.
    ///
    /// Returns once the UI answers again after the device reboot.
    pub async fn import(&mut self, src: &Path) -> Result<(), CoreError> {
        let failed = |reason: String| CoreError::ImportFailed {
            path: src.to_path_buf(),
            reason,
        };

        if !tokio::fs::try_exists(src).await.unwrap_or(false) {
            return Err(failed("file does not exist".into()));
        }
        let absolute = tokio::fs::canonicalize(src)
            .await
            .map_err(|e| failed(format!("cannot resolve absolute path: {e}")))?;

        let nav = self.config.selectors.maintenance_nav.clone();
        self.open(&nav)
            .await
            .map_err(|e| failed(format!("navigating to import control: {e}")))?;

        let input = Locator::css(&self.config.selectors.import_file_input);
        self.driver
            .choose_file(&input, &absolute, self.config.timeouts.element)
            .await
            .map_err(|e| failed(format!("file chooser: {e}")))?;

        // "Include network settings?" Always no.
        self.popup
            .resolve(&mut self.driver, ButtonChoice::NO)
            .await
            .map_err(|e| failed(format!("network settings prompt: {e}")))?;
        info!(file = %absolute.display(), "settings import confirmed, device applying");

        self.recover_session()
            .await
            .map_err(|e| failed(e.to_string()))
    }

    /// Reload the page until the ready marker shows, under the retry policy.
    pub async fn recover_session(&mut self) -> Result<(), CoreError> {
        let policy: RetryPolicy = self.config.retry;
        let ready = self.config.selectors.ready();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match self.driver.reload().await {
                Ok(()) => {
                    self.driver
                        .wait_for(&ready, ElementState::Visible, self.config.timeouts.ready)
                        .await
                }
                Err(e) => Err(e),
            };
            let err = match result {
                Ok(()) => {
                    debug!(attempt, "UI session recovered");
                    return Ok(());
                }
                Err(e) => e,
            };

            match policy.decide(attempt, &err) {
                Decision::GiveUp => {
                    return Err(CoreError::SessionNotRecovered {
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
                Decision::Refresh | Decision::Backoff => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "UI not ready yet, reloading again"
                    );
                    policy.pause().await;
                }
            }
        }
    }

    // ── Field write ─────────────────────────────────────────────────

    /// Type `value` into the target field, save, and dismiss the success dialog.
    pub async fn write_field(&mut self, value: &str) -> Result<(), CoreError> {
        let failed = |reason: String| CoreError::FieldWriteFailed { reason };
        let timeout = self.config.timeouts.element;

        let nav = self.config.selectors.field_nav.clone();
        self.open(&nav)
            .await
            .map_err(|e| failed(format!("navigating to field: {e}")))?;

        let input = Locator::css(&self.config.selectors.field_input);
        let save = Locator::css(&self.config.selectors.field_save);

        self.driver
            .fill(&input, value, timeout)
            .await
            .map_err(|e| failed(format!("filling field: {e}")))?;
        self.driver
            .wait_for(&save, ElementState::Enabled, timeout)
            .await
            .map_err(|e| failed(format!("save button never enabled: {e}")))?;
        self.driver
            .click(&save, timeout)
            .await
            .map_err(|e| failed(format!("clicking save: {e}")))?;

        self.popup
            .resolve(&mut self.driver, ButtonChoice::Last)
            .await
            .map_err(|e| failed(format!("success dialog: {e}")))?;

        debug!(value, "field written through UI");
        Ok(())
    }
}

async fn remove_stale(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed previous artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy `from` to `dest` through a `.part` sibling and rename into place.
async fn persist(from: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::copy(from, &partial).await?;
    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}
