// WebDriver backend for `UiDriver`
//
// Drives Chrome through a WebDriver server (chromedriver). Downloads land in
// a private temp directory configured via Chrome prefs; a download counts as
// finished once a new, non-partial file appears there with a stable size.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::prelude::*;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::{Download, ElementState, Locator, UiDriver, UiError};
use crate::config::BrowserSettings;

/// Suffixes Chrome uses while a download is still being written.
const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".tmp", ".part"];

fn driver_err(e: impl fmt::Display) -> UiError {
    UiError::Driver(e.to_string())
}

/// A live browser session.
pub struct WebDriverSession {
    driver: WebDriver,
    download_dir: TempDir,
    poll: Duration,
}

impl WebDriverSession {
    /// Start a Chrome session on the configured WebDriver server.
    pub async fn connect(settings: &BrowserSettings, poll: Duration) -> Result<Self, UiError> {
        let download_dir = tempfile::Builder::new()
            .prefix("camcheck-downloads-")
            .tempdir()?;

        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.add_arg("--headless=new").map_err(driver_err)?;
        }
        // Cameras serve self-signed certificates.
        caps.add_arg("--ignore-certificate-errors").map_err(driver_err)?;
        caps.add_experimental_option(
            "prefs",
            json!({
                "download.default_directory": download_dir.path().to_string_lossy(),
                "download.prompt_for_download": false,
                "safebrowsing.enabled": true,
            }),
        )
        .map_err(driver_err)?;

        debug!(
            server = %settings.webdriver_url,
            headless = settings.headless,
            "starting browser session"
        );
        let driver = WebDriver::new(settings.webdriver_url.as_str(), caps)
            .await
            .map_err(driver_err)?;

        Ok(Self {
            driver,
            download_dir,
            poll,
        })
    }

    /// End the browser session.
    pub async fn quit(self) -> Result<(), UiError> {
        self.driver.quit().await.map_err(driver_err)
    }

    // ── Element resolution ──────────────────────────────────────────

    /// All elements matched by the last link of `target`, with each parent
    /// resolved to its designated element first.
    async fn matches(&self, target: &Locator) -> Result<Vec<WebElement>, UiError> {
        let chain = target.chain();
        let mut scope: Option<WebElement> = None;

        for (depth, link) in chain.iter().enumerate() {
            let found = match &scope {
                None => self.driver.find_all(By::Css(link.selector())).await,
                Some(parent) => parent.find_all(By::Css(link.selector())).await,
            }
            .map_err(driver_err)?;

            let found = if link.visible_only() {
                displayed_only(found).await
            } else {
                found
            };

            if depth + 1 == chain.len() {
                return Ok(found);
            }
            match link.position().pick(found) {
                Some(element) => scope = Some(element),
                None => return Ok(Vec::new()),
            }
        }
        Ok(Vec::new())
    }

    async fn resolve(&self, target: &Locator) -> Result<Option<WebElement>, UiError> {
        Ok(target.position().pick(self.matches(target).await?))
    }

    async fn in_state(&self, target: &Locator, state: ElementState) -> Result<bool, UiError> {
        let element = self.resolve(target).await?;
        let reached = match (state, element) {
            (ElementState::Attached, element) => element.is_some(),
            (ElementState::Hidden, None) => true,
            (ElementState::Hidden, Some(el)) => !el.is_displayed().await.unwrap_or(false),
            (ElementState::Visible, Some(el)) => el.is_displayed().await.unwrap_or(false),
            (ElementState::Enabled, Some(el)) => {
                el.is_displayed().await.unwrap_or(false) && el.is_enabled().await.unwrap_or(false)
            }
            (ElementState::Visible | ElementState::Enabled, None) => false,
        };
        Ok(reached)
    }

    /// Poll until `target` is in `state`, then return the element if any.
    async fn await_state(
        &self,
        target: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<Option<WebElement>, UiError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.in_state(target, state).await? {
                return self.resolve(target).await;
            }
            if Instant::now() >= deadline {
                return Err(UiError::timeout(format!("{target} to be {state}"), timeout));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn await_element(
        &self,
        target: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<WebElement, UiError> {
        self.await_state(target, state, timeout)
            .await?
            .ok_or_else(|| UiError::NotFound(target.to_string()))
    }

    // ── Downloads ───────────────────────────────────────────────────

    fn download_entries(&self) -> Result<HashSet<PathBuf>, UiError> {
        let mut entries = HashSet::new();
        for entry in std::fs::read_dir(self.download_dir.path())? {
            entries.insert(entry?.path());
        }
        Ok(entries)
    }
}

async fn displayed_only(elements: Vec<WebElement>) -> Vec<WebElement> {
    let mut shown = Vec::with_capacity(elements.len());
    for element in elements {
        // Stale elements count as hidden.
        if element.is_displayed().await.unwrap_or(false) {
            shown.push(element);
        }
    }
    shown
}

fn is_partial(path: &Path) -> bool {
    let name = path.to_string_lossy();
    PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

impl UiDriver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), UiError> {
        trace!(url, "navigate");
        self.driver.goto(url).await.map_err(driver_err)
    }

    async fn reload(&mut self) -> Result<(), UiError> {
        trace!("reload");
        self.driver.refresh().await.map_err(driver_err)
    }

    async fn click(&mut self, target: &Locator, timeout: Duration) -> Result<(), UiError> {
        trace!(%target, "click");
        let element = self
            .await_element(target, ElementState::Visible, timeout)
            .await?;
        element.click().await.map_err(driver_err)
    }

    async fn fill(
        &mut self,
        target: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<(), UiError> {
        trace!(%target, "fill");
        let element = self
            .await_element(target, ElementState::Visible, timeout)
            .await?;
        element.clear().await.map_err(driver_err)?;
        element.send_keys(value).await.map_err(driver_err)
    }

    async fn wait_for(
        &mut self,
        target: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), UiError> {
        self.await_state(target, state, timeout).await.map(|_| ())
    }

    async fn count(&mut self, target: &Locator) -> Result<usize, UiError> {
        Ok(self.matches(target).await?.len())
    }

    async fn element_id(&mut self, target: &Locator) -> Result<Option<String>, UiError> {
        Ok(self
            .resolve(target)
            .await?
            .map(|element| element.element_id().to_string()))
    }

    async fn choose_file(
        &mut self,
        input: &Locator,
        file: &Path,
        timeout: Duration,
    ) -> Result<(), UiError> {
        debug!(%input, file = %file.display(), "injecting file into chooser");
        // File inputs are usually styled away, so only attachment is required.
        let element = self
            .await_element(input, ElementState::Attached, timeout)
            .await?;
        element
            .send_keys(file.to_string_lossy().into_owned())
            .await
            .map_err(driver_err)
    }

    async fn expect_download(
        &mut self,
        trigger: &Locator,
        timeout: Duration,
    ) -> Result<Download, UiError> {
        let before = self.download_entries()?;
        self.click(trigger, timeout).await?;

        let deadline = Instant::now() + timeout;
        let mut candidate: Option<(PathBuf, u64)> = None;

        loop {
            let fresh = self
                .download_entries()?
                .into_iter()
                .find(|path| !before.contains(path) && !is_partial(path));

            if let Some(path) = fresh {
                let size = std::fs::metadata(&path)?.len();
                match candidate {
                    // Same size on two consecutive polls: the write is done.
                    Some((ref seen, seen_size)) if *seen == path && seen_size == size => {
                        debug!(path = %path.display(), size, "download complete");
                        let suggested_name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned());
                        return Ok(Download {
                            path,
                            suggested_name,
                        });
                    }
                    _ => candidate = Some((path, size)),
                }
            }

            if Instant::now() >= deadline {
                return Err(UiError::timeout(format!("download from {trigger}"), timeout));
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}
