//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use camcheck_core::{SuiteConfig, WebDriverSession};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Spinner on stderr for long waits; hidden when quiet or not on a TTY.
pub fn spinner(message: impl Into<String>, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_message(message.into());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Start a browser session on the configured WebDriver server.
pub async fn open_browser(suite: &SuiteConfig) -> Result<WebDriverSession, CliError> {
    WebDriverSession::connect(&suite.browser, suite.timeouts.poll)
        .await
        .map_err(|e| CliError::WebDriverUnavailable {
            url: suite.browser.webdriver_url.clone(),
            reason: e.to_string(),
        })
}

/// End the browser session. A failed quit only warrants a warning.
pub async fn close_browser(session: WebDriverSession) {
    if let Err(e) = session.quit().await {
        tracing::warn!(error = %e, "browser session did not close cleanly");
    }
}
