// ── Suite configuration ──
//
// One immutable struct describing the device, the retry budget, every
// timeout and every UI selector. Built by the config crate or the CLI and
// handed to each component at construction; nothing here reads disk or env.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use camcheck_api::{
    ClientOptions, Credentials, DEFAULT_ENDPOINT, DeviceClient, RetryPolicy, TlsMode,
    TransportConfig,
};

use crate::error::CoreError;
use crate::popup::PopupResolver;
use crate::ui::Locator;

/// Where the device lives and how to talk to its API.
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// Device root URL, e.g. `http://192.168.0.90`.
    pub url: Url,
    pub credentials: Option<Credentials>,
    pub tls: TlsMode,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Path of the configuration endpoint.
    pub endpoint: String,
}

impl DeviceSettings {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            credentials: None,
            tls: TlsMode::DangerAcceptInvalid,
            request_timeout: Duration::from_secs(30),
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }

    /// A page URL with the credentials embedded for browser Basic auth.
    pub fn page_url(&self, path: &str) -> Result<Url, CoreError> {
        let mut url = self.url.join(path).map_err(|e| CoreError::Config {
            message: format!("invalid page path {path:?}: {e}"),
        })?;
        if let Some(ref credentials) = self.credentials {
            let embedded = url.set_username(&credentials.username).is_ok()
                && url.set_password(Some(credentials.expose_password())).is_ok();
            if !embedded {
                return Err(CoreError::Config {
                    message: format!("cannot embed credentials in {}", self.url),
                });
            }
        }
        Ok(url)
    }
}

/// Every bounded wait in the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for a UI element to reach a state.
    pub element: Duration,
    /// Waiting for a dialog to appear or to close.
    pub dialog: Duration,
    /// Waiting for an export download to complete.
    pub download: Duration,
    /// Waiting for the ready marker after a reload or reboot.
    pub ready: Duration,
    /// Interval between polls inside any of the waits above.
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(10),
            dialog: Duration::from_secs(10),
            download: Duration::from_secs(30),
            ready: Duration::from_secs(15),
            poll: Duration::from_millis(250),
        }
    }
}

/// CSS selectors for the configuration UI.
///
/// Defaults match the stock firmware pages; every entry can be overridden
/// per profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Page loaded before any navigation.
    pub home_path: String,
    /// Element whose visibility means the page and session are usable.
    pub ready_marker: String,
    /// Clicks leading from the home page to the maintenance page.
    pub maintenance_nav: Vec<String>,
    /// Button that downloads the settings file.
    pub export_button: String,
    /// File input receiving the settings file to import.
    pub import_file_input: String,
    /// Clicks leading from the home page to the page holding the target field.
    pub field_nav: Vec<String>,
    /// Free-text input for the target field.
    pub field_input: String,
    /// Save button, enabled only once the field changed.
    pub field_save: String,
    /// Modal dialog container.
    pub dialog: String,
    /// Buttons inside a dialog, in display order.
    pub dialog_buttons: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            home_path: "/".into(),
            ready_marker: "#menu".into(),
            maintenance_nav: vec!["#menu_setup".into(), "#menu_maintenance".into()],
            export_button: "#btn_export_settings".into(),
            import_file_input: "input[type=file]#import_settings_file".into(),
            field_nav: vec!["#menu_setup".into(), "#menu_system".into()],
            field_input: "#note".into(),
            field_save: "#btn_save".into(),
            dialog: ".ui-dialog".into(),
            dialog_buttons: ".ui-dialog-buttonpane button".into(),
        }
    }
}

impl Selectors {
    pub fn ready(&self) -> Locator {
        Locator::css(&self.ready_marker)
    }
}

/// Field used as the round-trip probe: written via the UI, read via the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTarget {
    /// API action whose read response carries the field.
    pub action: String,
    /// Key of the field in that response.
    pub key: String,
}

impl Default for FieldTarget {
    fn default() -> Self {
        Self {
            action: "systemInfo".into(),
            key: "note".into(),
        }
    }
}

/// WebDriver endpoint and browser options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    /// WebDriver server, e.g. chromedriver on `http://localhost:9515`.
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
        }
    }
}

/// Complete, immutable configuration for one suite run.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub device: DeviceSettings,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
    pub selectors: Selectors,
    pub field: FieldTarget,
    pub browser: BrowserSettings,
    /// Export artifact location; deleted and recreated on every export.
    pub artifact: PathBuf,
}

impl SuiteConfig {
    pub fn new(device: DeviceSettings) -> Self {
        Self {
            device,
            retry: RetryPolicy::default(),
            timeouts: Timeouts::default(),
            selectors: Selectors::default(),
            field: FieldTarget::default(),
            browser: BrowserSettings::default(),
            artifact: PathBuf::from("camera_settings.bin"),
        }
    }

    /// Options for the request client derived from this config.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            endpoint: self.device.endpoint.clone(),
            ready_path: self.selectors.home_path.clone(),
            ready_marker: None,
            ready_timeout: self.timeouts.ready,
            ready_poll: self.timeouts.poll,
            retry: self.retry,
        }
    }

    /// Build the resilient request client for this device.
    pub fn device_client(&self) -> Result<DeviceClient, CoreError> {
        let transport = TransportConfig {
            tls: self.device.tls.clone(),
            timeout: self.device.request_timeout,
            cookie_jar: None,
        };
        Ok(DeviceClient::new(
            self.device.url.clone(),
            self.device.credentials.clone(),
            &transport,
            self.client_options(),
        )?)
    }

    /// Popup resolver bound to the configured dialog selectors and timeouts.
    pub fn popup(&self) -> PopupResolver {
        PopupResolver::new(
            Locator::css(&self.selectors.dialog),
            &self.selectors.dialog_buttons,
            self.timeouts.dialog,
            self.timeouts.poll,
        )
    }
}
