// Scripted in-memory configuration UI plus a wiremock-backed device API that
// share one device state, so UI writes, exports and imports are observable
// through `DeviceClient` reads.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use camcheck_api::{Credentials, RetryPolicy};
use camcheck_core::{
    DeviceSettings, Download, ElementState, Locator, Selectors, SuiteConfig, Timeouts, UiDriver,
    UiError,
};

pub const FIELD_KEY: &str = "note";
pub const INITIAL_VALUE: &str = "factory note";

// ── Shared device ───────────────────────────────────────────────────

pub type SharedDevice = Arc<Mutex<BTreeMap<String, String>>>;

pub fn device() -> SharedDevice {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_KEY.to_owned(), INITIAL_VALUE.to_owned());
    fields.insert("language".to_owned(), "en".to_owned());
    Arc::new(Mutex::new(fields))
}

pub fn field_value(device: &SharedDevice) -> String {
    device.lock().unwrap()[FIELD_KEY].clone()
}

fn encode(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// Answers reads with the current device state.
struct DeviceApi(SharedDevice);

impl Respond for DeviceApi {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let fields = self.0.lock().unwrap();
        ResponseTemplate::new(200).set_body_string(encode(&fields))
    }
}

/// Mount the ready page and the read endpoint for `device`.
pub async fn mount_device_api(server: &MockServer, device: &SharedDevice) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<div id=\"menu\"></div>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/webSetup.cgi"))
        .and(query_param("mode", "1"))
        .respond_with(DeviceApi(Arc::clone(device)))
        .mount(server)
        .await;
}

pub fn suite_config(base_url: &str) -> SuiteConfig {
    let mut device = DeviceSettings::new(Url::parse(base_url).unwrap());
    device.credentials = Some(Credentials::new("admin", "secret"));

    let mut config = SuiteConfig::new(device);
    config.retry = RetryPolicy::new(3, Duration::from_millis(1));
    config.timeouts = Timeouts {
        element: Duration::from_millis(50),
        dialog: Duration::from_millis(50),
        download: Duration::from_millis(50),
        ready: Duration::from_millis(200),
        poll: Duration::from_millis(2),
    };
    config
}

// ── Fake UI ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Notice,
    ImportPrompt,
}

static NEXT_DIALOG_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone)]
pub struct Dialog {
    /// Stands in for the DOM element identity.
    pub id: u32,
    pub kind: DialogKind,
    pub buttons: Vec<&'static str>,
}

impl Dialog {
    fn new(kind: DialogKind, buttons: Vec<&'static str>) -> Self {
        Self {
            id: NEXT_DIALOG_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            buttons,
        }
    }

    pub fn notice() -> Self {
        Self::new(DialogKind::Notice, vec!["OK"])
    }

    pub fn yes_no() -> Self {
        Self::new(DialogKind::ImportPrompt, vec!["Yes", "No"])
    }
}

/// Misbehaviours the fake can be told to exhibit.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Saving shows no success dialog.
    pub silent_save: bool,
    /// Dialogs ignore button clicks.
    pub sticky_dialogs: bool,
    /// Export downloads an empty file.
    pub empty_export: bool,
    /// Export reports a download whose file never reached disk.
    pub missing_export: bool,
    /// Answering the import prompt replaces it with an "applying" notice.
    pub notice_after_prompt: bool,
    /// Choosing an import file shows no confirmation prompt.
    pub no_import_prompt: bool,
    /// Import is accepted but leaves the device unchanged.
    pub import_noop: bool,
    /// UI saves report success without touching the device.
    pub ignore_writes: bool,
    /// Reloads after an import that still show no ready marker.
    pub unready_reloads: u32,
}

pub struct FakeDriver {
    pub device: SharedDevice,
    pub script: Script,
    pub dialogs: Vec<Dialog>,
    pub pressed: Vec<&'static str>,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub chosen_files: Vec<PathBuf>,
    pub reloads: u32,
    selectors: Selectors,
    pending: Option<String>,
    staged_import: Option<String>,
    ready: bool,
    unready_left: u32,
    downloads: TempDir,
}

impl FakeDriver {
    pub fn new(device: SharedDevice) -> Self {
        Self::scripted(device, Script::default())
    }

    pub fn scripted(device: SharedDevice, script: Script) -> Self {
        Self {
            device,
            script,
            dialogs: Vec::new(),
            pressed: Vec::new(),
            navigations: Vec::new(),
            clicks: Vec::new(),
            chosen_files: Vec::new(),
            reloads: 0,
            selectors: Selectors::default(),
            pending: None,
            staged_import: None,
            ready: true,
            unready_left: 0,
            downloads: tempfile::tempdir().unwrap(),
        }
    }

    fn is_dialog(&self, target: &Locator) -> bool {
        target.selector() == self.selectors.dialog && target.parent().is_none()
    }

    fn is_dialog_button(&self, target: &Locator) -> bool {
        target.selector() == self.selectors.dialog_buttons
            && target
                .parent()
                .is_some_and(|p| p.selector() == self.selectors.dialog)
    }

    fn save_enabled(&self) -> bool {
        match &self.pending {
            Some(value) => *value != field_value(&self.device),
            None => false,
        }
    }

    fn press(&mut self, target: &Locator) -> Result<(), UiError> {
        let Some(top) = self.dialogs.last() else {
            return Err(UiError::NotFound(target.to_string()));
        };
        let kind = top.kind;
        let Some(label) = target.position().pick(top.buttons.clone()) else {
            return Err(UiError::NotFound(target.to_string()));
        };
        self.pressed.push(label);
        if self.script.sticky_dialogs {
            return Ok(());
        }
        self.dialogs.pop();

        if kind != DialogKind::ImportPrompt {
            return Ok(());
        }
        if self.script.notice_after_prompt {
            self.dialogs.push(Dialog::notice());
        }
        if let Some(content) = self.staged_import.take() {
            if !self.script.import_noop {
                *self.device.lock().unwrap() = decode(&content);
            }
            // Device reboots to apply the file.
            self.ready = false;
            self.unready_left = self.script.unready_reloads;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), UiError> {
        if !self.save_enabled() {
            return Err(UiError::timeout("#btn_save to be enabled", Duration::ZERO));
        }
        let value = self.pending.take().unwrap_or_default();
        if !self.script.ignore_writes {
            self.device
                .lock()
                .unwrap()
                .insert(FIELD_KEY.to_owned(), value);
        }
        if !self.script.silent_save {
            self.dialogs.push(Dialog::notice());
        }
        Ok(())
    }
}

impl UiDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), UiError> {
        self.navigations.push(url.to_owned());
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), UiError> {
        self.reloads += 1;
        if self.unready_left > 0 {
            self.unready_left -= 1;
        } else {
            self.ready = true;
        }
        Ok(())
    }

    async fn click(&mut self, target: &Locator, _timeout: Duration) -> Result<(), UiError> {
        if self.is_dialog_button(target) {
            return self.press(target);
        }
        if target.selector() == self.selectors.field_save {
            return self.save();
        }
        self.clicks.push(target.selector().to_owned());
        Ok(())
    }

    async fn fill(
        &mut self,
        target: &Locator,
        value: &str,
        _timeout: Duration,
    ) -> Result<(), UiError> {
        if target.selector() == self.selectors.field_input {
            self.pending = Some(value.to_owned());
        }
        Ok(())
    }

    async fn wait_for(
        &mut self,
        target: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), UiError> {
        let reached = if self.is_dialog(target) {
            match state {
                ElementState::Hidden => self.dialogs.is_empty(),
                _ => !self.dialogs.is_empty(),
            }
        } else if self.is_dialog_button(target) {
            let buttons = self.dialogs.last().map(|d| d.buttons.clone()).unwrap_or_default();
            target.position().pick(buttons).is_some()
        } else if target.selector() == self.selectors.ready_marker {
            self.ready
        } else if target.selector() == self.selectors.field_save && state == ElementState::Enabled {
            self.save_enabled()
        } else {
            true
        };

        if reached {
            Ok(())
        } else {
            Err(UiError::timeout(format!("{target} to be {state}"), timeout))
        }
    }

    async fn count(&mut self, target: &Locator) -> Result<usize, UiError> {
        Ok(if self.is_dialog(target) {
            self.dialogs.len()
        } else if self.is_dialog_button(target) {
            self.dialogs.last().map_or(0, |d| d.buttons.len())
        } else {
            1
        })
    }

    async fn element_id(&mut self, target: &Locator) -> Result<Option<String>, UiError> {
        Ok(if self.is_dialog(target) {
            let ids = self.dialogs.iter().map(|d| d.id.to_string()).collect();
            target.position().pick(ids)
        } else {
            Some(target.selector().to_owned())
        })
    }

    async fn choose_file(
        &mut self,
        _input: &Locator,
        file: &Path,
        _timeout: Duration,
    ) -> Result<(), UiError> {
        self.chosen_files.push(file.to_path_buf());
        self.staged_import = Some(std::fs::read_to_string(file)?);
        if !self.script.no_import_prompt {
            self.dialogs.push(Dialog::yes_no());
        }
        Ok(())
    }

    async fn expect_download(
        &mut self,
        trigger: &Locator,
        timeout: Duration,
    ) -> Result<Download, UiError> {
        if trigger.selector() != self.selectors.export_button {
            return Err(UiError::timeout(format!("download from {trigger}"), timeout));
        }
        let content = if self.script.empty_export {
            String::new()
        } else {
            encode(&self.device.lock().unwrap())
        };
        let path = self.downloads.path().join("config_backup.bin");
        if !self.script.missing_export {
            std::fs::write(&path, content)?;
        }
        Ok(Download {
            path,
            suggested_name: Some("config_backup.bin".into()),
        })
    }
}
