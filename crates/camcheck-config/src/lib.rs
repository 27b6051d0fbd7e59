//! Configuration for camcheck.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), and
//! translation to `camcheck_core::SuiteConfig`. The CLI layers its flag
//! overrides on top of a profile before translating it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use camcheck_api::{Credentials, RetryPolicy, TlsMode};
use camcheck_core::{BrowserSettings, DeviceSettings, FieldTarget, Selectors, SuiteConfig};

/// Keyring service name for stored device passwords.
pub const KEYRING_SERVICE: &str = "camcheck";

/// Environment variable checked first for the device password.
pub const PASSWORD_ENV: &str = "CAMCHECK_PASSWORD";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CAMCHECK_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password found for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

/// Values applied when a profile leaves them unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Seconds to wait for the device after a reboot.
    #[serde(default = "default_ready_wait")]
    pub ready_wait: u64,

    #[serde(default = "default_webdriver")]
    pub webdriver: String,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            ready_wait: default_ready_wait(),
            webdriver: default_webdriver(),
            headless: default_headless(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    3000
}
fn default_ready_wait() -> u64 {
    15
}
fn default_webdriver() -> String {
    "http://localhost:9515".into()
}
fn default_headless() -> bool {
    true
}

/// A named camera profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Device base URL (e.g., "http://192.168.0.90").
    pub device: String,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates. Defaults to true: cameras ship
    /// self-signed certificates.
    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub ready_wait: Option<u64>,

    /// WebDriver server URL.
    pub webdriver: Option<String>,
    pub headless: Option<bool>,

    /// Export artifact path.
    pub artifact: Option<PathBuf>,

    /// API action and key of the round-trip probe field.
    pub field_action: Option<String>,
    pub field_key: Option<String>,

    /// UI selector overrides.
    pub selectors: Option<Selectors>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `CAMCHECK_CONFIG`, then platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "camcheck", "camcheck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("camcheck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` (missing file means defaults) + environment.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `CAMCHECK_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMCHECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Resolve the device password for a profile.
///
/// Order: `CAMCHECK_PASSWORD` → profile `password_env` → system keyring →
/// plaintext in config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Global env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Profile's password_env
    if let Some(ref env_name) = profile.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve credentials; `None` when the profile has no username.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<Credentials>, ConfigError> {
    let Some(ref username) = profile.username else {
        return Ok(None);
    };
    let password = resolve_password(profile, profile_name)?;
    Ok(Some(Credentials::new(
        username.clone(),
        password.expose_secret().to_owned(),
    )))
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn validation(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Parse and check a device URL.
pub fn parse_device_url(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|_| validation("device", format!("invalid URL: {raw}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(validation(
            "device",
            format!("expected http or https, got '{other}'"),
        )),
    }
}

/// Build a `SuiteConfig` from a profile and the global defaults.
pub fn profile_to_suite_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SuiteConfig, ConfigError> {
    let url = parse_device_url(&profile.device)?;

    let tls = if profile.insecure.unwrap_or(true) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(validation("timeout", "must be at least 1 second"));
    }
    let attempts = profile.retry_attempts.unwrap_or(defaults.retry_attempts);
    if attempts == 0 {
        return Err(validation("retry_attempts", "must be at least 1"));
    }
    let backoff = profile.retry_backoff_ms.unwrap_or(defaults.retry_backoff_ms);

    let mut device = DeviceSettings::new(url);
    device.credentials = resolve_credentials(profile, profile_name)?;
    device.tls = tls;
    device.request_timeout = Duration::from_secs(timeout);

    let mut suite = SuiteConfig::new(device);
    suite.retry = RetryPolicy::new(attempts, Duration::from_millis(backoff));
    suite.timeouts.ready = Duration::from_secs(profile.ready_wait.unwrap_or(defaults.ready_wait));
    suite.browser = BrowserSettings {
        webdriver_url: profile
            .webdriver
            .clone()
            .unwrap_or_else(|| defaults.webdriver.clone()),
        headless: profile.headless.unwrap_or(defaults.headless),
    };
    if let Some(ref selectors) = profile.selectors {
        suite.selectors = selectors.clone();
    }
    let field = FieldTarget::default();
    suite.field = FieldTarget {
        action: profile.field_action.clone().unwrap_or(field.action),
        key: profile.field_key.clone().unwrap_or(field.key),
    };
    if let Some(ref artifact) = profile.artifact {
        suite.artifact = artifact.clone();
    }

    Ok(suite)
}
