//! CLI configuration: thin layer over `camcheck_config`.
//!
//! Picks the active profile and applies `GlobalOpts` flag overrides
//! (--device, --username, --insecure, ...) before translating it into a
//! `SuiteConfig`.

use camcheck_core::SuiteConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use camcheck_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
    store_password,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// The profile to run with, flag overrides applied.
///
/// Without a matching profile a run still works from `--device` alone.
pub fn effective_profile(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<Profile, CliError> {
    let mut profile = match config.profiles.get(profile_name) {
        Some(profile) => profile.clone(),
        None if global.device.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: available_profiles(config),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref device) = global.device {
        profile.device.clone_from(device);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(retries) = global.retries {
        profile.retry_attempts = Some(retries);
    }
    if let Some(ref webdriver) = global.webdriver {
        profile.webdriver = Some(webdriver.clone());
    }
    if global.headed {
        profile.headless = Some(false);
    }

    Ok(profile)
}

/// Build the suite configuration from the config file, profile and flags.
///
/// Returns the active profile name alongside it.
pub fn build_suite_config(global: &GlobalOpts) -> Result<(String, SuiteConfig), CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);
    let profile = effective_profile(global, &cfg, &profile_name)?;

    let suite = camcheck_config::profile_to_suite_config(&profile, &profile_name, &cfg.defaults)?;

    tracing::debug!(
        profile = %profile_name,
        device = %suite.device.url,
        attempts = suite.retry.max_attempts,
        "resolved suite configuration"
    );
    Ok((profile_name, suite))
}
