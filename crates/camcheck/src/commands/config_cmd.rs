//! Config subcommand handlers.

use std::fmt::Write as _;
use std::str::FromStr;

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Defaults, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const MASK: &str = "****";

/// Copy of `cfg` with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let profiles = cfg
        .profiles
        .iter()
        .map(|(name, p)| {
            let mut p = p.clone();
            if p.password.is_some() {
                p.password = Some(MASK.into());
            }
            (name.clone(), p)
        })
        .collect();
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: cfg.defaults.clone(),
        profiles,
    }
}

/// TOML-like text view of the config, secrets masked.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "retry_attempts = {}", d.retry_attempts);
    let _ = writeln!(out, "retry_backoff_ms = {}", d.retry_backoff_ms);
    let _ = writeln!(out, "ready_wait = {}", d.ready_wait);
    let _ = writeln!(out, "webdriver = \"{}\"", d.webdriver);
    let _ = writeln!(out, "headless = {}", d.headless);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out, "\n[profiles.{name}]");
        let _ = writeln!(out, "device = \"{}\"", p.device);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"{MASK}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(attempts) = p.retry_attempts {
            let _ = writeln!(out, "retry_attempts = {attempts}");
        }
        if let Some(ref webdriver) = p.webdriver {
            let _ = writeln!(out, "webdriver = \"{webdriver}\"");
        }
        if let Some(ref artifact) = p.artifact {
            let _ = writeln!(out, "artifact = \"{}\"", artifact.display());
        }
        if let (Some(action), Some(key)) = (&p.field_action, &p.field_key) {
            let _ = writeln!(out, "field = \"{action}.{key}\"");
        }
        if p.selectors.is_some() {
            let _ = writeln!(out, "selectors = (custom)");
        }
    }

    out
}

fn available(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}, got '{value}'"),
    })
}

/// Store the password in the keyring, or hand it back for plaintext config.
fn prompt_password_storage(profile_name: &str, password: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_password(profile_name, password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password.to_owned()))
    }
}

const SETTABLE_KEYS: &str = "device, username, password_env, ca_cert, insecure, timeout, \
    retry_attempts, retry_backoff_ms, ready_wait, webdriver, headless, artifact, \
    field_action, field_key";

fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "device" => {
            camcheck_config::parse_device_url(&value)?;
            profile.device = value;
        }
        "username" => profile.username = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "true or false")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number of seconds")?),
        "retry_attempts" | "retry-attempts" => {
            let attempts: u32 = parse_value(key, &value, "a positive number")?;
            if attempts == 0 {
                return Err(CliError::Validation {
                    field: key.into(),
                    reason: "must be at least 1".into(),
                });
            }
            profile.retry_attempts = Some(attempts);
        }
        "retry_backoff_ms" | "retry-backoff-ms" => {
            profile.retry_backoff_ms = Some(parse_value(key, &value, "milliseconds")?);
        }
        "ready_wait" | "ready-wait" => {
            profile.ready_wait = Some(parse_value(key, &value, "a number of seconds")?);
        }
        "webdriver" => profile.webdriver = Some(value),
        "headless" => profile.headless = Some(parse_value(key, &value, "true or false")?),
        "artifact" => profile.artifact = Some(value.into()),
        "field_action" | "field-action" => profile.field_action = Some(value),
        "field_key" | "field-key" => profile.field_key = Some(value),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                format_config_redacted,
                format_config_redacted,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: camcheck config init");
            } else {
                for (name, p) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", p.device);
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

/// Interactive wizard writing a single-profile config.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("camcheck configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let device: String = Input::new()
        .with_prompt("Camera URL")
        .default("http://192.168.0.10".into())
        .validate_with(|raw: &String| {
            camcheck_config::parse_device_url(raw)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Username (empty for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let (username, password) = if username.is_empty() {
        (None, None)
    } else {
        let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
        if pass.is_empty() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "password cannot be empty".into(),
            });
        }
        (Some(username), prompt_password_storage(&profile_name, &pass)?)
    };

    let defaults = Defaults::default();
    let webdriver: String = Input::new()
        .with_prompt("WebDriver server")
        .default(defaults.webdriver.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let profile = Profile {
        device,
        username,
        password,
        webdriver: (webdriver != defaults.webdriver).then_some(webdriver),
        ..Profile::default()
    };

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: camcheck get systemInfo");
    Ok(())
}
