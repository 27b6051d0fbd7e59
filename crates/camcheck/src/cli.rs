//! Clap derive structures for the `camcheck` CLI.
//!
//! Defines the command tree, global flags, and shared types. Only depends on
//! clap and clap_complete so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camcheck -- settings round-trip validator for network camera web UIs
#[derive(Debug, Parser)]
#[command(
    name = "camcheck",
    version,
    about = "Validate camera configuration export/import through the web UI and API",
    long_about = "Drives a network camera's web configuration UI through WebDriver and\n\
        cross-checks device state through its webSetup.cgi query API.\n\n\
        The `roundtrip` command writes a sentinel value, exports the settings,\n\
        overwrites the value, re-imports the export and verifies the sentinel\n\
        survived the device reboot.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "CAMCHECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device URL, e.g. http://192.168.0.90 (overrides profile)
    #[arg(long, short = 'd', env = "CAMCHECK_DEVICE", global = true)]
    pub device: Option<String>,

    /// Username for HTTP Basic auth (overrides profile)
    #[arg(long, short = 'u', env = "CAMCHECK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAMCHECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CAMCHECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CAMCHECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Attempts per request, including the first (overrides profile)
    #[arg(long, env = "CAMCHECK_RETRIES", global = true)]
    pub retries: Option<u32>,

    /// WebDriver server URL (overrides profile)
    #[arg(long, env = "CAMCHECK_WEBDRIVER", global = true)]
    pub webdriver: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    pub headed: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read an action through the query API
    Get(GetArgs),

    /// Write parameters through the command API
    Set(SetArgs),

    /// Export the device settings file through the web UI
    Export(ExportArgs),

    /// Import a settings file through the web UI (the device reboots)
    Import(ImportArgs),

    /// Run the full export/mutate/import/verify round-trip
    #[command(alias = "rt")]
    Roundtrip(RoundtripArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReadMode {
    /// mode=1
    Read,
    /// mode=2
    Verify,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Action name, e.g. systemInfo
    pub action: String,

    /// Request mode
    #[arg(long, short = 'm', default_value = "read")]
    pub mode: ReadMode,

    /// Print only this key's value
    #[arg(long, short = 'f')]
    pub field: Option<String>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Action name, e.g. systemInfo
    pub action: String,

    /// Parameters as KEY=VALUE
    #[arg(required = true, value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Send as a verify request (mode=2) instead of a write (mode=0)
    #[arg(long)]
    pub verify: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS FILE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Destination file (defaults to the profile's artifact path)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Settings file previously produced by `export`
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct RoundtripArgs {
    /// Export artifact location (defaults to the profile's artifact path)
    #[arg(long)]
    pub artifact: Option<PathBuf>,

    /// Value written before export and expected after import
    #[arg(long)]
    pub sentinel: Option<String>,

    /// Value written after export to prove the import restored state
    #[arg(long)]
    pub dirty: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets redacted)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key, e.g. device, username, retry_attempts
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the device password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
