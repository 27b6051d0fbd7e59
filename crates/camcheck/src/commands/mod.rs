//! Command dispatch.

pub mod config_cmd;
pub mod device;
pub mod roundtrip;
pub mod settings;
pub mod util;

use camcheck_core::SuiteConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Run a device command against a resolved suite configuration.
pub async fn dispatch(
    cmd: Command,
    suite: SuiteConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Get(args) => device::get(args, &suite, global).await,
        Command::Set(args) => device::set(args, &suite, global).await,
        Command::Export(args) => settings::export(args, suite, global).await,
        Command::Import(args) => settings::import(args, suite, global).await,
        Command::Roundtrip(args) => roundtrip::handle(args, suite, global).await,
        // Handled before a device configuration is resolved.
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
