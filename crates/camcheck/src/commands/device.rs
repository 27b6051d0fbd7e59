//! Direct query API commands: `get` and `set`.

use std::collections::BTreeMap;

use serde_json::json;

use camcheck_api::{DeviceClient, Mode, WriteOutcome};
use camcheck_core::SuiteConfig;

use crate::cli::{GetArgs, GlobalOpts, OutputFormat, ReadMode, SetArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, KeyValueRow};

fn client(suite: &SuiteConfig) -> Result<DeviceClient, CliError> {
    Ok(suite.device_client()?)
}

pub async fn get(args: GetArgs, suite: &SuiteConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = client(suite)?;
    let mode = match args.mode {
        ReadMode::Read => Mode::Read,
        ReadMode::Verify => Mode::Verify,
    };
    let record = client.get_with_mode(&args.action, mode).await?;

    let out = match args.field {
        Some(key) => {
            let Some(value) = record.get(&key) else {
                return Err(CliError::FieldMissing {
                    action: args.action,
                    key,
                });
            };
            if matches!(global.output, OutputFormat::Plain) {
                value.to_owned()
            } else {
                let rows = [KeyValueRow::new(&key, value)];
                let data = BTreeMap::from([(key.as_str(), value)]);
                output::render_record(&global.output, &data, &rows)?
            }
        }
        None => {
            let rows: Vec<_> = record.iter().map(|(k, v)| KeyValueRow::new(k, v)).collect();
            output::render_record(&global.output, &record, &rows)?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn set(args: SetArgs, suite: &SuiteConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = client(suite)?;
    let outcome = if args.verify {
        client.verify(&args.action, args.params).await?
    } else {
        client.set(&args.action, args.params).await?
    };

    let rows = [
        KeyValueRow::new("action", &args.action),
        KeyValueRow::new("outcome", outcome.to_string()),
    ];
    let data = json!({ "action": args.action, "outcome": outcome });
    output::print_output(
        &output::render_record(&global.output, &data, &rows)?,
        global.quiet,
    );

    if outcome == WriteOutcome::PendingReboot {
        let bar = util::spinner("Device is restarting", global);
        let ready = client.wait_until_ready(suite.timeouts.ready).await;
        bar.finish_and_clear();
        ready?;
    }
    Ok(())
}
