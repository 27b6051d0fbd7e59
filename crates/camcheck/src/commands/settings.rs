//! Settings file commands: `export` and `import` through the web UI.

use camcheck_core::{SettingsController, SuiteConfig};

use crate::cli::{ExportArgs, GlobalOpts, ImportArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, KeyValueRow};

pub async fn export(
    args: ExportArgs,
    suite: SuiteConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let dest = args.out.unwrap_or_else(|| suite.artifact.clone());
    let session = util::open_browser(&suite).await?;
    let mut controller = SettingsController::new(session, suite);

    let bar = util::spinner(format!("Exporting settings to {}", dest.display()), global);
    let result = controller.export(&dest).await;
    bar.finish_and_clear();
    util::close_browser(controller.into_driver()).await;
    let artifact = result?;

    let rows = [
        KeyValueRow::new("path", artifact.path.display().to_string()),
        KeyValueRow::new("bytes", artifact.bytes.to_string()),
    ];
    output::print_output(
        &output::render_record(&global.output, &artifact, &rows)?,
        global.quiet,
    );
    Ok(())
}

pub async fn import(
    args: ImportArgs,
    suite: SuiteConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !args.path.is_file() {
        return Err(CliError::Validation {
            field: "path".into(),
            reason: format!("{} is not a readable file", args.path.display()),
        });
    }

    let prompt = format!(
        "Import {} into {}? The camera will restart.",
        args.path.display(),
        suite.device.url
    );
    if !util::confirm(&prompt, "import", global)? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let session = util::open_browser(&suite).await?;
    let mut controller = SettingsController::new(session, suite);

    let bar = util::spinner("Importing settings and waiting for the camera", global);
    let result = controller.import(&args.path).await;
    bar.finish_and_clear();
    util::close_browser(controller.into_driver()).await;
    result?;

    if !global.quiet {
        eprintln!("✓ Imported {}", args.path.display());
    }
    Ok(())
}
