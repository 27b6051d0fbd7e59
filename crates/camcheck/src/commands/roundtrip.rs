//! The `roundtrip` command: export, contaminate, import, verify.

use camcheck_core::{RoundTrip, RoundTripPlan, RoundTripReport, SettingsController, SuiteConfig};

use crate::cli::{GlobalOpts, RoundtripArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, KeyValueRow};

fn plan(args: RoundtripArgs, suite: &SuiteConfig) -> RoundTripPlan {
    let mut plan = RoundTripPlan::new(args.artifact.unwrap_or_else(|| suite.artifact.clone()));
    if let Some(sentinel) = args.sentinel {
        plan = plan.with_sentinel(sentinel);
    }
    if let Some(dirty) = args.dirty {
        plan = plan.with_dirty(dirty);
    }
    plan
}

fn report_rows(report: &RoundTripReport, color: bool) -> Vec<KeyValueRow> {
    let stages: Vec<_> = report.stages.iter().map(ToString::to_string).collect();
    let elapsed = report.finished_at - report.started_at;
    vec![
        KeyValueRow::new(
            "field",
            format!("{}.{}", report.field.action, report.field.key),
        ),
        KeyValueRow::new("expected", &report.expected),
        KeyValueRow::new("contaminated", &report.contaminated),
        KeyValueRow::new("actual", &report.actual),
        KeyValueRow::new("verdict", output::verdict_label(report.verdict, color)),
        KeyValueRow::new("stages", stages.join(" → ")),
        KeyValueRow::new("artifact", report.artifact.display().to_string()),
        KeyValueRow::new("artifact_bytes", report.artifact_bytes.to_string()),
        KeyValueRow::new("elapsed", format!("{}s", elapsed.num_seconds())),
    ]
}

pub async fn handle(
    args: RoundtripArgs,
    suite: SuiteConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let plan = plan(args, &suite);
    let prompt = format!(
        "Run a settings round-trip on {}? The field {}.{} is overwritten and the camera restarts.",
        suite.device.url, suite.field.action, suite.field.key
    );
    if !util::confirm(&prompt, "roundtrip", global)? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let client = suite.device_client()?;
    let session = util::open_browser(&suite).await?;
    let mut controller = SettingsController::new(session, suite);

    let bar = util::spinner("Running settings round-trip", global);
    let result = RoundTrip::new(&mut controller, &client).run(&plan).await;
    bar.finish_and_clear();
    util::close_browser(controller.into_driver()).await;
    let report = result?;

    let rows = report_rows(&report, output::should_color(&global.color));
    output::print_output(
        &output::render_record(&global.output, &report, &rows)?,
        global.quiet,
    );

    if report.passed() {
        Ok(())
    } else {
        Err(CliError::Mismatch {
            field: format!("{}.{}", report.field.action, report.field.key),
            expected: report.expected,
            actual: report.actual,
        })
    }
}
