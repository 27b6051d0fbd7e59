#![allow(clippy::unwrap_used)]
// End-to-end round-trip runs: scripted UI for writes, wiremock device API
// for reads, both backed by the same device state.

mod support;

use pretty_assertions::assert_eq;
use wiremock::MockServer;

use camcheck_core::{
    CoreError, DEFAULT_DIRTY, DEFAULT_SENTINEL, RoundTrip, RoundTripPlan, SettingsController,
    Stage, Verdict,
};

use support::{FakeDriver, INITIAL_VALUE, Script, SharedDevice, device, field_value, suite_config};

struct Rig {
    _server: MockServer,
    _dir: tempfile::TempDir,
    device: SharedDevice,
    settings: SettingsController<FakeDriver>,
    client: camcheck_api::DeviceClient,
    plan: RoundTripPlan,
}

async fn rig(script: Script) -> Rig {
    let server = MockServer::start().await;
    let device = device();
    support::mount_device_api(&server, &device).await;

    let config = suite_config(&server.uri());
    let client = config.device_client().unwrap();
    let settings = SettingsController::new(FakeDriver::scripted(device.clone(), script), config);

    let dir = tempfile::tempdir().unwrap();
    let plan = RoundTripPlan::new(dir.path().join("camera_settings.bin"));

    Rig {
        _server: server,
        _dir: dir,
        device,
        settings,
        client,
        plan,
    }
}

#[tokio::test]
async fn test_round_trip_restores_sentinel() {
    let mut rig = rig(Script::default()).await;

    let report = RoundTrip::new(&mut rig.settings, &rig.client)
        .run(&rig.plan)
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::Pass);
    assert!(report.passed());
    assert_eq!(report.expected, DEFAULT_SENTINEL);
    assert_eq!(report.contaminated, DEFAULT_DIRTY);
    assert_eq!(report.actual, DEFAULT_SENTINEL);
    assert_eq!(
        report.stages,
        vec![
            Stage::Setup,
            Stage::Exported,
            Stage::Contaminated,
            Stage::Imported,
            Stage::Verified,
        ]
    );
    assert!(report.artifact_bytes > 0);
    assert!(report.finished_at >= report.started_at);
    assert_eq!(field_value(&rig.device), DEFAULT_SENTINEL);
    // Setup and contamination each dismissed a success dialog; import said No.
    assert_eq!(rig.settings.driver().pressed, vec!["OK", "OK", "No"]);
}

#[tokio::test]
async fn test_import_that_restores_nothing_is_a_mismatch_verdict() {
    let script = Script {
        import_noop: true,
        ..Script::default()
    };
    let mut rig = rig(script).await;

    let report = RoundTrip::new(&mut rig.settings, &rig.client)
        .run(&rig.plan)
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::Mismatch);
    assert_eq!(report.expected, DEFAULT_SENTINEL);
    assert_eq!(report.actual, DEFAULT_DIRTY);
    assert_eq!(report.stages.last(), Some(&Stage::Verified));
}

#[tokio::test]
async fn test_unobserved_contamination_aborts_run() {
    let script = Script {
        ignore_writes: true,
        ..Script::default()
    };
    let mut rig = rig(script).await;

    let err = RoundTrip::new(&mut rig.settings, &rig.client)
        .run(&rig.plan)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Contaminated));
    match err.root() {
        CoreError::ContaminationNotObserved { expected, actual } => {
            assert_eq!(expected, DEFAULT_DIRTY);
            assert_eq!(actual, INITIAL_VALUE);
        }
        other => panic!("expected ContaminationNotObserved, got: {other:?}"),
    }
    // Import never ran.
    assert!(rig.settings.driver().chosen_files.is_empty());
}

#[tokio::test]
async fn test_failed_export_aborts_before_contamination() {
    let script = Script {
        empty_export: true,
        ..Script::default()
    };
    let mut rig = rig(script).await;

    let err = RoundTrip::new(&mut rig.settings, &rig.client)
        .run(&rig.plan)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Exported));
    assert!(matches!(err.root(), CoreError::ExportFailed { .. }));
    assert_eq!(field_value(&rig.device), DEFAULT_SENTINEL);
    assert!(!rig.plan.artifact.exists());
}

#[tokio::test]
async fn test_custom_sentinels_are_used() {
    let mut rig = rig(Script::default()).await;
    let plan = rig.plan.clone().with_sentinel("KEEP-ME").with_dirty("SCRIBBLE");

    let report = RoundTrip::new(&mut rig.settings, &rig.client)
        .run(&plan)
        .await
        .unwrap();

    assert_eq!(report.actual, "KEEP-ME");
    assert_eq!(report.contaminated, "SCRIBBLE");
}
