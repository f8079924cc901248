//! Construction-level integration tests: the full C1-C7 wiring assembles
//! from a loaded config and the resulting orchestrator can actually drive
//! a `synchronize` call end to end, without binding a real socket.

use syncforge_config::SyncforgeConfig;
use syncforge_server::app;
use syncforge_types::{EntityType, StatusUpdate, System};

#[tokio::test]
async fn runtime_assembles_and_synchronizes_an_update() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = SyncforgeConfig::load_from_dir(temp_dir.path()).expect("load config");

    let runtime = app::build(&config);
    let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
    let outcome = runtime.orchestrator.synchronize(update).await.expect("synchronize");

    assert!(outcome.success);
    assert_eq!(outcome.results.len(), 4);
}

#[tokio::test]
async fn metrics_render_reflects_recorded_syncs() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = SyncforgeConfig::load_from_dir(temp_dir.path()).expect("load config");
    let runtime = app::build(&config);

    let update = StatusUpdate::new(EntityType::Task, "T1", "Done", System::Tracker);
    runtime.orchestrator.synchronize(update).await.expect("synchronize");

    let rendered = runtime.orchestrator.monitor().render().expect("render");
    assert!(rendered.contains("syncforge_total_syncs"));
}
