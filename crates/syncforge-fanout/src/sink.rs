use async_trait::async_trait;
use syncforge_types::StatusUpdate;

/// Where inbound `status_update` messages go once the hub accepts them.
/// The orchestrator implements this; keeping it a trait here (rather than
/// `syncforge-fanout` depending on `syncforge-orchestrator` directly)
/// avoids a dependency cycle, matching the `EventHandler` split in
/// `syncforge-queue`.
#[async_trait]
pub trait StatusUpdateSink: Send + Sync {
    async fn accept(&self, update: StatusUpdate);
}
