// Retention sweeper
//
// Notifications have no delete path of their own; retention is an
// explicit, opt-in policy. When enabled, a background task purges
// records older than the configured window on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use caredesk_core::NotificationStore;

/// How often the purge runs once retention is enabled
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// One purge pass: delete everything older than the retention window
pub async fn purge_pass(store: &Arc<dyn NotificationStore>, retention: chrono::Duration) {
    let cutoff = Utc::now() - retention;
    match store.purge_older_than(cutoff).await {
        Ok(0) => tracing::debug!(%cutoff, "Retention sweep found nothing to purge"),
        Ok(purged) => tracing::info!(%cutoff, purged, "Retention sweep purged notifications"),
        Err(e) => tracing::warn!(%cutoff, error = %e, "Retention sweep failed"),
    }
}

/// Spawn the hourly retention sweep
pub fn spawn(store: Arc<dyn NotificationStore>, retention: chrono::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            purge_pass(&store, retention).await;
        }
    })
}
