use crate::chat::{self, ChatClient};
use crate::engine::cycle;
use crate::feed::Fetcher;
use crate::storage::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Run detection cycles on a fixed interval until shutdown.
///
/// A single task owns the cycle, so cycles never overlap by construction;
/// `MissedTickBehavior::Skip` drops any tick that fires while a cycle is
/// still running instead of queueing a burst. The first cycle runs
/// immediately at startup.
///
/// Shutdown is edge-triggered through the watch channel. A signal arriving
/// mid-cycle cancels the cycle future at its next await point - the
/// transaction in flight rolls back, and since events are only staged after
/// a link's transaction commits, nothing is reported for an advance that
/// did not happen.
pub async fn run(
    db: Database,
    fetcher: Fetcher,
    chat_client: Arc<dyn ChatClient>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(period_secs = period.as_secs(), "update-detection scheduler started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("scheduler shutting down");
                break;
            }
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("shutdown during cycle, in-flight transaction rolls back");
                break;
            }
            result = cycle::run_cycle(&db, &fetcher) => match result {
                Ok(report) => chat::deliver_events(chat_client.as_ref(), &report).await,
                // The task must survive to run the next scheduled cycle.
                Err(e) => tracing::error!(error = %e, "detection cycle failed"),
            }
        }
    }
}
