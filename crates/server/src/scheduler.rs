//! In-process streak sweeper, for deployments without an external cron.

use std::time::Duration;

use chrono::Utc;
use tethered_store::StreakSweeper;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run [`StreakSweeper::sweep`] every `interval_secs` until `shutdown` flips.
pub async fn run_sweeper(
    sweeper: StreakSweeper,
    interval_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    if interval_secs == 0 {
        info!("streak sweeper disabled (interval=0)");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // Skip first tick
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let sweeper = sweeper.clone();
                match tokio::task::spawn_blocking(move || sweeper.sweep(Utc::now())).await {
                    Ok(Ok(report)) => debug!(
                        reset = report.reset_connections.len(),
                        reminders = report.reminders.len(),
                        "scheduled sweep finished"
                    ),
                    Ok(Err(e)) => warn!("scheduled sweep failed: {e}"),
                    Err(e) => warn!("scheduled sweep panicked: {e}"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("streak sweeper shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tethered_store::{Db, StoreConfig};

    #[tokio::test]
    async fn zero_interval_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        let (_tx, rx) = watch::channel(false);
        run_sweeper(StreakSweeper::new(db), 0, rx).await;
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_sweeper(StreakSweeper::new(db), 3600, rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
