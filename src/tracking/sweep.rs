//! Background eviction of idle tracking records

use crate::tracking::cache::TrackingCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a running sweeper task
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Tracking sweeper ended abnormally: {}", e);
        }
    }
}

/// Run [`TrackingCache::sweep`] every `every` on its own task
pub fn spawn_sweeper(cache: Arc<TrackingCache>, every: Duration) -> SweeperHandle {
    let (shutdown, mut stop) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = cache.sweep().await;
                    if evicted > 0 {
                        debug!("Sweeper evicted {} tracking record(s)", evicted);
                    }
                }
                _ = stop.changed() => break,
            }
        }
        debug!("Tracking sweeper stopped");
    });

    SweeperHandle { shutdown, task }
}
