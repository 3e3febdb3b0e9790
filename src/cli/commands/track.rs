//! Track command - content tracking records

use crate::cli::args::{TrackAction, TrackArgs};
use crate::cli::Depot;
use crate::error::DepotResult;
use crate::store::StoreKey;
use crate::tracking::{spawn_sweeper, StoreEffect, TrackingCache, TrackingKey, TrackingReporter};
use console::style;
use std::sync::Arc;
use std::time::Duration;

/// Execute the track command
pub async fn execute(args: TrackArgs, depot: &Depot) -> DepotResult<()> {
    let cache = Arc::new(depot.tracking_cache());
    let sweeper = spawn_sweeper(
        cache.clone(),
        Duration::from_secs(depot.config.tracking.sweep_interval_secs),
    );

    let outcome = run(args.action, depot, &cache).await;
    sweeper.shutdown().await;
    outcome
}

async fn run(action: TrackAction, depot: &Depot, cache: &Arc<TrackingCache>) -> DepotResult<()> {
    match action {
        TrackAction::Record {
            id,
            store,
            path,
            upload,
            ..
        } => {
            let key = TrackingKey::new(id)?;
            let store = StoreKey::parse(&store)?;
            let effect = if upload {
                StoreEffect::Upload
            } else {
                StoreEffect::Download
            };

            cache.record_artifact(&key, &store, &path, effect).await?;
            cache.flush_all().await?;
            println!("{} recorded {} of {}/{} for {}", style("✓").green(), effect, store, path, key);
        }

        TrackAction::Report { id, base_url } => {
            let key = TrackingKey::new(id)?;
            let base_url = base_url.unwrap_or_else(|| depot.config.tracking.api_base_url.clone());
            let reporter = TrackingReporter::new(cache.clone(), depot.storage.clone(), depot.registry.clone());

            let report = reporter.render_report(&key, &base_url).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        TrackAction::Clear { id } => {
            let key = TrackingKey::new(id)?;
            if cache.clear_record(&key).await? {
                println!("{} cleared {}", style("✓").green(), key);
            } else {
                println!("No tracking record for {}", key);
            }
        }
    }

    Ok(())
}
