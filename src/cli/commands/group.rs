//! Group command - promote a store into a group's membership

use crate::cli::args::{GroupAction, GroupArgs};
use crate::cli::Depot;
use crate::error::{DepotError, DepotResult};
use crate::promote::{GroupPromoteRequest, GroupPromoteResult};
use crate::store::{StoreKey, StoreRegistry};
use console::style;

/// Execute the group command
pub async fn execute(args: GroupArgs, depot: &mut Depot) -> DepotResult<()> {
    let promotion = depot.promotion();

    let result = match args.action {
        GroupAction::Add { store, group, dry_run } => {
            let mut request = GroupPromoteRequest::new(StoreKey::parse(&store)?, StoreKey::parse(&group)?);
            request.dry_run = dry_run;
            promotion.promote_to_group(request)
        }
        GroupAction::Remove { store, group } => {
            let request = GroupPromoteRequest::new(StoreKey::parse(&store)?, StoreKey::parse(&group)?);
            promotion.rollback_group_promote(GroupPromoteResult::ok(request))
        }
    };

    if let Some(error) = result.error {
        return Err(DepotError::User(error));
    }

    if result.request.dry_run {
        println!(
            "{} {} would be added to {}",
            style("dry run:").yellow(),
            result.request.source,
            result.request.target_group
        );
        return Ok(());
    }

    persist_members(depot, &result.request.target_group).await?;
    println!(
        "{} {} members updated",
        style("✓").green(),
        result.request.target_group
    );
    Ok(())
}

/// Write the group's current membership back to the config file
async fn persist_members(depot: &mut Depot, group: &StoreKey) -> DepotResult<()> {
    let members = depot
        .registry
        .get(group)
        .map(|store| store.constituents().to_vec())
        .ok_or_else(|| DepotError::StoreNotFound(group.clone()))?;

    let entry = depot
        .config
        .stores
        .iter_mut()
        .find(|store| &store.key == group)
        .ok_or_else(|| DepotError::StoreNotFound(group.clone()))?;
    entry.members = members;

    depot.manager.save(&depot.config).await
}
