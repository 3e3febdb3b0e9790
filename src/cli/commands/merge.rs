//! Merge command - regenerate a merged listing in a group

use crate::cli::args::MergeArgs;
use crate::cli::Depot;
use crate::content::{GroupMergeHelper, ListingMerger};
use crate::error::DepotResult;
use crate::store::StoreKey;
use console::style;

/// Execute the merge command
pub async fn execute(args: MergeArgs, depot: &Depot) -> DepotResult<()> {
    let group = StoreKey::parse(&args.group)?;
    let helper = GroupMergeHelper::new(depot.storage.clone(), depot.resolver());

    match helper.merge_from_members(&group, &args.path, &ListingMerger).await? {
        Some(transfer) => {
            let sources = helper
                .read_merge_info(&group, transfer.path())
                .await?
                .unwrap_or_default();
            println!("{} merged {} from {} member(s)", style("✓").green(), transfer, sources.len());
            for source in sources {
                println!("  {}", source);
            }
        }
        None => println!("No member of {} has {}", group, args.path),
    }

    Ok(())
}
