//! Members command - show the concrete stores behind a group

use crate::cli::args::{MembersArgs, OutputFormat};
use crate::cli::Depot;
use crate::error::DepotResult;
use crate::store::{ArtifactStore, StoreKey};
use console::style;

/// Execute the members command
pub async fn execute(args: MembersArgs, depot: &Depot) -> DepotResult<()> {
    let group = StoreKey::parse(&args.group)?;
    let members = depot.resolver().resolve_concrete_members(&group, !args.all)?;

    let members = match &args.path {
        Some(path) => {
            let chain = depot.filter_chain().await?;
            chain.filter(path, &group, &members).into_owned()
        }
        None => members,
    };

    if members.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("{} has no matching members", group),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&group, &members),
        OutputFormat::Json => print_json(&members)?,
        OutputFormat::Plain => print_plain(&members),
    }

    Ok(())
}

fn print_table(group: &StoreKey, members: &[ArtifactStore]) {
    println!(
        "{:<36} {:<8} {:<8} {}",
        style("STORE").bold(),
        style("TYPE").bold(),
        style("STATE").bold(),
        style("ORIGIN").bold()
    );
    println!("{}", "-".repeat(72));

    for store in members {
        let state = if store.enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!(
            "{:<36} {:<8} {:<8} {}",
            store.key.to_string(),
            store.store_type().as_str(),
            state,
            store.remote_url().unwrap_or("-")
        );
    }

    println!();
    println!("{} member(s) in {}", members.len(), group);
}

fn print_json(members: &[ArtifactStore]) -> DepotResult<()> {
    let json = serde_json::to_string_pretty(members)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(members: &[ArtifactStore]) {
    for store in members {
        println!("{}", store.key);
    }
}
