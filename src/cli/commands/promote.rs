//! Promote, resume and rollback commands

use crate::cli::args::{PromoteArgs, ResultArgs};
use crate::cli::Depot;
use crate::error::{DepotError, DepotResult};
use crate::promote::{PromoteRequest, PromoteResult};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Execute the promote command
pub async fn promote(args: PromoteArgs, depot: &Depot) -> DepotResult<()> {
    let request: PromoteRequest = read_json(&args.request).await?;
    let result = depot.promotion().promote(request).await?;
    finish(result, args.output.as_deref()).await
}

/// Execute the resume command
pub async fn resume(args: ResultArgs, depot: &Depot) -> DepotResult<()> {
    let previous: PromoteResult = read_json(&args.result).await?;
    let result = depot.promotion().resume(previous).await?;
    finish(result, args.output.as_deref()).await
}

/// Execute the rollback command
pub async fn rollback(args: ResultArgs, depot: &Depot) -> DepotResult<()> {
    let previous: PromoteResult = read_json(&args.result).await?;
    let result = depot.promotion().rollback(previous).await?;
    finish(result, args.output.as_deref()).await
}

/// Print the result, save it if asked, and fail if it carries an error
async fn finish(result: PromoteResult, output: Option<&Path>) -> DepotResult<()> {
    let json = serde_json::to_string_pretty(&result)?;
    println!("{}", json);

    if let Some(path) = output {
        fs::write(path, &json)
            .await
            .map_err(|e| DepotError::io(format!("writing result to {}", path.display()), e))?;
    }

    match result.error {
        Some(error) => Err(DepotError::User(format!(
            "{} path(s) left pending: {}",
            result.pending_paths.len(),
            error
        ))),
        None => Ok(()),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> DepotResult<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| DepotError::io("reading stdin", e))?;
        buf
    } else {
        fs::read_to_string(path)
            .await
            .map_err(|e| DepotError::io(format!("reading {}", path.display()), e))?
    };

    Ok(serde_json::from_str(&content)?)
}
