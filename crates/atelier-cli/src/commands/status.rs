use anyhow::Result;
use atelier::{extract_artifact, JobStatus};
use console::style;

use super::build_client;
use crate::cli::StatusArgs;

pub async fn handle_status(args: StatusArgs) -> Result<()> {
    let client = build_client(args.api_key)?;
    let status = client.get_result(&args.id).await?;

    println!("Status: {}", style(&status).bold());
    if let Some(progress) = status.progress() {
        println!("Progress: {:.0}%", progress.clamp(0.0, 1.0) * 100.0);
    }
    if let JobStatus::Ready { .. } = status {
        if let Ok(artifact) = extract_artifact(&status) {
            println!("Image: {}", artifact.url);
        }
    }
    if let JobStatus::Error {
        detail: Some(detail),
    } = &status
    {
        println!("Detail: {}", detail);
    }
    Ok(())
}
