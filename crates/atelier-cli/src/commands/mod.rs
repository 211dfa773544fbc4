pub mod finetune;
pub mod generate;
pub mod list;
pub mod status;

use anyhow::{Context, Result};
use atelier::{ApiConfig, BflClient, FinetuneRegistry, JobStatus, PollOptions};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) fn build_client(api_key: Option<String>) -> Result<BflClient> {
    let config = match api_key {
        Some(key) => ApiConfig::from_env_with_key(key)?,
        None => ApiConfig::from_env()
            .context("set BFL_API_KEY (a .env file works too) or pass --api-key")?,
    };
    Ok(BflClient::new(config)?)
}

pub(crate) fn open_registry(path: Option<PathBuf>) -> Result<FinetuneRegistry> {
    Ok(match path {
        Some(path) => FinetuneRegistry::new(path),
        None => FinetuneRegistry::default_location()
            .context("could not locate the default registry file")?,
    })
}

/// Poll options for an interactive run: default cadence for the job kind,
/// ctrl-c cancellation, and the user's --deadline if given.
pub(crate) fn interactive_poll_options(
    kind: atelier::JobKind,
    deadline_secs: Option<u64>,
) -> PollOptions {
    let mut options = PollOptions::for_kind(kind).with_cancel(cancel_on_ctrl_c());
    if let Some(secs) = deadline_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }
    options
}

/// Token that fires on the first ctrl-c so a poll loop unwinds cleanly
/// instead of killing the process mid-write.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

pub(crate) fn progress_bar(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );
    bar.set_message(message.to_string());
    Ok(bar)
}

/// Feeds a non-terminal poll observation into the progress bar.
pub(crate) fn render_progress(bar: &ProgressBar, status: &JobStatus) {
    if let Some(progress) = status.progress() {
        bar.set_position((progress.clamp(0.0, 1.0) * 100.0) as u64);
    }
    if let JobStatus::Running { stage, .. } = status {
        bar.set_message(stage.clone());
    }
    bar.tick();
}

/// Maps a terminal status to user-facing success or error for the states
/// where the job produced nothing.
pub(crate) fn report_terminal(status: &JobStatus, job_id: &str) -> Result<()> {
    match status {
        JobStatus::Ready { .. } => Ok(()),
        JobStatus::TaskNotFound => anyhow::bail!("the remote no longer knows job {}", job_id),
        JobStatus::RequestModerated => anyhow::bail!(
            "{} the request was rejected by moderation before running",
            style("Moderated:").red().bold()
        ),
        JobStatus::ContentModerated => anyhow::bail!(
            "{} the produced content was withheld by moderation",
            style("Moderated:").red().bold()
        ),
        JobStatus::Error { detail } => match detail {
            Some(detail) => anyhow::bail!("the job failed remotely: {}", detail),
            None => anyhow::bail!("the job failed remotely without detail"),
        },
        other => anyhow::bail!("job {} is still in progress: {}", job_id, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_registry_honors_an_override_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let registry = open_registry(Some(path.clone())).unwrap();
        registry.put("cat-v1", "ft-123").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn ready_terminal_reports_success() {
        let status = JobStatus::Ready { result: None };
        assert!(report_terminal(&status, "inf-1").is_ok());
        assert!(report_terminal(&JobStatus::ContentModerated, "inf-1").is_err());
        assert!(report_terminal(&JobStatus::TaskNotFound, "inf-1").is_err());
    }
}
