use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{BflClient, JobKind};
use crate::error::Error;
use crate::status::JobStatus;

/// Cadence for fine-tune jobs, which run for minutes on the remote side.
pub const FINETUNE_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Cadence for inference jobs, which usually finish within seconds.
pub const INFERENCE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Knobs for a single polling run.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    /// Overall budget for the run. `None` polls until a terminal state.
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::Finetune => Self::new(FINETUNE_POLL_INTERVAL),
            JobKind::Inference => Self::new(INFERENCE_POLL_INTERVAL),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Polls a job until it reaches a terminal state.
///
/// `on_event` fires once per non-terminal observation, in order, before the
/// engine suspends for `interval`. The terminal status is returned, never
/// passed to `on_event`. Terminal failures (moderation, "Task not found",
/// remote error) are values, not `Err`s; `Err` means the engine itself
/// could not finish: transport trouble, cancellation, or a blown deadline.
pub async fn poll_until_terminal<F>(
    client: &BflClient,
    job_id: &str,
    options: &PollOptions,
    mut on_event: F,
) -> Result<JobStatus, Error>
where
    F: FnMut(&JobStatus),
{
    let started = Instant::now();

    loop {
        if options.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let status = client.get_result(job_id).await?;
        if status.is_terminal() {
            debug!("Job {} reached terminal state: {}", job_id, status);
            return Ok(status);
        }

        debug!("Job {} not finished yet: {}", job_id, status);
        on_event(&status);

        tokio::select! {
            _ = options.cancel.cancelled() => return Err(Error::Cancelled),
            Some(budget) = deadline_reached(options.deadline, started) => {
                return Err(Error::DeadlineExceeded(budget));
            }
            _ = sleep(options.interval) => {}
        }
    }
}

/// Resolves once the polling budget is spent. With no budget the future
/// resolves to `None` immediately, which disables its `select!` branch.
async fn deadline_reached(budget: Option<Duration>, started: Instant) -> Option<Duration> {
    let budget = budget?;
    sleep_until(started + budget).await;
    Some(budget)
}
