use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::error::Error;

/// Remote status of a submitted job, as reported by `GET /v1/get_result`.
///
/// The remote API identifies states by exact strings. Strings outside the
/// known set are non-terminal by definition and are preserved verbatim in
/// [`JobStatus::Running::stage`] so callers can still display them.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending {
        progress: Option<f64>,
    },
    /// Catch-all for non-terminal states the API may introduce.
    Running {
        stage: String,
        progress: Option<f64>,
    },
    Ready {
        result: Option<Value>,
    },
    TaskNotFound,
    RequestModerated,
    ContentModerated,
    Error {
        detail: Option<String>,
    },
}

impl JobStatus {
    /// Maps a raw poll response to a status. A payload without a string
    /// `status` field is a contract violation, not a job state.
    pub fn from_response(payload: &Value) -> Result<Self, Error> {
        let status = payload.get("status").and_then(|s| s.as_str()).ok_or_else(|| {
            Error::MalformedResponse(format!(
                "poll response has no status field: {}",
                payload
            ))
        })?;
        let progress = payload.get("progress").and_then(|p| p.as_f64());
        let result = payload.get("result").filter(|r| !r.is_null());

        Ok(match status {
            "Pending" => JobStatus::Pending { progress },
            "Ready" => JobStatus::Ready {
                result: result.cloned(),
            },
            "Task not found" => JobStatus::TaskNotFound,
            "Request Moderated" => JobStatus::RequestModerated,
            "Content Moderated" => JobStatus::ContentModerated,
            "Error" => JobStatus::Error {
                detail: result.map(|r| r.to_string()),
            },
            other => {
                warn!("Unrecognized job status {:?}, treating as in progress", other);
                JobStatus::Running {
                    stage: other.to_string(),
                    progress,
                }
            }
        })
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending { .. } | JobStatus::Running { .. })
    }

    /// Fractional completion in `[0, 1]` when the remote reported one.
    /// Display data only; the polling engine never branches on it.
    pub fn progress(&self) -> Option<f64> {
        match self {
            JobStatus::Pending { progress } | JobStatus::Running { progress, .. } => *progress,
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending { .. } => write!(f, "Pending"),
            JobStatus::Running { stage, .. } => write!(f, "{}", stage),
            JobStatus::Ready { .. } => write!(f, "Ready"),
            JobStatus::TaskNotFound => write!(f, "Task not found"),
            JobStatus::RequestModerated => write!(f, "Request Moderated"),
            JobStatus::ContentModerated => write!(f, "Content Moderated"),
            JobStatus::Error { .. } => write!(f, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn pending_carries_progress() {
        let status =
            JobStatus::from_response(&json!({"status": "Pending", "progress": 0.42})).unwrap();
        assert_eq!(
            status,
            JobStatus::Pending {
                progress: Some(0.42)
            }
        );
        assert!(!status.is_terminal());
    }

    #[test]
    fn pending_progress_is_optional() {
        let status = JobStatus::from_response(&json!({"status": "Pending"})).unwrap();
        assert_eq!(status, JobStatus::Pending { progress: None });
    }

    #[test_case(json!({"status": "Task not found"}), JobStatus::TaskNotFound; "task not found")]
    #[test_case(json!({"status": "Request Moderated"}), JobStatus::RequestModerated; "request moderated")]
    #[test_case(json!({"status": "Content Moderated"}), JobStatus::ContentModerated; "content moderated")]
    fn maps_terminal_failures(payload: Value, expected: JobStatus) {
        let status = JobStatus::from_response(&payload).unwrap();
        assert_eq!(status, expected);
        assert!(status.is_terminal());
    }

    #[test]
    fn error_keeps_remote_detail() {
        let status = JobStatus::from_response(
            &json!({"status": "Error", "result": {"message": "NSFW content"}}),
        )
        .unwrap();
        match status {
            JobStatus::Error { detail: Some(d) } => assert!(d.contains("NSFW content")),
            other => panic!("expected Error with detail, got {:?}", other),
        }
    }

    #[test]
    fn ready_keeps_result_payload() {
        let status = JobStatus::from_response(
            &json!({"status": "Ready", "result": {"sample": "https://x/img.png"}}),
        )
        .unwrap();
        assert_eq!(
            status,
            JobStatus::Ready {
                result: Some(json!({"sample": "https://x/img.png"}))
            }
        );
        assert!(status.is_terminal());
    }

    #[test]
    fn unknown_status_is_running_with_raw_stage() {
        let status = JobStatus::from_response(&json!({"status": "Queued", "progress": 0.0}))
            .unwrap();
        assert_eq!(
            status,
            JobStatus::Running {
                stage: "Queued".to_string(),
                progress: Some(0.0)
            }
        );
        assert!(!status.is_terminal());
        assert_eq!(status.to_string(), "Queued");
    }

    #[test]
    fn missing_status_field_is_malformed() {
        let err = JobStatus::from_response(&json!({"progress": 0.5})).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));

        let err = JobStatus::from_response(&json!({"status": 7})).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
