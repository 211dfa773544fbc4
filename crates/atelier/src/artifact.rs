use serde_json::Value;

use crate::error::Error;
use crate::status::JobStatus;

/// Reference to a produced image. The URL points at remote storage; the
/// bytes themselves are never fetched here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub url: String,
}

/// Pulls the artifact reference out of a `Ready` status.
///
/// The remote sometimes delivers `result` as a JSON-encoded string instead
/// of an object; both shapes normalize to the same [`Artifact`].
pub fn extract_artifact(status: &JobStatus) -> Result<Artifact, Error> {
    let result = match status {
        JobStatus::Ready {
            result: Some(result),
        } => result,
        JobStatus::Ready { result: None } => {
            return Err(Error::MalformedResult(
                "ready response carried no result payload".to_string(),
            ))
        }
        other => {
            return Err(Error::MalformedResult(format!(
                "job is not ready, current status is {}",
                other
            )))
        }
    };

    let decoded;
    let result = match result {
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw).map_err(|e| {
                Error::MalformedResult(format!("result string is not valid JSON: {}", e))
            })?;
            &decoded
        }
        other => other,
    };

    let url = result
        .get("sample")
        .and_then(|s| s.as_str())
        .ok_or_else(|| Error::MalformedResult(format!("result has no sample URL: {}", result)))?;

    Ok(Artifact {
        url: url.to_string(),
    })
}
