//! Processing status as reported by the status endpoint

use serde_json::Value;
use std::fmt;

/// Job state observed while polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// Any non-terminal state (queued, processing, ...), keeping the raw label
    Pending(String),
    Completed,
    Error,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingStatus::Pending(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcessingStatus::Pending(label) => label,
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Error => "error",
        }
    }
}

impl From<&str> for ProcessingStatus {
    fn from(label: &str) -> Self {
        match label {
            "completed" => ProcessingStatus::Completed,
            "error" => ProcessingStatus::Error,
            other => ProcessingStatus::Pending(other.to_string()),
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status endpoint response
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: ProcessingStatus,
    pub progress: f64,
    pub message: String,
}

impl StatusReport {
    /// Read a status body. Missing fields fall back to an `unknown` pending
    /// state, zero progress and an empty message.
    pub fn from_payload(payload: &Value) -> Self {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .map(ProcessingStatus::from)
            .unwrap_or_else(|| ProcessingStatus::Pending("unknown".to_string()));

        let progress = payload
            .get("progress")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            progress,
            message,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status: {}, Progress: {}%, Message: {}",
            self.status, self.progress, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("completed", ProcessingStatus::Completed ; "completed")]
    #[test_case("error", ProcessingStatus::Error ; "error")]
    #[test_case("processing", ProcessingStatus::Pending("processing".into()) ; "processing")]
    #[test_case("queued", ProcessingStatus::Pending("queued".into()) ; "queued")]
    fn test_classifies_labels(label: &str, expected: ProcessingStatus) {
        assert_eq!(ProcessingStatus::from(label), expected);
    }

    #[test]
    fn test_only_completed_and_error_are_terminal() {
        assert!(ProcessingStatus::Completed.is_terminal());
        assert!(ProcessingStatus::Error.is_terminal());
        assert!(!ProcessingStatus::Pending("processing".into()).is_terminal());
    }

    #[test]
    fn test_report_from_full_payload() {
        let report = StatusReport::from_payload(&json!({
            "status": "processing",
            "progress": 45,
            "message": "Replacing sky"
        }));

        assert_eq!(report.status, ProcessingStatus::Pending("processing".into()));
        assert_eq!(report.progress, 45.0);
        assert_eq!(report.message, "Replacing sky");
        assert_eq!(
            report.to_string(),
            "Status: processing, Progress: 45%, Message: Replacing sky"
        );
    }

    #[test]
    fn test_report_defaults_for_missing_fields() {
        let report = StatusReport::from_payload(&json!({}));
        assert_eq!(report.status, ProcessingStatus::Pending("unknown".into()));
        assert_eq!(report.progress, 0.0);
        assert!(report.message.is_empty());
    }
}
