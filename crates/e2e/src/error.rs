//! Error types for the SkyAR harness

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Test video not found at {}", .0.display())]
    MissingVideo(PathBuf),

    #[error("No video ID available for {0}")]
    MissingJobReference(&'static str),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Expected {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Response doesn't match expected format: {0}")]
    Contract(String),

    #[error("Processing failed: {0}")]
    RemoteFailure(String),

    #[error("Processing did not complete within the expected time ({0} attempts)")]
    PollTimeout(u32),

    #[error("Wait cancelled")]
    Cancelled,

    #[error("Downloaded file is empty or missing: {}", .0.display())]
    EmptyDownload(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HarnessError {
    /// Whether the failure was detected locally before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            HarnessError::MissingVideo(_) | HarnessError::MissingJobReference(_)
        )
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
