//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8002";
pub const DEFAULT_VIDEO_PATH: &str = "/app/test_videos/annarbor.mp4";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Base URL of the service under test
    pub base_url: String,

    /// Local video uploaded by the upload step
    pub video_path: PathBuf,

    /// Directory the processed video is downloaded into
    pub output_dir: PathBuf,

    /// Status checks before polling gives up
    pub max_poll_attempts: u32,

    /// Delay between status checks (seconds, fractions allowed)
    pub poll_interval_secs: f64,

    /// Per-request timeout (seconds). Unset leaves the client default.
    pub request_timeout_secs: Option<u64>,

    /// Number of sky templates the service must advertise
    pub expected_templates: usize,

    /// Where to write the JSON run summary, if anywhere
    pub results_path: Option<PathBuf>,

    /// Payload sent to the processing endpoint
    pub process: ProcessOptions,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            video_path: PathBuf::from(DEFAULT_VIDEO_PATH),
            output_dir: std::env::temp_dir(),
            max_poll_attempts: 30,
            poll_interval_secs: 2.0,
            request_timeout_secs: None,
            expected_templates: 6,
            results_path: None,
            process: ProcessOptions::default(),
        }
    }
}

/// Processing options posted alongside the job reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessOptions {
    pub sky_template: String,
    pub auto_light_matching: bool,
    pub relighting_factor: f64,
    pub recoloring_factor: f64,
    pub halo_effect: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            sky_template: "floatingcastle".to_string(),
            auto_light_matching: false,
            relighting_factor: 0.8,
            recoloring_factor: 0.5,
            halo_effect: true,
        }
    }
}

impl HarnessConfig {
    /// Create a configuration pointing at `base_url`, everything else default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::Config("base_url must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(HarnessError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if !self.poll_interval_secs.is_finite() || self.poll_interval_secs < 0.0 {
            return Err(HarnessError::Config(format!(
                "poll_interval_secs must be a non-negative number of seconds, got {}",
                self.poll_interval_secs
            )));
        }
        if self.max_poll_attempts == 0 {
            return Err(HarnessError::Config(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
