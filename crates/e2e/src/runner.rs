//! Harness that drives the full API lifecycle in order

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::output;
use crate::request::RequestRunner;
use crate::session::TestSession;
use crate::steps::{self, PollSettings};

/// The fixed sequence of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    HealthCheck,
    ListTemplates,
    UploadVideo,
    StartProcessing,
    PollStatus,
    DownloadResult,
}

impl Step {
    pub const SEQUENCE: [Step; 6] = [
        Step::HealthCheck,
        Step::ListTemplates,
        Step::UploadVideo,
        Step::StartProcessing,
        Step::PollStatus,
        Step::DownloadResult,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::HealthCheck => "Health Check",
            Step::ListTemplates => "Get Sky Templates",
            Step::UploadVideo => "Upload Video",
            Step::StartProcessing => "Process Video",
            Step::PollStatus => "Status Check",
            Step::DownloadResult => "Download Result",
        }
    }

    /// Later steps need this one to have succeeded
    pub fn is_prerequisite(&self) -> bool {
        matches!(
            self,
            Step::HealthCheck | Step::ListTemplates | Step::UploadVideo | Step::StartProcessing
        )
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Step::HealthCheck => "Health check failed, stopping tests",
            Step::ListTemplates => "Failed to get sky templates, stopping tests",
            Step::UploadVideo => "Video upload failed, stopping tests",
            Step::StartProcessing => "Video processing failed to start, stopping tests",
            Step::PollStatus => "Video processing status check failed",
            Step::DownloadResult => "Video download failed",
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub passed: bool,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub video_id: Option<String>,
    /// Whether every step in the sequence was reached
    pub completed: bool,
    /// Step whose failure ended the run early
    pub stopped_at: Option<Step>,
    pub download_path: Option<PathBuf>,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.completed && self.tests_passed == self.tests_run
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Drives one run against one service. Each harness owns its own session,
/// so separate harnesses never share counters or job references.
pub struct Harness {
    config: HarnessConfig,
    runner: RequestRunner,
    session: TestSession,
    cancel: CancellationToken,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let runner = RequestRunner::new(&config.base_url, config.request_timeout())?;

        Ok(Self {
            config,
            runner,
            session: TestSession::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that interrupts status polling when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the sequence, stopping at the first failed step
    pub async fn run(&mut self) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut records = Vec::with_capacity(Step::SEQUENCE.len());
        let mut stopped_at = None;
        let mut download_path = None;

        info!("Running SkyAR API checks against {}", self.runner.base_url());

        for step in Step::SEQUENCE {
            let step_start = Instant::now();
            let result = self.execute(step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            let detail = match result {
                Ok(detail) => {
                    if step == Step::DownloadResult {
                        download_path = detail.as_ref().map(PathBuf::from);
                    }
                    records.push(StepRecord {
                        step,
                        passed: true,
                        duration_ms,
                        detail,
                    });
                    continue;
                }
                Err(e) => e.to_string(),
            };

            output::print_error(&format!("{} ({})", step.failure_message(), detail));
            records.push(StepRecord {
                step,
                passed: false,
                duration_ms,
                detail: Some(detail),
            });
            if step.is_prerequisite() {
                let skipped = Step::SEQUENCE.len() - records.len();
                warn!("Skipping {} dependent step(s)", skipped);
            }
            stopped_at = Some(step);
            break;
        }

        let summary = RunSummary {
            started_at,
            base_url: self.runner.base_url().to_string(),
            tests_run: self.session.tests_run(),
            tests_passed: self.session.tests_passed(),
            video_id: self.session.video_id().map(str::to_string),
            completed: stopped_at.is_none(),
            stopped_at,
            download_path,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: records,
        };

        output::print_summary(&summary);
        info!(
            "Test Results: {}/{} passed ({} ms)",
            summary.tests_passed, summary.tests_run, summary.duration_ms
        );
        summary
    }

    /// Run one step, returning a short detail for the record on success
    async fn execute(&mut self, step: Step) -> HarnessResult<Option<String>> {
        let runner = &self.runner;
        let session = &mut self.session;

        match step {
            Step::HealthCheck => {
                steps::health_check(runner, session).await?;
                Ok(None)
            }
            Step::ListTemplates => {
                let names =
                    steps::list_templates(runner, session, self.config.expected_templates).await?;
                Ok(Some(names.join(", ")))
            }
            Step::UploadVideo => {
                let video_id = steps::upload_video(runner, session, &self.config.video_path).await?;
                Ok(Some(video_id))
            }
            Step::StartProcessing => {
                steps::start_processing(runner, session, &self.config.process).await?;
                Ok(None)
            }
            Step::PollStatus => {
                let settings = PollSettings {
                    max_attempts: self.config.max_poll_attempts,
                    interval: self.config.poll_interval(),
                };
                let outcome = steps::poll_status(runner, session, settings, &self.cancel).await?;
                Ok(Some(format!("completed after {} attempt(s)", outcome.attempts)))
            }
            Step::DownloadResult => {
                let path = steps::download_result(runner, session, &self.config.output_dir).await?;
                Ok(Some(path.display().to_string()))
            }
        }
    }
}

/// Write a run summary as pretty JSON
pub fn write_results(summary: &RunSummary, path: &Path) -> HarnessResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;

    info!("Results written to: {}", path.display());
    Ok(())
}
