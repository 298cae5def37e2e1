//! The individual API checks, one function per endpoint.
//!
//! Every step records exactly one attempt in the session, including steps
//! that fail a local precondition before any request is sent.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProcessOptions;
use crate::error::{HarnessError, HarnessResult};
use crate::output;
use crate::request::{ApiRequest, FileUpload, RequestRunner};
use crate::session::TestSession;
use crate::status::{ProcessingStatus, StatusReport};
use crate::wait::{pause, WaitOutcome};

pub const SERVICE_NAME: &str = "SkyAR Demo";

/// Downloads are written through a buffer of this many bytes
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Body the health endpoint must return, exactly
pub fn expected_health() -> Value {
    json!({ "status": "healthy", "service": SERVICE_NAME })
}

/// GET `health` and require the exact healthy payload
pub async fn health_check(runner: &RequestRunner, session: &mut TestSession) -> HarnessResult<()> {
    let request = ApiRequest::get("Health Check", "health");
    let result = runner
        .run_checked(session, request, |body| {
            if *body == expected_health() {
                Ok(())
            } else {
                Err(body.to_string())
            }
        })
        .await;

    match &result {
        Ok(()) => output::print_success("Health check response matches expected format"),
        Err(HarnessError::Contract(msg)) => {
            output::print_error(&format!("Health check response doesn't match expected format: {}", msg))
        }
        Err(_) => {}
    }
    result
}

/// GET `api/templates` and require exactly `expected` entries. Returns the
/// template names.
pub async fn list_templates(
    runner: &RequestRunner,
    session: &mut TestSession,
    expected: usize,
) -> HarnessResult<Vec<String>> {
    let request = ApiRequest::get("Get Sky Templates", "api/templates");
    let result = runner
        .run_checked(session, request, |body| {
            let templates = body
                .get("templates")
                .and_then(Value::as_object)
                .ok_or_else(|| "response has no 'templates' mapping".to_string())?;

            if templates.len() != expected {
                return Err(format!(
                    "Expected {} templates, got {}",
                    expected,
                    templates.len()
                ));
            }
            Ok(templates.keys().cloned().collect::<Vec<_>>())
        })
        .await;

    match &result {
        Ok(names) => output::print_success(&format!(
            "Found {} sky templates: {}",
            names.len(),
            names.join(", ")
        )),
        Err(HarnessError::Contract(msg)) => output::print_error(msg),
        Err(_) => {}
    }
    result
}

/// POST the video as multipart form data and store the returned job
/// reference in the session.
pub async fn upload_video(
    runner: &RequestRunner,
    session: &mut TestSession,
    video_path: &Path,
) -> HarnessResult<String> {
    if !video_path.exists() {
        session.record_attempt();
        let err = HarnessError::MissingVideo(video_path.to_path_buf());
        output::print_error(&err.to_string());
        return Err(err);
    }

    let upload = match FileUpload::from_path("file", video_path, "video/mp4").await {
        Ok(upload) => upload,
        Err(e) => {
            session.record_attempt();
            output::print_error(&format!("Could not read {}: {}", video_path.display(), e));
            return Err(e.into());
        }
    };
    debug!("Uploading {} ({} bytes)", upload.file_name, upload.len);

    let request = ApiRequest::post("Upload Video", "api/upload").file(upload);
    let video_id = runner
        .run_checked(session, request, |body| {
            let video_id = body
                .get("video_id")
                .and_then(Value::as_str)
                .ok_or_else(|| "response has no 'video_id'".to_string())?;
            check_video_id(video_id)?;
            Ok(video_id.to_string())
        })
        .await;

    match video_id {
        Ok(video_id) => {
            session.set_video_id(video_id.clone());
            output::print_success(&format!("Video uploaded successfully with ID: {}", video_id));
            Ok(video_id)
        }
        Err(e) => {
            if let HarnessError::Contract(msg) = &e {
                output::print_error(msg);
            }
            Err(e)
        }
    }
}

/// Payload for `api/process`
pub fn process_payload(video_id: &str, options: &ProcessOptions) -> Value {
    json!({
        "video_id": video_id,
        "sky_template": options.sky_template,
        "auto_light_matching": options.auto_light_matching,
        "relighting_factor": options.relighting_factor,
        "recoloring_factor": options.recoloring_factor,
        "halo_effect": options.halo_effect,
    })
}

/// POST the processing request for the uploaded video
pub async fn start_processing(
    runner: &RequestRunner,
    session: &mut TestSession,
    options: &ProcessOptions,
) -> HarnessResult<()> {
    let video_id = require_video_id(session, "processing")?;

    let request =
        ApiRequest::post("Process Video", "api/process").json(process_payload(&video_id, options));
    let result = runner
        .run_checked(session, request, |body| {
            if body.get("success").and_then(Value::as_bool) == Some(true) {
                Ok(())
            } else {
                Err(format!("processing was not accepted: {}", body))
            }
        })
        .await;

    match &result {
        Ok(()) => output::print_success("Video processing started successfully"),
        Err(HarnessError::Contract(msg)) => output::print_error(msg),
        Err(_) => {}
    }
    result
}

/// Polling limits
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// Terminal report and the attempt it arrived on
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub attempts: u32,
    pub report: StatusReport,
}

/// Poll `api/status/{video_id}` until a terminal state or the attempt
/// budget runs out. The whole poll counts as one test.
pub async fn poll_status(
    runner: &RequestRunner,
    session: &mut TestSession,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> HarnessResult<PollOutcome> {
    let video_id = require_video_id(session, "status check")?;
    session.record_attempt();

    let max = settings.max_attempts;
    output::print_info(&format!(
        "\n🔍 Monitoring processing status (max {} attempts)...",
        max
    ));

    for attempt in 1..=max {
        let request = ApiRequest::get(
            format!("Status Check (Attempt {}/{})", attempt, max),
            format!("api/status/{}", video_id),
        );
        let payload = runner.send(request).await.into_result()?;

        let report = StatusReport::from_payload(&payload);
        output::print_info(&report.to_string());
        debug!(attempt, status = %report.status, progress = report.progress, "Status polled");

        match report.status {
            ProcessingStatus::Completed => {
                output::print_success("Processing completed successfully!");
                session.record_pass();
                return Ok(PollOutcome {
                    attempts: attempt,
                    report,
                });
            }
            ProcessingStatus::Error => {
                output::print_error(&format!("Processing failed: {}", report.message));
                return Err(HarnessError::RemoteFailure(report.message));
            }
            ProcessingStatus::Pending(_) => {}
        }

        if attempt < max && pause(settings.interval, cancel).await == WaitOutcome::Cancelled {
            warn!("Status polling cancelled after {} attempts", attempt);
            output::print_error("Status polling cancelled");
            return Err(HarnessError::Cancelled);
        }
    }

    output::print_error("Processing did not complete within the expected time");
    Err(HarnessError::PollTimeout(max))
}

/// Stream `api/download/{video_id}` to `{output_dir}/test_download_{video_id}.mp4`.
pub async fn download_result(
    runner: &RequestRunner,
    session: &mut TestSession,
    output_dir: &Path,
) -> HarnessResult<PathBuf> {
    let video_id = require_video_id(session, "download")?;
    session.record_attempt();
    output::print_testing("Download Result");

    if let Err(msg) = check_video_id(&video_id) {
        output::print_error(&msg);
        return Err(HarnessError::Contract(msg));
    }

    let path = download_path(output_dir, &video_id);
    match stream_to_file(runner, &video_id, &path).await {
        Ok(bytes) if bytes > 0 => {
            info!("Downloaded {} bytes to {}", bytes, path.display());
            output::print_success(&format!(
                "Downloaded video successfully to {}",
                path.display()
            ));
            session.record_pass();
            Ok(path)
        }
        Ok(_) => {
            output::print_error("Downloaded file is empty or missing");
            Err(HarnessError::EmptyDownload(path))
        }
        Err(e) => {
            if !matches!(e, HarnessError::UnexpectedStatus { .. }) {
                output::print_error(&format!("Failed - Error: {}", e));
            }
            Err(e)
        }
    }
}

/// A job reference ends up in a URL path and a file name, so it must be a
/// single plain segment.
pub fn check_video_id(video_id: &str) -> Result<(), String> {
    let plain = !video_id.is_empty()
        && video_id != "."
        && video_id != ".."
        && !video_id.contains("..")
        && !video_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());

    if plain {
        Ok(())
    } else {
        Err(format!("unusable video_id {:?}", video_id))
    }
}

/// Local file the result for `video_id` is downloaded to
pub fn download_path(output_dir: &Path, video_id: &str) -> PathBuf {
    output_dir.join(format!("test_download_{}.mp4", video_id))
}

/// Write the download body to `path`, returning the size on disk
async fn stream_to_file(runner: &RequestRunner, video_id: &str, path: &Path) -> HarnessResult<u64> {
    let url = runner.url(&format!("api/download/{}", video_id));
    let mut response = runner.client().get(&url).send().await?;

    let status = response.status().as_u16();
    if status != 200 {
        let text = response.text().await.unwrap_or_default();
        output::print_error(&format!("Failed - Expected 200, got {}", status));
        output::print_info(&format!("Response: {}", text));
        return Err(HarnessError::UnexpectedStatus {
            expected: 200,
            actual: status,
        });
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
    while let Some(chunk) = response.chunk().await? {
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;

    let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    Ok(size)
}

/// Job reference, or a counted precondition failure
fn require_video_id(session: &mut TestSession, purpose: &'static str) -> HarnessResult<String> {
    match session.video_id() {
        Some(id) => Ok(id.to_string()),
        None => {
            session.record_attempt();
            let err = HarnessError::MissingJobReference(purpose);
            output::print_error(&err.to_string());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_payload_shape() {
        let payload = process_payload("abc123", &ProcessOptions::default());
        assert_eq!(
            payload,
            json!({
                "video_id": "abc123",
                "sky_template": "floatingcastle",
                "auto_light_matching": false,
                "relighting_factor": 0.8,
                "recoloring_factor": 0.5,
                "halo_effect": true,
            })
        );
    }

    #[test]
    fn test_download_path_uses_video_id() {
        assert_eq!(
            download_path(Path::new("/tmp"), "abc123"),
            PathBuf::from("/tmp/test_download_abc123.mp4")
        );
    }

    #[test]
    fn test_check_video_id() {
        assert!(check_video_id("abc123").is_ok());
        assert!(check_video_id("3f2c-9a1e_b.v2").is_ok());
        assert!(check_video_id("").is_err());
        assert!(check_video_id("..").is_err());
        assert!(check_video_id("x/../../escaped").is_err());
        assert!(check_video_id("..\\escaped").is_err());
        assert!(check_video_id("/etc/passwd").is_err());
        assert!(check_video_id("line\nbreak").is_err());
    }

    #[test]
    fn test_missing_job_reference_counts_attempt() {
        let mut session = TestSession::new();
        let err = require_video_id(&mut session, "download").unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(session.tests_run(), 1);
        assert_eq!(session.tests_passed(), 0);
    }
}
