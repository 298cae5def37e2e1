//! SkyAR end-to-end runner
//!
//! Run with: cargo run --package skyar-e2e -- --base-url http://localhost:8002

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skyar_e2e::{write_results, Harness, HarnessConfig, HarnessResult};

#[derive(Parser, Debug)]
#[command(name = "skyar-e2e")]
#[command(about = "End-to-end API checks for the SkyAR demo service")]
#[command(version)]
struct Args {
    /// TOML configuration file (missing file means defaults)
    #[arg(short, long, default_value = "skyar-e2e.toml")]
    config: PathBuf,

    /// Base URL of the service under test
    #[arg(long, env = "SKYAR_BASE_URL")]
    base_url: Option<String>,

    /// Video file to upload
    #[arg(long, env = "SKYAR_VIDEO_PATH")]
    video: Option<PathBuf>,

    /// Directory for the downloaded result
    #[arg(long, env = "SKYAR_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Maximum status checks before giving up
    #[arg(long, env = "SKYAR_MAX_POLL_ATTEMPTS")]
    max_poll_attempts: Option<u32>,

    /// Delay between status checks in seconds
    #[arg(long, env = "SKYAR_POLL_INTERVAL")]
    poll_interval: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Sky template to process the video with
    #[arg(long)]
    sky_template: Option<String>,

    /// Write the run summary as JSON to this path
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> HarnessResult<HarnessConfig> {
        let mut config = HarnessConfig::load(&self.config)?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(video) = self.video {
            config.video_path = video;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(attempts) = self.max_poll_attempts {
            config.max_poll_attempts = attempts;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval_secs = interval;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
        if let Some(template) = self.sky_template {
            config.process.sky_template = template;
        }
        if let Some(results) = self.results {
            config.results_path = Some(results);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> HarnessResult<i32> {
    let config = args.into_config()?;
    let results_path = config.results_path.clone();
    let mut harness = Harness::new(config)?;

    let cancel = harness.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping status polling");
            cancel.cancel();
        }
    });

    let summary = harness.run().await;

    if let Some(path) = results_path {
        write_results(&summary, &path)?;
    }

    info!("Exit code {}", summary.exit_code());
    Ok(summary.exit_code())
}
