//! SkyAR API end-to-end harness
//!
//! Drives the SkyAR demo service through its public HTTP surface and checks
//! each response against the documented contract:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Harness (one run)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  GET  health                  -> exact healthy payload      │
//! │  GET  api/templates           -> 6 sky templates            │
//! │  POST api/upload              -> video_id (job reference)   │
//! │  POST api/process             -> success: true              │
//! │  GET  api/status/{video_id}   -> poll until terminal        │
//! │  GET  api/download/{video_id} -> non-empty file on disk     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first four steps are prerequisites: a failure stops the run. Counters
//! and the job reference live in a [`TestSession`] owned by the [`Harness`].

pub mod config;
pub mod error;
pub mod output;
pub mod request;
pub mod runner;
pub mod session;
pub mod status;
pub mod steps;
pub mod wait;

pub use config::{HarnessConfig, ProcessOptions};
pub use error::{HarnessError, HarnessResult};
pub use request::{ApiRequest, RequestBody, RequestRunner, StepOutcome};
pub use runner::{write_results, Harness, RunSummary, Step, StepRecord};
pub use session::TestSession;
pub use status::{ProcessingStatus, StatusReport};
