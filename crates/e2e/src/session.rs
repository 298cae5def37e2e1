//! Per-run state threaded between steps

/// Counters and job reference for one harness run.
///
/// Counters only ever grow, and `tests_passed` can never overtake
/// `tests_run`. A fresh run needs a fresh session.
#[derive(Debug, Default)]
pub struct TestSession {
    tests_run: u32,
    tests_passed: u32,
    video_id: Option<String>,
}

impl TestSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tests_run(&self) -> u32 {
        self.tests_run
    }

    pub fn tests_passed(&self) -> u32 {
        self.tests_passed
    }

    /// Count one attempted step
    pub fn record_attempt(&mut self) {
        self.tests_run += 1;
    }

    /// Count the current attempt as passed
    pub fn record_pass(&mut self) {
        if self.tests_passed < self.tests_run {
            self.tests_passed += 1;
        }
    }

    /// Job reference assigned by the upload step
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn set_video_id(&mut self, video_id: impl Into<String>) {
        self.video_id = Some(video_id.into());
    }

    /// True once every attempted step has passed
    pub fn all_passed(&self) -> bool {
        self.tests_passed == self.tests_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = TestSession::new();
        assert_eq!(session.tests_run(), 0);
        assert_eq!(session.tests_passed(), 0);
        assert!(session.video_id().is_none());
        assert!(session.all_passed());
    }

    #[test]
    fn test_pass_without_attempt_is_ignored() {
        let mut session = TestSession::new();
        session.record_pass();
        assert_eq!(session.tests_passed(), 0);

        session.record_attempt();
        session.record_pass();
        session.record_pass();
        assert_eq!(session.tests_run(), 1);
        assert_eq!(session.tests_passed(), 1);
    }

    #[test]
    fn test_failed_attempt_breaks_all_passed() {
        let mut session = TestSession::new();
        session.record_attempt();
        session.record_pass();
        session.record_attempt();
        assert!(!session.all_passed());
        assert!(session.tests_passed() <= session.tests_run());
    }

    #[test]
    fn test_video_id_is_stored() {
        let mut session = TestSession::new();
        session.set_video_id("abc123");
        assert_eq!(session.video_id(), Some("abc123"));
    }
}
