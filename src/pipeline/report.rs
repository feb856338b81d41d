/// Which branch a run took. Drives the human-readable message in the
/// trigger response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Listing was empty; the checkpoint was left untouched.
    NoNewVideos,
    /// Videos were processed but no openings were extracted.
    NoJobsFound,
    /// Openings were found but nobody is subscribed and verified.
    NoActiveSubscribers,
    /// Openings were found and dispatch was attempted for every active
    /// subscriber.
    Completed,
}

impl RunOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RunOutcome::NoNewVideos => "No new videos",
            RunOutcome::NoJobsFound => "No jobs found",
            RunOutcome::NoActiveSubscribers => "No active subscribers",
            RunOutcome::Completed => "Job alert completed",
        }
    }
}

/// Summary of a single pipeline invocation. Ephemeral: returned to the
/// trigger caller, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub videos_processed: usize,
    pub videos_with_jobs: usize,
    pub jobs_extracted: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

impl RunReport {
    /// A report with zero across the board for runs that end before
    /// dispatch.
    pub fn zeroed(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            videos_processed: 0,
            videos_with_jobs: 0,
            jobs_extracted: 0,
            emails_sent: 0,
            emails_failed: 0,
        }
    }
}
