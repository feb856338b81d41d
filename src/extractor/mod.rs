pub mod adapter;
pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    Internship,
    #[serde(rename = "Full-time")]
    FullTime,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkMode {
    #[serde(rename = "On-site")]
    OnSite,
    Remote,
    Hybrid,
}

/// One structured job or internship record extracted from a video.
///
/// The extraction contract (not this code) normalizes `location` to
/// "WFH" when `work_mode` is Remote; the pipeline passes whatever the
/// extractor produced through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opening {
    pub company: Option<String>,
    pub role: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub work_mode: Option<WorkMode>,
    pub duration: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub apply_link: Option<String>,
    #[serde(default)]
    pub summary: String,
}

/// Result of extracting one video. An empty result (`is_job_video` false,
/// no openings) is legitimate, and also the degraded form every failure
/// collapses to: the schema is never treated as partially valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub is_job_video: bool,
    #[serde(default)]
    pub openings: Vec<Opening>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self {
            is_job_video: false,
            openings: Vec::new(),
        }
    }

    /// True when the video both classified as a job video and yielded at
    /// least one opening.
    pub fn has_openings(&self) -> bool {
        self.is_job_video && !self.openings.is_empty()
    }
}

/// Turns a video's text into an `Extraction`. Never fails to its caller:
/// transport errors and malformed model output degrade to
/// `Extraction::empty()` inside the implementation.
#[async_trait]
pub trait OpeningExtractor: Send + Sync {
    async fn extract(&self, title: &str, description: &str, transcript: &str) -> Extraction;
}
