use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::gemini::LlmClient;
use super::{Extraction, OpeningExtractor};

/// Extraction adapter over a generative model.
///
/// The model is treated as unreliable by contract: any transport failure
/// or output that does not parse as the full schema collapses to
/// `Extraction::empty()`, and the run continues.
pub struct GeminiExtractor {
    llm: Arc<dyn LlmClient>,
}

impl GeminiExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

fn build_prompt(title: &str, description: &str, transcript: &str) -> String {
    format!(
        r#"IMPORTANT:
- Respond with STRICT VALID JSON only.
- No markdown.
- No explanations.
- No trailing commas.

You are an AI assistant that extracts job and internship openings from YouTube videos.

Input Data:

Video Title:
{title}

Video Description:
{description}

Video Transcript:
{transcript}

Your Tasks:
1. Determine whether this video contains one or more genuine job or internship openings.
2. If multiple openings are mentioned, extract EACH opening separately.
3. Ignore promotions, sponsorships, personal mentoring, WhatsApp channels, referrals, discounts, and unrelated links.
4. Prefer official application links (Google Forms, company career pages, HR-shared links).
5. Normalize and correct company names if misspelled due to transcription errors.
6. If workMode is "Remote", set location explicitly to "WFH".

Return STRICT JSON in the following schema ONLY:

{{
"isJobVideo": boolean,
"openings": [
    {{
    "company": "string" | null,
    "role": "string" | null,
    "employmentType": "Internship" | "Full-time" | "Contract" | null,
    "workMode": "On-site" | "Remote" | "Hybrid" | null,
    "duration": "string" | null,
    "location": "string" | null,
    "requiredSkills": ["string"],
    "applyLink": "string" | null,
    "summary": "string"
    }}
]
}}

Rules:
- If no real job or internship is present, return isJobVideo=false and an empty openings array.
- Summary must be concise (max 60-80 words per opening).
- Do not hallucinate missing information; use null if unclear.
"#
    )
}

/// Strict parse of the model's reply, with recovery for the two ways
/// models commonly violate the no-markdown contract: code fences around
/// the document, and commentary before or after it.
pub(crate) fn parse_extraction(raw: &str) -> Option<Extraction> {
    let trimmed = raw.trim();

    if let Ok(extraction) = serde_json::from_str::<Extraction>(trimmed) {
        return Some(extraction);
    }

    // Fenced: ```json ... ``` (or a bare ``` fence)
    if let Some(inner) = strip_code_fence(trimmed) {
        if let Ok(extraction) = serde_json::from_str::<Extraction>(inner) {
            return Some(extraction);
        }
    }

    // Commentary around the document: take the outermost brace span.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start < end {
        if let Ok(extraction) = serde_json::from_str::<Extraction>(&trimmed[start..=end]) {
            return Some(extraction);
        }
    }

    None
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the optional language tag on the opening fence line.
    let body_start = rest.find('\n')?;
    let body = &rest[body_start + 1..];
    let body = body.trim_end();
    Some(body.strip_suffix("```").unwrap_or(body).trim())
}

#[async_trait]
impl OpeningExtractor for GeminiExtractor {
    async fn extract(&self, title: &str, description: &str, transcript: &str) -> Extraction {
        let prompt = build_prompt(title, description, transcript);

        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Extraction call failed, treating video as not job-bearing: {}", e);
                return Extraction::empty();
            }
        };

        match parse_extraction(&raw) {
            Some(extraction) => extraction,
            None => {
                let preview: String = raw.chars().take(200).collect();
                warn!(
                    response_preview = %preview,
                    "Extraction reply did not match the expected schema, degrading to empty result"
                );
                Extraction::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::gemini::LlmError;
    use super::super::{EmploymentType, WorkMode};
    use super::*;

    struct CannedLlm {
        reply: Result<String, ()>,
    }

    impl CannedLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: Err(()) })
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(LlmError::EmptyCompletion),
            }
        }
    }

    const TWO_OPENINGS: &str = r#"{
        "isJobVideo": true,
        "openings": [
            {
                "company": "Acme",
                "role": "Backend Intern",
                "employmentType": "Internship",
                "workMode": "Remote",
                "duration": "6 months",
                "location": "WFH",
                "requiredSkills": ["Rust", "SQL"],
                "applyLink": "https://acme.example/careers/42",
                "summary": "Backend internship on the billing team."
            },
            {
                "company": "Globex",
                "role": "Data Engineer",
                "employmentType": "Full-time",
                "workMode": "On-site",
                "duration": null,
                "location": "Bengaluru",
                "requiredSkills": ["Python"],
                "applyLink": null,
                "summary": "Full-time data engineering role."
            }
        ]
    }"#;

    #[test]
    fn parses_full_schema() {
        let extraction = parse_extraction(TWO_OPENINGS).expect("should parse");

        assert!(extraction.is_job_video);
        assert_eq!(extraction.openings.len(), 2);

        let first = &extraction.openings[0];
        assert_eq!(first.employment_type, Some(EmploymentType::Internship));
        assert_eq!(first.work_mode, Some(WorkMode::Remote));
        assert_eq!(first.required_skills, vec!["Rust", "SQL"]);

        let second = &extraction.openings[1];
        assert_eq!(second.employment_type, Some(EmploymentType::FullTime));
        assert_eq!(second.work_mode, Some(WorkMode::OnSite));
        assert_eq!(second.apply_link, None);
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{}\n```", TWO_OPENINGS);
        let extraction = parse_extraction(&fenced).expect("should parse fenced reply");
        assert_eq!(extraction.openings.len(), 2);
    }

    #[test]
    fn parses_reply_with_commentary() {
        let noisy = format!("Here is the result:\n{}\nHope that helps!", TWO_OPENINGS);
        let extraction = parse_extraction(&noisy).expect("should parse noisy reply");
        assert!(extraction.is_job_video);
    }

    #[test]
    fn malformed_reply_fails_closed() {
        assert!(parse_extraction("not json at all").is_none());
        assert!(parse_extraction(r#"{"isJobVideo": "maybe"}"#).is_none());
        assert!(parse_extraction(r#"{"openings": []}"#).is_none());
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_empty() {
        let extractor = GeminiExtractor::new(CannedLlm::failing());
        let result = extractor.extract("t", "d", "tr").await;
        assert_eq!(result, Extraction::empty());
    }

    #[tokio::test]
    async fn malformed_output_degrades_to_empty() {
        let extractor = GeminiExtractor::new(CannedLlm::replying("```json\n{broken"));
        let result = extractor.extract("t", "d", "tr").await;
        assert_eq!(result, Extraction::empty());
    }

    #[tokio::test]
    async fn remote_location_is_passed_through_unmodified() {
        // A reply that violates the Remote => WFH prompt rule must not be
        // corrected here; the extractor's output is trusted as-is.
        let reply = r#"{
            "isJobVideo": true,
            "openings": [{
                "company": "Initech",
                "role": "QA Engineer",
                "employmentType": "Contract",
                "workMode": "Remote",
                "duration": null,
                "location": "Pune",
                "requiredSkills": [],
                "applyLink": null,
                "summary": "Remote QA contract."
            }]
        }"#;

        let extractor = GeminiExtractor::new(CannedLlm::replying(reply));
        let result = extractor.extract("t", "d", "tr").await;

        assert_eq!(result.openings[0].work_mode, Some(WorkMode::Remote));
        assert_eq!(result.openings[0].location.as_deref(), Some("Pune"));
    }

    #[test]
    fn prompt_embeds_all_three_inputs() {
        let prompt = build_prompt("Title X", "Desc Y", "Transcript Z");
        assert!(prompt.contains("Title X"));
        assert!(prompt.contains("Desc Y"));
        assert!(prompt.contains("Transcript Z"));
    }
}
