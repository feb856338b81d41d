use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::extractor::Opening;

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected the message with status {0}")]
    Rejected(u16),
}

/// Renders and transmits one job alert message. Retry policy belongs to
/// the caller (there is none: delivery is best effort per run).
#[async_trait]
pub trait AlertMailer: Send + Sync {
    async fn send_job_alert(
        &self,
        recipient: &str,
        openings: &[Opening],
        unsubscribe_token: &str,
    ) -> Result<(), MailError>;
}

/// SendGrid v3 mail client.
pub struct SendGridMailer {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    base_url: String,
}

impl SendGridMailer {
    pub fn new(http: reqwest::Client, api_key: String, from_email: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            from_email,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    reply_to: Address<'a>,
    subject: String,
    content: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build the HTML digest: one card per opening plus an unsubscribe footer.
pub(crate) fn render_job_alert(openings: &[Opening], unsubscribe_link: &str) -> String {
    let mut cards = String::new();

    for opening in openings {
        let role = escape_html(opening.role.as_deref().unwrap_or("N/A"));
        let company = escape_html(opening.company.as_deref().unwrap_or("N/A"));
        let employment_type = opening
            .employment_type
            .map(|t| match t {
                crate::extractor::EmploymentType::Internship => "Internship",
                crate::extractor::EmploymentType::FullTime => "Full-time",
                crate::extractor::EmploymentType::Contract => "Contract",
            })
            .unwrap_or("N/A");
        let work_mode = opening
            .work_mode
            .map(|m| match m {
                crate::extractor::WorkMode::OnSite => "On-site",
                crate::extractor::WorkMode::Remote => "Remote",
                crate::extractor::WorkMode::Hybrid => "Hybrid",
            })
            .unwrap_or("N/A");
        let location = escape_html(opening.location.as_deref().unwrap_or("N/A"));
        let duration = opening
            .duration
            .as_deref()
            .map(|d| format!("<span>Duration: {}</span>", escape_html(d)))
            .unwrap_or_default();
        let skills = if opening.required_skills.is_empty() {
            "Not specified".to_string()
        } else {
            escape_html(&opening.required_skills.join(", "))
        };
        let summary = escape_html(&opening.summary);
        let apply_link = escape_html(opening.apply_link.as_deref().unwrap_or("#"));

        cards.push_str(&format!(
            r#"<div class="job-card">
  <div class="job-title">{role}</div>
  <div class="company">{company}</div>
  <div class="meta">
    <span>{employment_type}</span>
    <span>{work_mode}</span>
    <span>{location}</span>
    {duration}
  </div>
  <div class="skills"><strong>Skills:</strong> {skills}</div>
  <div class="summary">{summary}</div>
  <a class="apply-btn" href="{apply_link}" target="_blank">Apply Now</a>
</div>
"#
        ));
    }

    format!(
        r#"<html>
<body>
  <h2>New Job Openings ({count})</h2>
  {cards}
  <p class="footer">
    You are receiving this because you subscribed to job alerts.
    <a href="{unsubscribe_link}">Unsubscribe</a>
  </p>
</body>
</html>"#,
        count = openings.len(),
    )
}

#[async_trait]
impl AlertMailer for SendGridMailer {
    async fn send_job_alert(
        &self,
        recipient: &str,
        openings: &[Opening],
        unsubscribe_token: &str,
    ) -> Result<(), MailError> {
        let unsubscribe_link = format!("{}/unsubscribe/{}", self.base_url, unsubscribe_token);
        let html = render_job_alert(openings, &unsubscribe_link);
        let subject = format!("New Job Openings ({})", openings.len());

        let request = SendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: recipient,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.from_email,
                name: Some("Job Alerts"),
            },
            reply_to: Address {
                email: "noreply@sendgrid.net",
                name: None,
            },
            subject,
            content: vec![Content {
                content_type: "text/html",
                value: &html,
            }],
        };

        let response = self
            .http
            .post(SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }

        debug!("Job alert email accepted for {}", recipient);
        Ok(())
    }
}
