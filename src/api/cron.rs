use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, RunReport};

/// Header carrying the scheduler's shared secret.
const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// State shared with the trigger endpoint.
pub struct CronContext {
    pub pipeline: Arc<Pipeline>,
    pub cron_secret: Option<String>,
}

/// JSON summary returned to the scheduler on a successful run.
#[derive(Serialize)]
struct CronResponse {
    status: &'static str,
    message: &'static str,
    videos_processed: usize,
    videos_with_jobs: usize,
    jobs_extracted: usize,
    emails_sent: usize,
    emails_failed: usize,
}

impl From<RunReport> for CronResponse {
    fn from(report: RunReport) -> Self {
        Self {
            status: "success",
            message: report.outcome.message(),
            videos_processed: report.videos_processed,
            videos_with_jobs: report.videos_with_jobs,
            jobs_extracted: report.jobs_extracted,
            emails_sent: report.emails_sent,
            emails_failed: report.emails_failed,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Auth {
    /// No secret configured on the server side; distinct from a bad
    /// caller credential.
    Misconfigured,
    Denied,
    Granted,
}

fn authorize(configured: Option<&str>, presented: Option<&str>) -> Auth {
    let Some(secret) = configured else {
        return Auth::Misconfigured;
    };
    match presented {
        Some(header) if header == secret => Auth::Granted,
        _ => Auth::Denied,
    }
}

/// Protected trigger endpoint for the external scheduler.
///
/// Runs the pipeline exactly once per request. Authentication is an
/// exact-match comparison of the `x-cron-secret` header; rejected calls
/// produce no side effects. The caller always receives a structured JSON
/// outcome, even on fatal failure.
#[get("/api/cron/job-alert")]
async fn job_alert(req: HttpRequest, ctx: web::Data<CronContext>) -> impl Responder {
    let presented = req
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match authorize(ctx.cron_secret.as_deref(), presented) {
        Auth::Misconfigured => {
            error!("Trigger called but CRON_SECRET is not configured");
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "CRON_SECRET not configured"}));
        }
        Auth::Denied => {
            warn!("Trigger called with missing or invalid cron secret");
            return HttpResponse::Forbidden().json(serde_json::json!({"error": "Unauthorized"}));
        }
        Auth::Granted => {}
    }

    info!("Authorized trigger received, starting run");

    match ctx.pipeline.run_once().await {
        Ok(report) => HttpResponse::Ok().json(CronResponse::from(report)),
        Err(e) => {
            error!("Run failed: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": e.to_string()}))
        }
    }
}

pub fn cron_config(config: &mut web::ServiceConfig) {
    config.service(job_alert);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_server_secret_is_misconfiguration() {
        assert_eq!(authorize(None, Some("anything")), Auth::Misconfigured);
        assert_eq!(authorize(None, None), Auth::Misconfigured);
    }

    #[test]
    fn missing_or_wrong_header_is_denied() {
        assert_eq!(authorize(Some("s3cret"), None), Auth::Denied);
        assert_eq!(authorize(Some("s3cret"), Some("wrong")), Auth::Denied);
        assert_eq!(authorize(Some("s3cret"), Some("")), Auth::Denied);
    }

    #[test]
    fn exact_match_is_granted() {
        assert_eq!(authorize(Some("s3cret"), Some("s3cret")), Auth::Granted);
    }
}
