use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;
use tracing_subscriber::{Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod db;
mod extractor;
mod mailer;
mod pipeline;
mod youtube;

use crate::api::cron::{CronContext, cron_config};
use crate::api::health::health_config;
use crate::db::{PgCheckpointStore, PgSubscriberDirectory};
use crate::extractor::adapter::GeminiExtractor;
use crate::extractor::gemini::GeminiClient;
use crate::mailer::SendGridMailer;
use crate::pipeline::Pipeline;
use crate::youtube::client::YouTubeClient;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from environment
    let config = config::Config::from_env().expect("Failed to load configuration");

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).expect("Failed to create logs directory");

    // File-based logging with daily rotation, plus console output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(&config.log_dir, "info.log");
    let error_file = tracing_appender::rolling::daily(&config.log_dir, "error.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(error_layer)
        .init();

    info!("Starting job-alerts application");
    info!("Configuration loaded successfully:");
    info!("  - Channel: {}", config.channel_id);
    info!("  - Max videos per run: {}", config.max_videos_per_run);
    info!("  - Max database connections: {}", config.max_db_connections);

    // Get database connection pool
    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");

    info!("Database connection pool established");

    // Run migrations on startup
    db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // One HTTP client shared by every outbound adapter
    let http = reqwest::Client::new();

    let source = Arc::new(YouTubeClient::new(
        http.clone(),
        config.youtube_api_key.clone(),
    ));
    let llm = Arc::new(GeminiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    let extractor = Arc::new(GeminiExtractor::new(llm));
    let mailer = Arc::new(SendGridMailer::new(
        http,
        config.sendgrid_api_key.clone(),
        config.from_email.clone(),
        config.base_url.clone(),
    ));
    let checkpoint = Arc::new(PgCheckpointStore::new(pool.clone()));
    let directory = Arc::new(PgSubscriberDirectory::new(pool.clone()));

    let pipeline = Arc::new(Pipeline::new(
        source,
        extractor,
        checkpoint,
        directory,
        mailer,
        config.channel_id.clone(),
        config.max_videos_per_run,
    ));

    let cron_secret = config.cron_secret.clone();
    let server_pool = pool.clone();
    let port = config.port;

    let server = HttpServer::new(move || {
        let cron_context = web::Data::new(CronContext {
            pipeline: pipeline.clone(),
            cron_secret: cron_secret.clone(),
        });

        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(cron_context)
            .configure(health_config)
            .configure(cron_config)
    });

    info!("Server starting on http://0.0.0.0:{}", port);

    server.bind(("0.0.0.0", port))?.run().await
}
