// Main entry point for the pet portrait generation worker

use pet_portrait_worker::{
    core::{types::JobEnvelope, Config},
    orchestration::JobPipeline,
};

use anyhow::Result;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    pipeline: Arc<JobPipeline>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().expect("Failed to load configuration"));

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "pet_portrait_worker={}",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== PET PORTRAIT GENERATION WORKER ===");
    info!(
        "Config: bucket={} profile={}x{}/{} steps, status={}",
        config.bucket(),
        config.inference_profile().width,
        config.inference_profile().height,
        config.inference_profile().num_inference_steps,
        if config.status_configured() { "ON" } else { "OFF" }
    );

    let pipeline = Arc::new(JobPipeline::new(config.clone())?);

    // Local/offline mode: run one hard-coded sample job and print the result
    let local_test = std::env::args().any(|arg| arg == "--local-test")
        || std::env::var("LOCAL_TESTING").is_ok();
    if local_test {
        return run_local_test(&pipeline).await;
    }

    let state = AppState { pipeline };

    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/run", post(run_job))
        .with_state(state)
        .layer(cors);

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    info!("{}", "=".repeat(70));
    info!("Worker listening on http://{}", addr);
    info!("{}", "-".repeat(70));
    info!("Endpoints:");
    info!("  GET  /       - Root endpoint");
    info!("  GET  /health - Health check");
    info!("  POST /run    - Process one generation job");
    info!("{}", "=".repeat(70));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run the hard-coded sample job synchronously, bypassing the host
async fn run_local_test(pipeline: &JobPipeline) -> Result<()> {
    let envelope: JobEnvelope = serde_json::from_value(serde_json::json!({
        "input": {
            "designId": "test-123",
            "style": "METAL",
            "imageUrls": ["s3://pet-ai-storage/test/sample-pet.jpg"]
        }
    }))?;

    let result = pipeline.run(&envelope.input).await;
    println!("Test result: {}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn root() -> &'static str {
    "Pet Portrait Generation Worker"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Process one generation job
///
/// # Request Format:
/// - JSON job envelope: `{ "input": { "designId", "style", "imageUrls" } }`
///
/// # Response:
/// - JobResult JSON; failures are carried in the body, never as an HTTP error
async fn run_job(
    State(state): State<AppState>,
    Json(envelope): Json<JobEnvelope>,
) -> Json<pet_portrait_worker::JobResult> {
    info!("Received generation job {}", envelope.input.design_id);
    Json(state.pipeline.run(&envelope.input).await)
}
