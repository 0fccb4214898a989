//! Encoder server binary
//!
//! Wires up:
//! - the unbounded task queue and its single processing worker
//! - the subprocess executor for the probe/transcode tools
//! - the HTTP API (`POST /schedule`, `GET /stats`)

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vod_encoder::adapters::{http, process::TokioProcessExecutor};
use vod_encoder::domain::commands::CommandPlanner;
use vod_encoder::{EncoderConfig, Scheduler, StatusBoard, TaskProcessor, UnboundedQueue};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vod_encoder=info,tower_http=info")),
        )
        .init();

    let config = match EncoderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.prepare_output_dir() {
        error!("Could not prepare output directory: {:?}", e);
        return ExitCode::FAILURE;
    }
    info!(output_path = %config.output_path.display(), "Output path configured");

    // 1. Queue + shared status
    let queue = UnboundedQueue::new();
    let board = Arc::new(StatusBoard::new(config.finished_history));
    let scheduler = Scheduler::new(queue.clone(), board.clone());

    // 2. Worker
    let executor = TokioProcessExecutor::new(&config.ffprobe_path, &config.ffmpeg_path);
    let processor = TaskProcessor::new(
        queue.clone(),
        board.clone(),
        CommandPlanner::new(&config.output_path),
        executor,
    );
    let worker = tokio::spawn(processor.run());

    // 3. HTTP
    let app = http::router(scheduler);
    let listener = match tokio::net::TcpListener::bind((config.addr.as_str(), config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}:{}: {}", config.addr, config.port, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Listening at {}:{}", config.addr, config.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    // Dropping the worker kills any running tool process.
    worker.abort();
    if let Err(e) = worker.await {
        if !e.is_cancelled() {
            error!("Task processor failed: {}", e);
        }
    }

    let interrupted = board.current();
    if interrupted.is_in_process() {
        warn!(task_id = interrupted.id, input = %interrupted.input, "Interrupted task in process");
    }
    let discarded = queue.len();
    queue.close();
    if discarded > 0 {
        warn!(discarded, "Shutting down with tasks still waiting");
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
