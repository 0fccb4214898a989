//! HTTP inbound adapter: task submission and queue stats.

use crate::application::status::Scheduler;
use crate::domain::task::{ScheduleRequest, Stats, Task};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn router(scheduler: Scheduler) -> Router {
    Router::new()
        .route("/schedule", post(schedule))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(scheduler)
}

async fn schedule(
    State(scheduler): State<Scheduler>,
    Json(request): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    if request.input.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "input is required".to_owned()));
    }

    match scheduler.submit(request) {
        Ok(task) => {
            info!(task_id = task.id, input = %task.input, "Task scheduled");
            Ok((StatusCode::ACCEPTED, Json(task)))
        }
        Err(e) => {
            warn!(task_id = e.0.id, "Rejected task, queue is closed");
            Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

async fn stats(State(scheduler): State<Scheduler>) -> Json<Stats> {
    Json(scheduler.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queue::UnboundedQueue;
    use crate::application::status::StatusBoard;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn scheduler() -> Scheduler {
        Scheduler::new(UnboundedQueue::new(), Arc::new(StatusBoard::new(0)))
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/schedule")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn get_stats(app: Router) -> Value {
        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_schedule_stamps_and_enqueues() {
        let scheduler = scheduler();
        let app = router(scheduler.clone());

        let response = app
            .clone()
            .oneshot(post_json(json!({
                "id": 11,
                "channel_id": 2,
                "playlist_id": 3,
                "input": "/media/ep1.mkv",
                "status": 3
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let task = body_json(response).await;
        assert_eq!(task["id"], json!(11));
        assert_eq!(task["status"], json!(1));
        assert!(task["scheduled_at"].is_string());
        assert_eq!(scheduler.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_shape() {
        let app = router(scheduler());
        for id in [1, 2] {
            app.clone()
                .oneshot(post_json(json!({ "id": id, "input": "/media/a.mp4" })))
                .await
                .unwrap();
        }

        let stats = get_stats(app).await;
        assert_eq!(stats["length"], json!(2));
        assert_eq!(stats["in_process"]["is_running"], json!(false));
        assert_eq!(stats["in_process"]["task"]["status"], json!(0));
        assert_eq!(stats["waiting"].as_array().unwrap().len(), 2);
        assert_eq!(stats["waiting"][0]["id"], json!(1));
        assert_eq!(stats["waiting"][1]["id"], json!(2));
        assert_eq!(stats["finished"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_input_is_rejected() {
        let scheduler = scheduler();
        let response = router(scheduler.clone())
            .oneshot(post_json(json!({ "id": 1 })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(scheduler.queue().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let scheduler = scheduler();
        let response = router(scheduler.clone())
            .oneshot(post_json(json!({ "input": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(scheduler.queue().is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_is_unavailable() {
        let scheduler = scheduler();
        scheduler.queue().close();
        let response = router(scheduler)
            .oneshot(post_json(json!({ "input": "/media/a.mp4" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
