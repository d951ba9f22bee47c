use crate::{error::ApiError, state::AppState};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::{get, post},
};
use inference::{Detection, Detector, InferenceBackend};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image_file";

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn router<B>(detector: Arc<Detector<B>>, max_upload_bytes: usize) -> Router
where
    B: InferenceBackend + Send + 'static,
{
    Router::new()
        .route("/", get(index_handler))
        .route("/detect", post(detect_handler::<B>))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(AppState { detector })
}

/// Upload form that posts to `/detect` and draws the returned boxes.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn detect_handler<B>(
    State(state): State<AppState<B>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Detection>>, ApiError>
where
    B: InferenceBackend + Send + 'static,
{
    let bytes = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Multipart(e.body_text()))?
            .ok_or(ApiError::MissingField(IMAGE_FIELD))?;

        if field.name() == Some(IMAGE_FIELD) {
            break field
                .bytes()
                .await
                .map_err(|e| ApiError::Multipart(e.body_text()))?;
        }
    };

    tracing::debug!(bytes = bytes.len(), "Received upload");

    // Decode, preprocessing and inference are CPU-bound.
    let detector = state.detector.clone();
    let detections = tokio::task::spawn_blocking(move || detector.detect_bytes(&bytes))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    tracing::info!(detections = detections.len(), "Detection request served");
    Ok(Json(detections))
}
