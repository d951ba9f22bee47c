use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use image::{DynamicImage, ImageFormat, RgbImage};
use inference::{
    Detector, DetectorConfig, InferenceBackend, InferenceOutput, ModelFamily,
    backend::replay::ReplayBackend,
};
use ndarray::{Array, IxDyn};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "detect-test-boundary";
const SIDE: u32 = 32;
// (32/8)^2 + (32/16)^2 + (32/32)^2
const SLOTS: usize = 21;

struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn load_model(_path: &str) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn infer(&mut self, _images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        anyhow::bail!("engine crashed")
    }
}

fn config() -> Arc<DetectorConfig> {
    Arc::new(
        DetectorConfig::builder(ModelFamily::AnchorFree, vec!["dog".into(), "cat".into()])
            .num_classes(2)
            .input_side(SIDE)
            .build()
            .unwrap(),
    )
}

/// One "cat" covering the whole input square.
fn replay_app() -> Router {
    let mut buf = vec![0.0f32; 6 * SLOTS];
    buf[0] = 16.0;
    buf[SLOTS] = 16.0;
    buf[2 * SLOTS] = 32.0;
    buf[3 * SLOTS] = 32.0;
    buf[5 * SLOTS] = 0.75;
    let output = Array::from_shape_vec(IxDyn(&[1, 6, SLOTS]), buf).unwrap();
    let detector = Detector::new(ReplayBackend::from_output(output), config());
    gateway::router(Arc::new(detector), 1024 * 1024)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_request(field: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn detect_returns_boxes_in_image_coordinates() {
    let response = replay_app()
        .oneshot(multipart_request("image_file", &png(200, 100)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!([[0.0, 0.0, 200.0, 100.0, "cat", 0.75]])
    );
}

#[tokio::test]
async fn missing_image_field_is_bad_request() {
    let response = replay_app()
        .oneshot(multipart_request("photo", &png(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("image_file"));
}

#[tokio::test]
async fn undecodable_image_is_bad_request() {
    let response = replay_app()
        .oneshot(multipart_request("image_file", b"not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn engine_failure_is_internal_error() {
    let app = gateway::router(Arc::new(Detector::new(FailingBackend, config())), 1024 * 1024);

    let response = app
        .oneshot(multipart_request("image_file", &png(16, 16)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("engine crashed"));
}

#[tokio::test]
async fn health_reports_ok() {
    let response = replay_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn index_serves_upload_form() {
    let response = replay_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = std::str::from_utf8(&bytes).unwrap();
    assert!(page.contains("\"image_file\""));
    assert!(page.contains("/detect"));
}
