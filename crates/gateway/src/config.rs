use inference::{
    DetectorConfig, ModelFamily, NmsKeep,
    backend::ort::ExecutionProvider,
    config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIDE, DEFAULT_NMS_THRESHOLD},
    load_labels,
};
use std::env;

pub use common::Environment;

/// Uploads larger than this are rejected before decoding.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub model_path: String,
    pub execution_provider: ExecutionProvider,
    pub classes_path: String,
    pub model_family: ModelFamily,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub input_size: u32,
    pub num_classes: Option<usize>,
    pub nms_keep: NmsKeep,
    pub listen_addr: String,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "./best.onnx".to_string());

        let execution_provider = match env::var("EXECUTION_PROVIDER") {
            Ok(s) => s.parse().map_err(anyhow::Error::msg)?,
            Err(_) => ExecutionProvider::default(),
        };

        let classes_path =
            env::var("CLASSES_PATH").unwrap_or_else(|_| "./classes.txt".to_string());

        // A misspelled family or keep policy would silently change the decode,
        // so these fail instead of falling back.
        let model_family = match env::var("MODEL_FAMILY") {
            Ok(s) => s.parse()?,
            Err(_) => ModelFamily::AnchorFree,
        };

        let nms_keep = match env::var("NMS_KEEP") {
            Ok(s) => s.parse()?,
            Err(_) => NmsKeep::default(),
        };

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);

        let nms_threshold = env::var("NMS_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_NMS_THRESHOLD);

        let input_size = env::var("INPUT_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_INPUT_SIDE);

        let num_classes = env::var("NUM_CLASSES").ok().and_then(|s| s.parse().ok());

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        Ok(Self {
            environment,
            model_path,
            execution_provider,
            classes_path,
            model_family,
            confidence_threshold,
            nms_threshold,
            input_size,
            num_classes,
            nms_keep,
            listen_addr,
            max_upload_bytes,
            otel_endpoint,
        })
    }

    /// Read the label file and build the validated detector configuration.
    pub fn detector_config(&self) -> anyhow::Result<DetectorConfig> {
        let labels = load_labels(&self.classes_path).map_err(|e| {
            anyhow::anyhow!("failed to read labels from {}: {e}", self.classes_path)
        })?;

        let mut builder = DetectorConfig::builder(self.model_family, labels)
            .confidence_threshold(self.confidence_threshold)
            .nms_iou_threshold(self.nms_threshold)
            .input_side(self.input_size)
            .nms_keep(self.nms_keep);
        if let Some(n) = self.num_classes {
            builder = builder.num_classes(n);
        }

        Ok(builder.build()?)
    }
}
