use crate::{
    backend::InferenceBackend,
    config::DetectorConfig,
    detection::Detection,
    error::DetectError,
    processing::postprocess,
};
use image::DynamicImage;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use preprocess::{CpuPreProcessor, Preprocess};
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct DetectorMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    detections: Counter<u64>,
}

impl DetectorMetrics {
    fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 2.0,
        ];
        Self {
            duration: meter
                .f64_histogram("detection_duration_seconds")
                .with_description("Time to run one image through preprocess, inference and postprocess")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            requests: meter
                .u64_counter("detection_requests_total")
                .with_description("Total detection requests, by outcome")
                .build(),
            detections: meter
                .u64_counter("detections_total")
                .with_description("Total detections returned")
                .build(),
        }
    }
}

/// One loaded model plus its immutable configuration.
///
/// `detect` is callable from many threads at once. Preprocessing and
/// postprocessing run concurrently; only the engine call is serialized,
/// since backends take `&mut self`.
pub struct Detector<B: InferenceBackend> {
    backend: Mutex<B>,
    config: Arc<DetectorConfig>,
    preprocessor: CpuPreProcessor,
    metrics: DetectorMetrics,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: Arc<DetectorConfig>) -> Self {
        let preprocessor = CpuPreProcessor::new(config.input_side());
        tracing::info!(
            family = %config.model_family(),
            input_side = config.input_side(),
            num_classes = config.num_classes(),
            num_predictions = config.num_predictions(),
            confidence_threshold = config.confidence_threshold(),
            nms_iou_threshold = config.nms_iou_threshold(),
            nms_keep = ?config.nms_keep(),
            "Detector ready"
        );
        Self {
            backend: Mutex::new(backend),
            config,
            preprocessor,
            metrics: DetectorMetrics::new("detector"),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Decode an encoded image (PNG, JPEG or GIF) and run detection on it.
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<Vec<Detection>, DetectError> {
        let start = Instant::now();
        match image::load_from_memory(bytes) {
            Ok(image) => {
                tracing::debug!(
                    elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                    bytes = bytes.len(),
                    "Image decoded"
                );
                self.detect(&image)
            }
            Err(e) => {
                let e = DetectError::InvalidImage(e.to_string());
                self.record_outcome(&Err(&e), start);
                Err(e)
            }
        }
    }

    /// Run detection on a decoded image. Boxes come back in the image's own
    /// pixel coordinates, highest confidence first unless configured otherwise.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let start = Instant::now();
        let result = self.run(image);
        self.record_outcome(&result.as_ref(), start);
        result
    }

    fn run(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let _s = common::span!("detect");

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let t = Instant::now();
        let input = self
            .preprocessor
            .preprocess(rgb.as_raw(), width, height)
            .map_err(|e| DetectError::InvalidImage(format!("{e:#}")))?;
        tracing::debug!(
            elapsed_ms = t.elapsed().as_secs_f64() * 1000.0,
            "Preprocess done"
        );

        let t = Instant::now();
        let raw = {
            // Backends keep no per-call state; a panicked call leaves them reusable.
            let mut backend = self.backend.lock().unwrap_or_else(|poisoned| {
                tracing::warn!("Previous inference call panicked, recovering backend");
                self.backend.clear_poison();
                poisoned.into_inner()
            });
            backend
                .infer(&input.data)
                .map_err(DetectError::InferenceFailure)?
        };
        tracing::debug!(
            elapsed_ms = t.elapsed().as_secs_f64() * 1000.0,
            shape = ?raw.output.shape(),
            "Inference done"
        );

        let t = Instant::now();
        let output = raw.output.as_standard_layout();
        let flat = output.as_slice().ok_or_else(|| {
            DetectError::InferenceFailure(anyhow::anyhow!("engine output is not contiguous"))
        })?;
        let detections = postprocess(flat, input.orig_width, input.orig_height, &self.config)?;
        tracing::debug!(
            elapsed_ms = t.elapsed().as_secs_f64() * 1000.0,
            detections = detections.len(),
            "Postprocess done"
        );

        Ok(detections)
    }

    fn record_outcome(&self, result: &Result<&Vec<Detection>, &DetectError>, start: Instant) {
        let outcome = match result {
            Ok(detections) => {
                self.metrics.detections.add(detections.len() as u64, &[]);
                "ok"
            }
            Err(DetectError::InvalidImage(_)) => "invalid_image",
            Err(_) => "error",
        };
        self.metrics
            .duration
            .record(start.elapsed().as_secs_f64(), &[]);
        self.metrics
            .requests
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceOutput;
    use crate::config::ModelFamily;
    use image::RgbImage;
    use ndarray::{Array, ArrayD, IxDyn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        output: ArrayD<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl InferenceBackend for CountingBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            anyhow::bail!("not loadable from disk")
        }

        fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
            assert_eq!(images.shape(), &[1, 3, 32, 32]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(InferenceOutput {
                output: self.output.clone(),
            })
        }
    }

    fn config() -> Arc<DetectorConfig> {
        Arc::new(
            DetectorConfig::builder(ModelFamily::AnchorFree, vec!["person".into()])
                .num_classes(1)
                .input_side(32)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_engine_output_shape_is_ignored_only_length_matters() {
        // side 32 -> 16 + 4 + 1 = 21 predictions, 5 channels
        let mut buf = vec![0.0f32; 5 * 21];
        buf[0] = 16.0;
        buf[21] = 16.0;
        buf[2 * 21] = 32.0;
        buf[3 * 21] = 32.0;
        buf[4 * 21] = 0.9;
        let output = Array::from_shape_vec(IxDyn(&[1, 5, 21]), buf).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = Detector::new(
            CountingBackend {
                output,
                calls: calls.clone(),
            },
            config(),
        );

        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 32));
        let detections = detector.detect(&image).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(detections.len(), 1);
        let b = detections[0].bbox();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (0.0, 0.0, 64.0, 32.0));
    }

    #[test]
    fn test_undecodable_bytes_skip_inference() {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = Detector::new(
            CountingBackend {
                output: Array::zeros(IxDyn(&[5 * 21])),
                calls: calls.clone(),
            },
            config(),
        );

        let result = detector.detect_bytes(b"definitely not an image");
        assert!(matches!(result, Err(DetectError::InvalidImage(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
