use clap::Parser;
use common::{Environment, setup_logging};
use inference::{
    Detector, DetectorConfig, InferenceBackend, ModelFamily, NmsKeep,
    backend::{
        ort::{ExecutionProvider, OrtBackend},
        replay::ReplayBackend,
    },
    config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIDE, DEFAULT_NMS_THRESHOLD},
    load_labels,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Run a YOLO detector over one image and print the detections as JSON.
#[derive(Parser, Debug)]
#[command(name = "detect", version)]
struct Args {
    /// ONNX model file
    #[arg(short = 'm', long, env = "MODEL_PATH", default_value = "./best.onnx")]
    model: PathBuf,

    /// Image to run detection on
    #[arg(short = 'p', long, default_value = "./test.jpg")]
    image: PathBuf,

    /// Class labels, one per line
    #[arg(short = 'c', long, env = "CLASSES_PATH", default_value = "./classes.txt")]
    classes: PathBuf,

    #[arg(long, alias = "con", env = "CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence: f32,

    #[arg(long, env = "NMS_THRESHOLD", default_value_t = DEFAULT_NMS_THRESHOLD)]
    nms: f32,

    /// v5 / anchor-based or v8 / anchor-free
    #[arg(long, alias = "ver", env = "MODEL_FAMILY", default_value = "v8")]
    family: ModelFamily,

    #[arg(long, env = "INPUT_SIZE", default_value_t = DEFAULT_INPUT_SIDE)]
    input_size: u32,

    /// Class count of an anchor-free model (defaults to 80)
    #[arg(long, env = "NUM_CLASSES")]
    num_classes: Option<usize>,

    #[arg(long, env = "NMS_KEEP", default_value = "highest")]
    nms_keep: NmsKeep,

    #[arg(long, env = "EXECUTION_PROVIDER", default_value = "cpu")]
    provider: ExecutionProvider,

    /// Serve a captured raw output dump instead of running the model
    #[arg(long)]
    replay: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    setup_logging(Environment::from_env());

    let args = Args::parse();
    tracing::debug!(?args, "Parsed arguments");

    let labels = load_labels(&args.classes)
        .map_err(|e| anyhow::anyhow!("failed to read labels from {}: {e}", args.classes.display()))?;

    let mut builder = DetectorConfig::builder(args.family, labels)
        .confidence_threshold(args.confidence)
        .nms_iou_threshold(args.nms)
        .input_side(args.input_size)
        .nms_keep(args.nms_keep);
    if let Some(n) = args.num_classes {
        builder = builder.num_classes(n);
    }
    let config = Arc::new(builder.build()?);

    let bytes = std::fs::read(&args.image)
        .map_err(|e| anyhow::anyhow!("failed to read image {}: {e}", args.image.display()))?;

    let start = Instant::now();
    let detections = match &args.replay {
        Some(dump) => {
            let backend = ReplayBackend::load_model(&dump.to_string_lossy())?;
            Detector::new(backend, config).detect_bytes(&bytes)?
        }
        None => {
            let backend =
                OrtBackend::load_model_with_provider(&args.model.to_string_lossy(), args.provider)?;
            Detector::new(backend, config).detect_bytes(&bytes)?
        }
    };
    let elapsed = start.elapsed();

    println!("{}", serde_json::to_string(&detections)?);
    tracing::info!(
        detections = detections.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Detection finished"
    );

    Ok(())
}
