pub mod backend;
pub mod config;
pub mod detection;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{DetectorConfig, DetectorConfigBuilder, ModelFamily, NmsKeep};
pub use detection::{BoundingBox, Detection};
pub use error::DetectError;
pub use labels::load_labels;
pub use pipeline::Detector;
pub use processing::postprocess;
