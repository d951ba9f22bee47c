use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use preprocess::DEFAULT_INPUT_SIDE;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.5;
/// Class count assumed for anchor-free models when not overridden (COCO).
pub const DEFAULT_ANCHOR_FREE_CLASSES: usize = 80;

const HEAD_STRIDES: [u32; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 3;

/// Raw-output layout family of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    /// `[1, N, 5 + C]`: per-slot `xc, yc, w, h, objectness, scores..` (YOLOv5 style)
    AnchorBased,
    /// `[1, 4 + C, N]`: channel-major, no objectness (YOLOv8 style)
    AnchorFree,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::AnchorBased => "anchor-based",
            ModelFamily::AnchorFree => "anchor-free",
        }
    }

    /// Index of the first class score within a prediction record.
    pub fn class_offset(&self) -> usize {
        match self {
            ModelFamily::AnchorBased => 5,
            ModelFamily::AnchorFree => 4,
        }
    }

    /// Candidate slot count a model of this family emits for a square input.
    ///
    /// Three detection heads at strides 8/16/32; anchor-based heads carry
    /// three anchors per grid cell. 640 gives 8400 and 25200.
    pub fn num_predictions(&self, input_side: u32) -> Option<usize> {
        if input_side == 0 || input_side % 32 != 0 {
            return None;
        }
        let cells: usize = HEAD_STRIDES
            .iter()
            .map(|s| ((input_side / s) as usize).pow(2))
            .sum();
        Some(match self {
            ModelFamily::AnchorBased => cells * ANCHORS_PER_CELL,
            ModelFamily::AnchorFree => cells,
        })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v5" | "yolov5" | "anchor-based" | "anchor_based" => Ok(ModelFamily::AnchorBased),
            "v8" | "yolov8" | "anchor-free" | "anchor_free" => Ok(ModelFamily::AnchorFree),
            other => Err(DetectError::invalid_config(format!(
                "unknown model family `{other}` (expected v5/anchor-based or v8/anchor-free)"
            ))),
        }
    }
}

/// Which box of an overlapping cluster survives suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NmsKeep {
    /// Descending confidence: the strongest box of each cluster is kept.
    #[default]
    Highest,
    /// Ascending confidence: the weakest box of each cluster is kept.
    /// Matches the legacy detector's output exactly.
    Lowest,
}

impl FromStr for NmsKeep {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "highest" => Ok(NmsKeep::Highest),
            "lowest" | "legacy" => Ok(NmsKeep::Lowest),
            other => Err(DetectError::invalid_config(format!(
                "unknown NMS keep policy `{other}` (expected highest or lowest)"
            ))),
        }
    }
}

/// Immutable detector settings. Built once at startup via
/// [`DetectorConfig::builder`] and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    confidence_threshold: f32,
    nms_iou_threshold: f32,
    model_family: ModelFamily,
    class_labels: Vec<String>,
    input_side: u32,
    num_classes: usize,
    num_predictions: usize,
    nms_keep: NmsKeep,
}

impl DetectorConfig {
    pub fn builder(model_family: ModelFamily, class_labels: Vec<String>) -> DetectorConfigBuilder {
        DetectorConfigBuilder {
            model_family,
            class_labels,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_iou_threshold: DEFAULT_NMS_THRESHOLD,
            input_side: DEFAULT_INPUT_SIDE,
            num_classes: None,
            num_predictions: None,
            nms_keep: NmsKeep::default(),
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn nms_iou_threshold(&self) -> f32 {
        self.nms_iou_threshold
    }

    pub fn model_family(&self) -> ModelFamily {
        self.model_family
    }

    pub fn class_labels(&self) -> &[String] {
        &self.class_labels
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.class_labels.get(class_id).map(String::as_str)
    }

    pub fn input_side(&self) -> u32 {
        self.input_side
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_predictions(&self) -> usize {
        self.num_predictions
    }

    pub fn nms_keep(&self) -> NmsKeep {
        self.nms_keep
    }

    /// Flat length the engine output must have under this configuration.
    pub fn expected_output_len(&self) -> usize {
        self.num_predictions * (self.model_family.class_offset() + self.num_classes)
    }
}

pub struct DetectorConfigBuilder {
    model_family: ModelFamily,
    class_labels: Vec<String>,
    confidence_threshold: f32,
    nms_iou_threshold: f32,
    input_side: u32,
    num_classes: Option<usize>,
    num_predictions: Option<usize>,
    nms_keep: NmsKeep,
}

impl DetectorConfigBuilder {
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn nms_iou_threshold(mut self, threshold: f32) -> Self {
        self.nms_iou_threshold = threshold;
        self
    }

    pub fn input_side(mut self, side: u32) -> Self {
        self.input_side = side;
        self
    }

    /// Override the class count. Anchor-based models take it from the label
    /// list, so an override there must agree with it.
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    /// Override the slot count derived from the input side.
    pub fn num_predictions(mut self, num_predictions: usize) -> Self {
        self.num_predictions = Some(num_predictions);
        self
    }

    pub fn nms_keep(mut self, keep: NmsKeep) -> Self {
        self.nms_keep = keep;
        self
    }

    pub fn build(self) -> Result<DetectorConfig, DetectError> {
        check_unit_interval("confidence_threshold", self.confidence_threshold)?;
        check_unit_interval("nms_iou_threshold", self.nms_iou_threshold)?;

        if self.input_side == 0 {
            return Err(DetectError::invalid_config("input_side must be positive"));
        }

        let num_classes = match (self.model_family, self.num_classes) {
            (ModelFamily::AnchorBased, Some(n)) if n != self.class_labels.len() => {
                return Err(DetectError::invalid_config(format!(
                    "anchor-based models take their class count from the label list ({} labels), got override {}",
                    self.class_labels.len(),
                    n
                )));
            }
            (ModelFamily::AnchorBased, _) => self.class_labels.len(),
            (ModelFamily::AnchorFree, n) => n.unwrap_or(DEFAULT_ANCHOR_FREE_CLASSES),
        };

        if num_classes == 0 {
            return Err(DetectError::invalid_config("num_classes must be positive"));
        }

        if self.class_labels.len() < num_classes {
            return Err(DetectError::invalid_config(format!(
                "{} class labels provided for a {}-class model",
                self.class_labels.len(),
                num_classes
            )));
        }

        let num_predictions = match self.num_predictions {
            Some(0) => {
                return Err(DetectError::invalid_config("num_predictions must be positive"));
            }
            Some(n) => n,
            None => self
                .model_family
                .num_predictions(self.input_side)
                .ok_or_else(|| {
                    DetectError::invalid_config(format!(
                        "input_side {} is not a multiple of 32; set num_predictions explicitly",
                        self.input_side
                    ))
                })?,
        };

        Ok(DetectorConfig {
            confidence_threshold: self.confidence_threshold,
            nms_iou_threshold: self.nms_iou_threshold,
            model_family: self.model_family,
            class_labels: self.class_labels,
            input_side: self.input_side,
            num_classes,
            num_predictions,
            nms_keep: self.nms_keep,
        })
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<(), DetectError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(DetectError::invalid_config(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}
