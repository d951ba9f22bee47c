use super::filter;
use super::layout::RawOutputView;
use crate::config::DetectorConfig;
use crate::detection::{BoundingBox, Detection};

/// A decoded slot before labeling, in original-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Candidate {
    pub fn into_detection(self, config: &DetectorConfig) -> Detection {
        let label = config.label(self.class_id).unwrap_or_default();
        Detection::new(self.class_id, self.confidence, self.bbox, label)
    }
}

/// Maps raw slots to candidates for one source image.
#[derive(Debug, Clone, Copy)]
pub struct BoxDecoder {
    scale_x: f32,
    scale_y: f32,
    confidence_threshold: f32,
}

impl BoxDecoder {
    /// Width and height scale independently: the input was stretched, not
    /// letterboxed, onto the `input_side` square.
    pub fn new(image_width: u32, image_height: u32, config: &DetectorConfig) -> Self {
        let side = config.input_side() as f32;
        Self {
            scale_x: image_width as f32 / side,
            scale_y: image_height as f32 / side,
            confidence_threshold: config.confidence_threshold(),
        }
    }

    /// Decode slot `index`.
    ///
    /// Returns `None` only when an anchor-based slot's objectness is below
    /// the confidence threshold, in which case class scores are not read.
    /// Anything else decodes; the confidence filter decides what survives.
    #[inline]
    pub fn decode(&self, view: &RawOutputView<'_>, index: usize) -> Option<Candidate> {
        if let Some(objectness) = view.objectness(index) {
            if !filter::passes(objectness, self.confidence_threshold) {
                return None;
            }
        }

        let (class_id, confidence) = argmax(view.class_scores(index));

        let c = view.center_box(index);
        let bbox = BoundingBox::from_center(c.xc, c.yc, c.w, c.h).scale(self.scale_x, self.scale_y);

        Some(Candidate {
            class_id,
            confidence,
            bbox,
        })
    }

    pub fn decode_all(&self, view: &RawOutputView<'_>) -> Vec<Candidate> {
        (0..view.num_predictions())
            .filter_map(|i| self.decode(view, i))
            .collect()
    }
}

/// Index and value of the largest score; the first index wins ties.
#[inline]
fn argmax(scores: impl Iterator<Item = f32>) -> (usize, f32) {
    let mut best = (0usize, f32::NEG_INFINITY);
    for (class_id, score) in scores.enumerate() {
        if score > best.1 {
            best = (class_id, score);
        }
    }
    best
}
