use crate::config::NmsKeep;
use crate::detection::Detection;
use std::collections::VecDeque;

/// Greedy, class-agnostic non-maximum suppression.
///
/// Candidates are ordered by confidence (direction per `keep`, stable for
/// ties), then the head of the queue is kept and every remaining candidate
/// whose IoU with it reaches `iou_threshold` is dropped, until the queue is
/// empty. Boxes of different classes suppress each other. The result is in
/// selection order.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    keep: NmsKeep,
) -> Vec<Detection> {
    let _s = common::span_debug!("nms");

    match keep {
        NmsKeep::Highest => {
            detections.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        }
        NmsKeep::Lowest => {
            detections.sort_by(|a, b| a.confidence().total_cmp(&b.confidence()));
        }
    }

    let candidates = detections.len();
    let mut queue = VecDeque::from(detections);
    let mut kept = Vec::new();

    while let Some(current) = queue.pop_front() {
        queue.retain(|other| current.bbox().iou(other.bbox()) < iou_threshold);
        kept.push(current);
    }

    tracing::trace!(candidates, kept = kept.len(), "NMS complete");
    kept
}
