pub mod decode;
pub mod filter;
pub mod layout;
pub mod nms;

use crate::config::DetectorConfig;
use crate::detection::Detection;
use crate::error::DetectError;
use decode::BoxDecoder;
use layout::RawOutputView;

/// Decode, filter and suppress one flat engine output for an image of
/// `image_width x image_height` pixels.
pub fn postprocess(
    output: &[f32],
    image_width: u32,
    image_height: u32,
    config: &DetectorConfig,
) -> Result<Vec<Detection>, DetectError> {
    let view = RawOutputView::new(
        output,
        config.model_family(),
        config.num_predictions(),
        config.num_classes(),
    )?;

    let decoded = BoxDecoder::new(image_width, image_height, config).decode_all(&view);
    let decoded_count = decoded.len();

    let detections: Vec<Detection> =
        filter::retain_confident(decoded, config.confidence_threshold())
            .into_iter()
            .map(|c| c.into_detection(config))
            .collect();

    tracing::trace!(
        decoded = decoded_count,
        confident = detections.len(),
        "Decoded raw output"
    );

    Ok(nms::non_max_suppression(
        detections,
        config.nms_iou_threshold(),
        config.nms_keep(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelFamily, NmsKeep};

    const NUM_PREDICTIONS: usize = 6;
    const NUM_CLASSES: usize = 3;

    fn labels() -> Vec<String> {
        vec!["person".into(), "bicycle".into(), "car".into()]
    }

    /// Channel-major buffer with every score at `fill`.
    fn anchor_free_buffer(fill: f32) -> Vec<f32> {
        let mut buf = vec![0.0; (4 + NUM_CLASSES) * NUM_PREDICTIONS];
        for i in 0..NUM_PREDICTIONS {
            buf[i] = 50.0 + 100.0 * i as f32;
            buf[NUM_PREDICTIONS + i] = 50.0 + 100.0 * i as f32;
            buf[2 * NUM_PREDICTIONS + i] = 40.0;
            buf[3 * NUM_PREDICTIONS + i] = 40.0;
            for c in 0..NUM_CLASSES {
                buf[(4 + c) * NUM_PREDICTIONS + i] = fill;
            }
        }
        buf
    }

    fn set_score(buf: &mut [f32], index: usize, class_id: usize, score: f32) {
        buf[(4 + class_id) * NUM_PREDICTIONS + index] = score;
    }

    fn set_box(buf: &mut [f32], index: usize, xc: f32, yc: f32, w: f32, h: f32) {
        for (channel, v) in [xc, yc, w, h].into_iter().enumerate() {
            buf[channel * NUM_PREDICTIONS + index] = v;
        }
    }

    fn anchor_free_config(keep: NmsKeep) -> DetectorConfig {
        DetectorConfig::builder(ModelFamily::AnchorFree, labels())
            .num_classes(NUM_CLASSES)
            .num_predictions(NUM_PREDICTIONS)
            .confidence_threshold(0.5)
            .nms_iou_threshold(0.5)
            .nms_keep(keep)
            .build()
            .unwrap()
    }

    #[test]
    fn test_all_scores_below_threshold_yield_nothing() {
        let config = anchor_free_config(NmsKeep::Highest);
        let buf = anchor_free_buffer(0.49);

        let detections = postprocess(&buf, 640, 640, &config).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_anchor_based_all_below_threshold_yield_nothing() {
        let config = DetectorConfig::builder(ModelFamily::AnchorBased, labels())
            .num_predictions(2)
            .confidence_threshold(0.5)
            .build()
            .unwrap();
        let buf = [
            100.0, 100.0, 20.0, 20.0, 0.9, 0.1, 0.4, 0.2, // objectness passes, class does not
            300.0, 300.0, 20.0, 20.0, 0.2, 0.9, 0.9, 0.9, // objectness fails
        ];

        let detections = postprocess(&buf, 640, 640, &config).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_separate_objects_survive_with_labels() {
        let config = anchor_free_config(NmsKeep::Highest);
        let mut buf = anchor_free_buffer(0.01);
        set_score(&mut buf, 0, 0, 0.9);
        set_score(&mut buf, 3, 2, 0.8);

        let detections = postprocess(&buf, 640, 640, &config).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label(), "person");
        assert_eq!(detections[0].confidence(), 0.9);
        assert_eq!(detections[1].label(), "car");
        assert_eq!(detections[1].class_id(), 2);

        let b = detections[1].bbox();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (330.0, 330.0, 370.0, 370.0));
    }

    #[test]
    fn test_overlapping_duplicates_reduced_to_one() {
        let mut buf = anchor_free_buffer(0.01);
        set_box(&mut buf, 1, 100.0, 100.0, 100.0, 100.0);
        set_box(&mut buf, 2, 100.0, 90.0, 100.0, 80.0);
        set_score(&mut buf, 1, 0, 0.9);
        set_score(&mut buf, 2, 1, 0.95);

        let kept = postprocess(&buf, 640, 640, &anchor_free_config(NmsKeep::Highest)).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence(), 0.95);
        assert_eq!(kept[0].label(), "bicycle");

        let kept = postprocess(&buf, 640, 640, &anchor_free_config(NmsKeep::Lowest)).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence(), 0.9);
        assert_eq!(kept[0].label(), "person");
    }

    #[test]
    fn test_wrong_length_never_decodes() {
        let config = anchor_free_config(NmsKeep::Highest);
        let mut buf = anchor_free_buffer(0.9);
        buf.pop();

        let result = postprocess(&buf, 640, 640, &config);
        assert!(matches!(result, Err(DetectError::LayoutMismatch { .. })));
    }
}
