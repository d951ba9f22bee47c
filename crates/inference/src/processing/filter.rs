use super::decode::Candidate;

/// Inclusive: a score equal to the threshold is kept.
#[inline]
pub fn passes(confidence: f32, threshold: f32) -> bool {
    confidence >= threshold
}

/// Keep candidates whose class confidence reaches `threshold`.
///
/// Applied to both families, including anchor-based slots that already
/// cleared the objectness check during decoding.
pub fn retain_confident(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.retain(|c| passes(c.confidence, threshold));
    candidates
}
