use inference::{Detector, InferenceBackend};
use std::sync::Arc;

pub struct AppState<B: InferenceBackend> {
    pub detector: Arc<Detector<B>>,
}

// Derived Clone would require `B: Clone`.
impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            detector: self.detector.clone(),
        }
    }
}
