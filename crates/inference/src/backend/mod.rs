use ndarray::{Array, ArrayD, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub mod replay;

/// Capability interface to an inference engine: load a model once, then run
/// one fixed-shape forward pass per call.
///
/// `infer` takes `&mut self`; callers sharing a handle between threads must
/// serialize calls (see [`crate::Detector`]).
pub trait InferenceBackend {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, side, side]` planar RGB tensor.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// `[1, 4 + C, N]` (anchor-free) or `[1, N, 5 + C]` (anchor-based)
    pub output: ArrayD<f32>,
}
