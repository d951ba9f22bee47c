pub mod config;
pub mod cpu;

use ndarray::{Array, IxDyn};

pub use config::DEFAULT_INPUT_SIDE;
pub use cpu::CpuPreProcessor;

/// A model-ready input tensor plus the geometry needed to map boxes back.
#[derive(Debug)]
pub struct PreprocessResult {
    /// Planar RGB, `[1, 3, side, side]`, values in `[0, 1]`
    pub data: Array<f32, IxDyn>,
    /// Width of the source image before resampling
    pub orig_width: u32,
    /// Height of the source image before resampling
    pub orig_height: u32,
}

/// Trait for image preprocessing implementations
pub trait Preprocess {
    /// Turn packed RGB8 pixels (HWC) into the model input tensor.
    fn preprocess(&self, pixels: &[u8], width: u32, height: u32)
    -> anyhow::Result<PreprocessResult>;
}
