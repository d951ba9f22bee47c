use super::{InferenceBackend, InferenceOutput};
use ndarray::{Array, ArrayD, IxDyn};

/// Serves a previously captured raw output tensor for every request.
///
/// Loads a headerless dump of native-endian `f32` values (as written by
/// `bytemuck::cast_slice` over the engine output). Useful for reproducing
/// decode/NMS results offline without the engine.
pub struct ReplayBackend {
    output: ArrayD<f32>,
}

impl ReplayBackend {
    pub fn from_output(output: ArrayD<f32>) -> Self {
        Self { output }
    }
}

impl InferenceBackend for ReplayBackend {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            anyhow::bail!(
                "Replay dump {} is {} bytes, not a whole number of f32 values",
                path,
                bytes.len()
            );
        }

        let values: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        let len = values.len();
        tracing::info!(path, values = len, "Loaded replay output");

        Ok(Self {
            output: Array::from_shape_vec(IxDyn(&[len]), values)?,
        })
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        match images.shape() {
            [1, 3, h, w] if h == w => {}
            shape => anyhow::bail!("Expected a [1, 3, S, S] input tensor, got {:?}", shape),
        }

        Ok(InferenceOutput {
            output: self.output.clone(),
        })
    }
}
