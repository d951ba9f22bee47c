//! Layout-independent access to raw detector output.
//!
//! Anchor-based models interleave records per slot:
//! `[xc, yc, w, h, obj, s0 .. sC-1][xc, yc, ...]`.
//! Anchor-free models store the same fields channel-major, one contiguous run
//! of `num_predictions` values per channel: `[xc ..][yc ..][w ..][h ..][s0 ..]..`.
//! Everything above this module reads predictions through [`RawOutputView`]
//! and never indexes the buffer directly.

use crate::config::ModelFamily;
use crate::error::DetectError;

/// Box geometry of one slot in model input space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterBox {
    pub xc: f32,
    pub yc: f32,
    pub w: f32,
    pub h: f32,
}

/// Read-only view over one inference call's flat output buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawOutputView<'a> {
    data: &'a [f32],
    family: ModelFamily,
    num_predictions: usize,
    num_classes: usize,
}

impl<'a> RawOutputView<'a> {
    /// Wrap `data`, asserting its length matches the declared shape exactly.
    pub fn new(
        data: &'a [f32],
        family: ModelFamily,
        num_predictions: usize,
        num_classes: usize,
    ) -> Result<Self, DetectError> {
        if num_classes == 0 {
            return Err(DetectError::invalid_config("num_classes must be positive"));
        }

        let expected = num_predictions * (family.class_offset() + num_classes);
        if data.len() != expected {
            return Err(DetectError::LayoutMismatch {
                family,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            family,
            num_predictions,
            num_classes,
        })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn num_predictions(&self) -> usize {
        self.num_predictions
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Floats per prediction record: `5 + C` or `4 + C`.
    pub fn pred_stride(&self) -> usize {
        self.family.class_offset() + self.num_classes
    }

    /// Field `channel` of slot `index`, where channels are numbered as in an
    /// anchor-based record (0..4 box, then objectness or scores).
    #[inline]
    fn value(&self, channel: usize, index: usize) -> f32 {
        debug_assert!(index < self.num_predictions);
        match self.family {
            ModelFamily::AnchorBased => self.data[index * self.pred_stride() + channel],
            ModelFamily::AnchorFree => self.data[channel * self.num_predictions + index],
        }
    }

    #[inline]
    pub fn center_box(&self, index: usize) -> CenterBox {
        CenterBox {
            xc: self.value(0, index),
            yc: self.value(1, index),
            w: self.value(2, index),
            h: self.value(3, index),
        }
    }

    /// Objectness of slot `index`; `None` for families without one.
    #[inline]
    pub fn objectness(&self, index: usize) -> Option<f32> {
        match self.family {
            ModelFamily::AnchorBased => Some(self.value(4, index)),
            ModelFamily::AnchorFree => None,
        }
    }

    /// Per-class scores of slot `index`, in class order.
    pub fn class_scores(&self, index: usize) -> impl Iterator<Item = f32> + '_ {
        let offset = self.family.class_offset();
        (0..self.num_classes).map(move |c| self.value(offset + c, index))
    }
}
