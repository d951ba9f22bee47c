use serde::{Serialize, Serializer};

/// Axis-aligned rectangle in corner form. Always `x1 <= x2`, `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Build from two opposite corners in any order.
    pub fn from_corners(xa: f32, ya: f32, xb: f32, yb: f32) -> Self {
        Self {
            x1: xa.min(xb),
            y1: ya.min(yb),
            x2: xa.max(xb),
            y2: ya.max(yb),
        }
    }

    /// Convert center/size form to corner form.
    #[inline]
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> Self {
        Self::from_corners(xc - w / 2.0, yc - h / 2.0, xc + w / 2.0, yc + h / 2.0)
    }

    /// Stretch by independent horizontal and vertical factors.
    #[inline]
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::from_corners(self.x1 * sx, self.y1 * sy, self.x2 * sx, self.y2 * sy)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }

    /// Intersection over union; 0 when the union is empty.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let intersection = self.intersection(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A labeled box in original-image pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    class_id: usize,
    confidence: f32,
    bbox: BoundingBox,
    label: String,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, bbox: BoundingBox, label: impl Into<String>) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
            label: label.into(),
        }
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn x1(&self) -> f32 {
        self.bbox.x1
    }

    pub fn y1(&self) -> f32 {
        self.bbox.y1
    }

    pub fn x2(&self) -> f32 {
        self.bbox.x2
    }

    pub fn y2(&self) -> f32 {
        self.bbox.y2
    }
}

/// Encoded as `[x1, y1, x2, y2, label, confidence]` for downstream consumers.
impl Serialize for Detection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            self.bbox.x1,
            self.bbox.y1,
            self.bbox.x2,
            self.bbox.y2,
            &self.label,
            self.confidence,
        )
            .serialize(serializer)
    }
}
