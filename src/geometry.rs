use serde::{ Deserialize, Serialize };

/// Keeps the IoU denominator away from zero when both boxes are degenerate.
pub const IOU_EPSILON: f32 = 1e-5;

/// An axis-aligned detector proposal in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    #[serde(default)]
    pub class_id: u32,
}

impl BBox {

    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self { x1, y1, x2, y2, confidence, class_id }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// inverted boxes count as empty
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Intersection over union of two boxes.
///
/// Non-overlapping boxes give 0, identical boxes give a value just under 1.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let inter_w = (ix2 - ix1).max(0.0);
    let inter_h = (iy2 - iy1).max(0.0);
    let inter_area = inter_w * inter_h;
    inter_area / (a.area() + b.area() - inter_area + IOU_EPSILON)
}

/// Vertical extent of a text polygon, 0 for an empty one.
pub fn polygon_height(polygon: &[(f32, f32)]) -> f32 {
    let mut ys = polygon.iter().map(|(_, y)| *y);
    let first = match ys.next() {
        Some(y) => y,
        None => return 0.0,
    };
    let (min, max) = ys.fold((first, first), |(min, max), y| (min.min(y), max.max(y)));
    max - min
}

/// Leftmost x of a text polygon, used for reading-order sorting.
pub fn polygon_left(polygon: &[(f32, f32)]) -> f32 {
    polygon.iter().map(|(x, _)| *x).fold(f32::INFINITY, f32::min)
}
