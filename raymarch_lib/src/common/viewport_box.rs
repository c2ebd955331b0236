use nalgebra::{point, Point2, Vector2};

use super::PixelBox;

/// Rectangle on the image plane in normalized `<0;1>` coordinates,
/// point \[0,0\] being the upper left corner
#[derive(Debug, Clone, Copy)]
pub struct ViewportBox {
    pub lower: Point2<f32>,
    pub upper: Point2<f32>,
}

impl ViewportBox {
    /// Inverted box, grows with [`add_point`](ViewportBox::add_point)
    pub fn new() -> Self {
        Self {
            lower: point![f32::INFINITY, f32::INFINITY],
            upper: point![f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    /// The whole image plane
    pub fn full() -> Self {
        Self {
            lower: point![0.0, 0.0],
            upper: point![1.0, 1.0],
        }
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        self.upper.x = f32::max(self.upper.x, x);
        self.upper.y = f32::max(self.upper.y, y);
        self.lower.x = f32::min(self.lower.x, x);
        self.lower.y = f32::min(self.lower.y, y);
    }

    pub fn size(&self) -> Vector2<f32> {
        self.upper - self.lower
    }

    /// Pixels covered by the box, clipped to the frame.
    /// Partially covered pixels are included.
    pub fn get_pixel_range(&self, resolution: (usize, usize)) -> PixelBox {
        let (width, height) = resolution;

        if !(self.lower.x <= self.upper.x && self.lower.y <= self.upper.y) {
            return PixelBox::new(0..0, 0..0);
        }

        let to_pixels = |low: f32, high: f32, size: usize| {
            let size_f = size as f32;
            // float -> int casts saturate, negative coordinates land on 0
            let start = f32::floor(low.clamp(0.0, 1.0) * size_f) as usize;
            let end = f32::ceil(high.clamp(0.0, 1.0) * size_f) as usize;
            start.min(size)..end.min(size)
        };

        PixelBox::new(
            to_pixels(self.lower.x, self.upper.x, width),
            to_pixels(self.lower.y, self.upper.y, height),
        )
    }
}

impl Default for ViewportBox {
    fn default() -> Self {
        Self::new()
    }
}
