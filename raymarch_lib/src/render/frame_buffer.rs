use nalgebra::Vector3;

use crate::common::PixelBox;

/// Opaque frame the volumes are blended over.
///
/// `depth` holds, per pixel, the world distance from the camera to the nearest
/// opaque surface; volumes are not marched past it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    color: Vec<Vector3<f32>>,
    depth: Option<Vec<f32>>,
}

impl FrameBuffer {
    /// Black frame without depth
    pub fn new(width: usize, height: usize) -> FrameBuffer {
        FrameBuffer::with_background(width, height, Vector3::zeros())
    }

    pub fn with_background(width: usize, height: usize, background: Vector3<f32>) -> FrameBuffer {
        FrameBuffer {
            width,
            height,
            color: vec![background; width * height],
            depth: None,
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn full_box(&self) -> PixelBox {
        PixelBox::full(self.resolution())
    }

    pub fn clear(&mut self, background: Vector3<f32>) {
        self.color.iter_mut().for_each(|c| *c = background);
    }

    /// Attach opaque geometry depth, `f32::INFINITY` where there is none.
    /// Returns `false` if the length does not match the resolution.
    pub fn set_depth(&mut self, depth: Vec<f32>) -> bool {
        if depth.len() != self.width * self.height {
            return false;
        }
        self.depth = Some(depth);
        true
    }

    pub fn clear_depth(&mut self) {
        self.depth = None;
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        match &self.depth {
            Some(depth) => depth[y * self.width + x],
            None => f32::INFINITY,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Vector3<f32> {
        self.color[y * self.width + x]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut Vector3<f32> {
        &mut self.color[y * self.width + x]
    }

    pub fn as_slice(&self) -> &[Vector3<f32>] {
        &self.color
    }

    /// Row-major RGB bytes
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.color.len() * 3);
        for c in &self.color {
            for v in c.iter() {
                bytes.push((v.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        bytes
    }
}
