use nalgebra::{Point3, Vector3};

use crate::common::ValueRange;

use super::{Footprint, Volume};

/// Render-ready representation of a volume.
///
/// Dense `f32` grid normalized into `<0;1>`, x varies fastest.
/// Built once per resource generation and shared read-only by passes.
pub struct VolumeTexture {
    size: Vector3<usize>,
    spacing: Vector3<f32>,
    data: Vec<f32>,
    generation: u64,
    value_range: ValueRange,
}

impl std::fmt::Debug for VolumeTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeTexture")
            .field("size", &self.size)
            .field("spacing", &self.spacing)
            .field("generation", &self.generation)
            .field("data len", &self.data.len())
            .finish()
    }
}

impl VolumeTexture {
    /// `data.len()` must equal the product of `size`
    pub(crate) fn new(size: Vector3<usize>, data: Vec<f32>, generation: u64) -> VolumeTexture {
        debug_assert_eq!(data.len(), size.x * size.y * size.z);
        let value_range = ValueRange::from_samples(data.iter());
        VolumeTexture {
            size,
            spacing: Vector3::repeat(1.0),
            data,
            generation,
            value_range,
        }
    }

    pub(crate) fn with_spacing(self, spacing: Vector3<f32>) -> VolumeTexture {
        VolumeTexture { spacing, ..self }
    }

    /// Physical size of the grid this texture was built from
    pub fn world_extent(&self) -> Vector3<f32> {
        self.size.map(|v| v as f32).component_mul(&self.spacing)
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.size.x + z * self.size.x * self.size.y
    }

    /// Normalized values present in the texture
    pub fn value_range(&self) -> ValueRange {
        self.value_range
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Volume for VolumeTexture {
    fn get_size(&self) -> Vector3<usize> {
        self.size
    }

    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return None;
        }
        self.data.get(self.index(x, y, z)).copied()
    }

    fn sample_at(&self, pos: Point3<f32>) -> f32 {
        if !Footprint::in_bounds(&pos, &self.size) {
            return 0.0;
        }
        let footprint = Footprint::new(&pos, &self.size);
        footprint.interpolate(|x, y, z| self.data[self.index(x, y, z)])
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
