use std::ops::RangeBounds;

use nalgebra::{vector, Vector3};

use super::SampleGenerator;

const SIZE_VARIANCE: u32 = 10;
const SAMPLE_VARIANCE: u8 = 10;

/// Generate volume with a number of randomly placed shapes
pub struct ShapesGenerator {
    shapes: Vec<ShapeInfo>,
}

impl ShapesGenerator {
    pub fn new(
        dims: Vector3<u32>,
        n_of_shapes: usize,
        sample: u8,
        obj_size: u32,
        seed: Option<u64>,
    ) -> ShapesGenerator {
        let variance = SIZE_VARIANCE.min(obj_size / 2);
        let random_shape_gen = ShapeInfoGenerator::new(
            dims,
            Vector3::repeat(obj_size),
            Vector3::repeat(variance),
            sample,
            SAMPLE_VARIANCE,
            seed,
        );
        let shapes = random_shape_gen.get_shapes(n_of_shapes);
        log::debug!("Generated {} shapes", shapes.len());
        ShapesGenerator { shapes }
    }
}

impl SampleGenerator for ShapesGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        // First shape containing the point wins
        self.shapes
            .iter()
            .find(|shape| shape.contains(coords))
            .map(|shape| shape.render_at(coords - shape.position_low))
            .unwrap_or(0)
    }
}

// # of enum ShapeType variants
const N_OF_SHAPE_KINDS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeType {
    Cuboid,
    Sphere,
}

/// One shape in volume
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInfo {
    pub position_low: Vector3<u32>,
    /// Inclusive
    pub position_high: Vector3<u32>,
    pub shape_type: ShapeType,
    pub sample: u8,
}

impl ShapeInfo {
    #[must_use]
    pub fn new(
        position_low: Vector3<u32>,
        position_high: Vector3<u32>,
        shape_type: ShapeType,
        sample: u8,
    ) -> Self {
        Self {
            position_low,
            position_high,
            shape_type,
            sample,
        }
    }

    fn contains(&self, coords: Vector3<u32>) -> bool {
        (0..3).all(|i| coords[i] >= self.position_low[i] && coords[i] <= self.position_high[i])
    }

    fn render_at(&self, offset: Vector3<u32>) -> u8 {
        match self.shape_type {
            ShapeType::Cuboid => self.sample,
            ShapeType::Sphere => self.render_sphere(offset),
        }
    }

    fn render_sphere(&self, offset: Vector3<u32>) -> u8 {
        let extent = (self.position_high - self.position_low).cast::<f32>();
        let center = extent / 2.0;
        let r = extent.min() / 2.0;

        if (offset.cast::<f32>() - center).norm() <= r {
            self.sample
        } else {
            0
        }
    }
}

/// Generate shapes
/// Helper type
pub struct ShapeInfoGenerator {
    rng: fastrand::Rng,
    vol_dims: Vector3<u32>,
    size: Vector3<u32>,
    size_variance: Vector3<u32>,
    sample: u8,
    sample_variance: u8,
}

impl ShapeInfoGenerator {
    #[must_use]
    pub fn new(
        vol_dims: Vector3<u32>,
        size: Vector3<u32>,
        size_variance: Vector3<u32>,
        sample: u8,
        sample_variance: u8,
        seed: Option<u64>,
    ) -> Self {
        let rng = fastrand::Rng::new();
        if let Some(seed) = seed {
            rng.seed(seed);
        }

        Self {
            rng,
            vol_dims,
            size,
            size_variance,
            sample,
            sample_variance,
        }
    }

    fn random_shape(&self) -> ShapeType {
        match self.rng.u8(0..N_OF_SHAPE_KINDS) {
            0 => ShapeType::Cuboid,
            _ => ShapeType::Sphere,
        }
    }

    fn random_vector<R>(&self, ranges: [R; 3]) -> Vector3<u32>
    where
        R: RangeBounds<u32>,
    {
        let [x, y, z] = ranges;
        vector![self.rng.u32(x), self.rng.u32(y), self.rng.u32(z)]
    }

    pub fn get_shapes(&self, n: usize) -> Vec<ShapeInfo> {
        (0..n).map(|_| self.get_shape()).collect()
    }

    pub fn get_shape(&self) -> ShapeInfo {
        let shape_type = self.random_shape();

        // Sizes are at least 1 and never exceed the volume
        let size_min = self.size
            .zip_map(&self.size_variance, |s, v| s - v.min(s))
            .map(|v| v.max(1))
            .zip_map(&self.vol_dims, |s, d| s.min(d));
        let size_max = (self.size + self.size_variance).zip_map(&self.vol_dims, |s, d| s.min(d));
        let size_max = size_max.zip_map(&size_min, |hi, lo| hi.max(lo));

        let size = self.random_vector([
            size_min.x..=size_max.x,
            size_min.y..=size_max.y,
            size_min.z..=size_max.z,
        ]);

        // Spawn shape in positions it fits
        let free = self.vol_dims - size;
        let position_low = self.random_vector([0..=free.x, 0..=free.y, 0..=free.z]);
        let position_high = position_low + size - Vector3::repeat(1);

        let sample = self.random_sample();

        ShapeInfo::new(position_low, position_high, shape_type, sample)
    }

    fn random_sample(&self) -> u8 {
        // Saturating, so there is no overflow; 0 is reserved for empty space
        let low = self.sample.saturating_sub(self.sample_variance).max(1);
        let high = self.sample.saturating_add(self.sample_variance).max(low);
        self.rng.u8(low..=high)
    }
}
