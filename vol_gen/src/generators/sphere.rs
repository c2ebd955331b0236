use nalgebra::Vector3;

use super::SampleGenerator;

/// Sphere inscribed in the volume.
/// Value falls linearly from `sample` in the center to 0 on the surface.
pub struct SphereGenerator {
    sample: u8,
    center: Vector3<f32>,
    radius: f32,
}

impl SphereGenerator {
    pub fn new(dims: Vector3<u32>, sample: u8) -> SphereGenerator {
        let dims_f = dims.cast::<f32>();
        let center = (dims_f - Vector3::repeat(1.0)) / 2.0;
        let radius = (dims_f.min() / 2.0).max(f32::EPSILON);
        SphereGenerator {
            sample,
            center,
            radius,
        }
    }
}

impl SampleGenerator for SphereGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        let dist = (coords.cast::<f32>() - self.center).norm() / self.radius;
        let falloff = (1.0 - dist).max(0.0);
        (falloff * self.sample as f32).round() as u8
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    #[test]
    fn center_and_corner() {
        let gen = SphereGenerator::new(vector![33, 33, 33], 200);

        assert_eq!(gen.sample_at(vector![16, 16, 16]), 200);
        assert_eq!(gen.sample_at(vector![0, 0, 0]), 0);
        assert_eq!(gen.sample_at(vector![32, 16, 16]), 6);
    }

    #[test]
    fn falls_off_outwards() {
        let gen = SphereGenerator::new(vector![32, 32, 32], 255);

        let mut prev = u8::MAX;
        for x in 16..32 {
            let s = gen.sample_at(vector![x, 16, 16]);
            assert!(s <= prev);
            prev = s;
        }
    }
}
