use nalgebra::Vector3;

use super::SampleGenerator;

const PAD: u32 = 5;

/// Generate solid volume
/// All sample values are the same, except for an empty border
pub struct SolidGenerator {
    /// The sample value
    sample: u8,
    pad: u32,
    dims: Vector3<u32>,
}

impl SolidGenerator {
    pub fn new(dims: Vector3<u32>, sample: u8) -> SolidGenerator {
        // Small volumes get a thinner border, so something is left
        let pad = PAD.min(dims.min() / 4);
        SolidGenerator { sample, pad, dims }
    }
}

impl SampleGenerator for SolidGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        let inside = coords
            .iter()
            .zip(self.dims.iter())
            .all(|(&c, &d)| c >= self.pad && c + self.pad < d);
        if inside {
            self.sample
        } else {
            0
        }
    }
}
