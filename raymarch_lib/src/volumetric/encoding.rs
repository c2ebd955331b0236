use byteorder::{ByteOrder, LittleEndian};

use crate::{common::ValueRange, error::format_err, Result};

/// Layout of one raw voxel.
///
/// Raw data is little-endian. `range` is the scalar interval mapped onto `<0;1>`
/// when the volume is turned into a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarEncoding {
    pub bits: u8,
    pub signed: bool,
    pub float: bool,
    pub range: ValueRange,
}

impl ScalarEncoding {
    pub fn u8() -> ScalarEncoding {
        ScalarEncoding {
            bits: 8,
            signed: false,
            float: false,
            range: ValueRange::new(0.0, u8::MAX as f32),
        }
    }

    pub fn u16() -> ScalarEncoding {
        ScalarEncoding {
            bits: 16,
            signed: false,
            float: false,
            range: ValueRange::new(0.0, u16::MAX as f32),
        }
    }

    /// Typical CT encoding, `range` is usually the Hounsfield window of interest
    pub fn i16(range: ValueRange) -> ScalarEncoding {
        ScalarEncoding {
            bits: 16,
            signed: true,
            float: false,
            range,
        }
    }

    pub fn f32(range: ValueRange) -> ScalarEncoding {
        ScalarEncoding {
            bits: 32,
            signed: true,
            float: true,
            range,
        }
    }

    /// Same layout, different value range
    pub fn with_range(self, range: ValueRange) -> ScalarEncoding {
        ScalarEncoding { range, ..self }
    }

    pub fn bytes_per_voxel(&self) -> usize {
        self.bits as usize / 8
    }

    pub fn validate(&self) -> Result<()> {
        let supported = matches!(
            (self.bits, self.signed, self.float),
            (8, _, false) | (16, _, false) | (32, _, false) | (32, true, true)
        );
        if !supported {
            return Err(format_err(format!(
                "unsupported scalar encoding: {} bits, signed {}, float {}",
                self.bits, self.signed, self.float
            )));
        }
        if self.range.is_empty()
            || !self.range.low.is_finite()
            || !self.range.high.is_finite()
            || self.range.high < self.range.low
        {
            return Err(format_err(format!(
                "invalid encoding value range {:?}",
                self.range
            )));
        }
        Ok(())
    }

    /// Decode one voxel. `bytes` must be [`bytes_per_voxel`](ScalarEncoding::bytes_per_voxel) long.
    pub fn decode(&self, bytes: &[u8]) -> f32 {
        match (self.bits, self.signed, self.float) {
            (8, false, _) => bytes[0] as f32,
            (8, true, _) => bytes[0] as i8 as f32,
            (16, false, _) => LittleEndian::read_u16(bytes) as f32,
            (16, true, _) => LittleEndian::read_i16(bytes) as f32,
            (32, _, true) => LittleEndian::read_f32(bytes),
            (32, false, false) => LittleEndian::read_u32(bytes) as f32,
            (32, true, false) => LittleEndian::read_i32(bytes) as f32,
            _ => 0.0,
        }
    }

    /// Decode one voxel and map it into `<0;1>` using `range`
    pub fn decode_normalized_voxel(&self, bytes: &[u8]) -> f32 {
        let v = self.decode(bytes);
        // NaN voxels become empty space
        if v.is_nan() {
            0.0
        } else {
            self.range.normalize(v)
        }
    }

    /// Decode all voxels and map them into `<0;1>` using `range`
    pub fn decode_normalized(&self, raw: &[u8]) -> Vec<f32> {
        raw.chunks_exact(self.bytes_per_voxel())
            .map(|bytes| self.decode_normalized_voxel(bytes))
            .collect()
    }
}
