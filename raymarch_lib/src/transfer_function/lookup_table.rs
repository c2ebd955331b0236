use crate::{
    color::{self, RGBA},
    common::ValueRange,
};

use super::{CutoffMode, TransferFunction};

/// Transfer function resampled into a fixed number of entries.
///
/// Entry `i` holds the curve value at
/// `domain.low + i / (resolution - 1) * domain.span()`.
#[derive(Debug, Clone)]
pub struct LookupTable {
    entries: Vec<RGBA>,
    resolution: usize,
    domain: ValueRange,
    revision: u64,
}

impl LookupTable {
    pub(super) fn resample(tf: &TransferFunction, resolution: usize) -> LookupTable {
        let range = tf.range_parameters();
        let domain = range.intensity_domain;
        let cutoffs = range.cutoffs;

        let entries = if tf.is_empty() {
            vec![]
        } else {
            (0..resolution)
                .map(|i| {
                    let pos = domain.denormalize(i as f32 / (resolution - 1) as f32);
                    if pos < cutoffs.low {
                        match range.low_cut {
                            CutoffMode::Clamp => tf.lookup(cutoffs.low),
                            CutoffMode::Clear => color::zero(),
                        }
                    } else if pos > cutoffs.high {
                        match range.high_cut {
                            CutoffMode::Clamp => tf.lookup(cutoffs.high),
                            CutoffMode::Clear => color::zero(),
                        }
                    } else {
                        tf.lookup(pos)
                    }
                })
                .collect()
        };

        LookupTable {
            entries,
            resolution,
            domain,
            revision: tf.revision(),
        }
    }

    /// Built from an empty curve
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn domain(&self) -> ValueRange {
        self.domain
    }

    pub fn entries(&self) -> &[RGBA] {
        &self.entries
    }

    /// Linear blend of the two nearest entries, transparent for an empty table
    #[inline]
    pub fn sample(&self, intensity: f32) -> RGBA {
        let n = self.entries.len();
        if n == 0 {
            return color::zero();
        }
        let pos = self.domain.normalize(intensity) * (n - 1) as f32;
        let i = (pos as usize).min(n - 2);
        let t = pos - i as f32;
        color::lerp(&self.entries[i], &self.entries[i + 1], t)
    }

    /// True if every intensity in `range` samples as fully transparent.
    ///
    /// Checks the entries [`sample`](LookupTable::sample) blends with nonzero
    /// weight for some intensity in the range.
    pub fn is_transparent_over(&self, range: ValueRange) -> bool {
        let n = self.entries.len();
        if n == 0 || range.is_empty() {
            return true;
        }
        let scale = (n - 1) as f32;
        let lo = self.domain.normalize(range.low) * scale;
        let hi = self.domain.normalize(range.high) * scale;
        let last = (hi.ceil() as usize).min(n - 1);
        let first = (lo.floor() as usize).min(last);
        self.entries[first..=last].iter().all(|e| e.w <= 0.0)
    }
}
