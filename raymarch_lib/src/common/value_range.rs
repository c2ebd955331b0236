use std::ops::{Deref, Range};

/// Closed interval of scalar values.
///
/// Used for encoding ranges, intensity windows and per-brick statistics.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ValueRange {
    /// Lower bound
    pub low: f32,
    /// Upper bound
    pub high: f32,
}

impl ValueRange {
    pub fn new(low: f32, high: f32) -> ValueRange {
        ValueRange { low, high }
    }

    /// Range with no elements, absorbs the first value passed to [`extend`](ValueRange::extend)
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f32::NAN,
            high: f32::NAN,
        }
    }

    /// The `<0;1>` range
    pub fn unit() -> ValueRange {
        ValueRange::new(0.0, 1.0)
    }

    /// Minimal range covering all samples.
    pub fn from_samples<T, I>(iter: impl IntoIterator<Item = T>) -> ValueRange
    where
        T: Deref<Target = I>,
        I: Into<f32> + Copy,
    {
        let mut range = ValueRange::empty();
        for val in iter {
            range.extend((*val).into());
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Length of the interval, 0 for empty ranges
    pub fn span(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }

    pub fn extend(&mut self, val: f32) {
        if self.is_empty() {
            self.low = val;
            self.high = val;
            return;
        }
        self.low = f32::min(self.low, val);
        self.high = f32::max(self.high, val);
    }

    pub fn contains(&self, val: f32) -> bool {
        self.low <= val && val <= self.high
    }

    /// Touching intervals intersect.
    pub fn intersects(&self, other: &ValueRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.low <= other.high && other.low <= self.high
    }

    /// Map `val` into `<0;1>` relative to this range, clamped.
    ///
    /// Degenerate ranges map everything at or above `low` to 1.
    pub fn normalize(&self, val: f32) -> f32 {
        let span = self.span();
        if span <= 0.0 {
            return if val >= self.low { 1.0 } else { 0.0 };
        }
        ((val - self.low) / span).clamp(0.0, 1.0)
    }

    /// Inverse of [`normalize`](ValueRange::normalize) for `t` in `<0;1>`
    pub fn denormalize(&self, t: f32) -> f32 {
        self.low + t * self.span()
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// ```
/// # use raymarch_lib::common::ValueRange;
/// let range: ValueRange = (0.0..45.5).into();
/// assert_eq!(range.span(), 45.5);
/// ```
impl From<Range<f32>> for ValueRange {
    fn from(range: Range<f32>) -> Self {
        ValueRange {
            low: range.start,
            high: range.end,
        }
    }
}
