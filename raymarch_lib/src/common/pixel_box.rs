use std::ops::Range;

/// Rectangle of pixels, `x` is the column range, `y` the row range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBox {
    pub x: Range<usize>,
    pub y: Range<usize>,
}

impl PixelBox {
    pub fn new(x: Range<usize>, y: Range<usize>) -> PixelBox {
        PixelBox { x, y }
    }

    /// Whole frame of given resolution
    pub fn full(resolution: (usize, usize)) -> PixelBox {
        PixelBox::new(0..resolution.0, 0..resolution.1)
    }

    pub fn width(&self) -> usize {
        self.x.end.saturating_sub(self.x.start)
    }

    pub fn height(&self) -> usize {
        self.y.end.saturating_sub(self.y.start)
    }

    /// Number of pixels
    pub fn items(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.items() == 0
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.x.contains(&x) && self.y.contains(&y)
    }

    /// Row-major index of frame pixel `(x, y)` inside this box
    pub fn offset_of(&self, x: usize, y: usize) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        Some((y - self.y.start) * self.width() + (x - self.x.start))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn offsets() {
        let pb = PixelBox::new(2..5, 10..12);
        assert_eq!(pb.items(), 6);
        assert_eq!(pb.offset_of(2, 10), Some(0));
        assert_eq!(pb.offset_of(4, 11), Some(5));
        assert_eq!(pb.offset_of(5, 11), None);
    }

    #[test]
    fn inverted_range_is_empty() {
        #[allow(clippy::reversed_empty_ranges)]
        let pb = PixelBox::new(7..3, 0..2);
        assert!(pb.is_empty());
    }
}
