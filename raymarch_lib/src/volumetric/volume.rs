use nalgebra::{point, vector, Point3, Vector3};

/// Read-only scalar field with values normalized into `<0;1>`.
///
/// Two coordinate systems are used:
/// * voxel coordinates, `<0;size-1>` per axis, used by [`sample_at`](Volume::sample_at)
/// * local coordinates, the unit cube `<0;1>^3` the ray marcher works in
///
/// Sampling never fails: positions outside the volume, and data that is not
/// resident, read as 0.
pub trait Volume {
    /// Data dimensions in voxels
    fn get_size(&self) -> Vector3<usize>;

    /// Voxel value, `None` when outside or not resident
    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32>;

    /// Trilinear interpolation sample in voxel coordinates, zero if outside
    fn sample_at(&self, pos: Point3<f32>) -> f32;

    /// Resource generation the data was taken from
    fn generation(&self) -> u64;

    /// True if local `pos` lies in a region marked as empty space.
    /// Such samples are known to be transparent and need not be read.
    fn skips_local(&self, _pos: Point3<f32>) -> bool {
        false
    }

    /// Map local position to voxel coordinates, `None` outside the unit cube
    fn local_to_voxel(&self, pos: Point3<f32>) -> Option<Point3<f32>> {
        if !(0..3).all(|i| (0.0..=1.0).contains(&pos[i])) {
            return None;
        }
        let max = self.get_size().map(|v| v.saturating_sub(1) as f32);
        Some(point![pos.x * max.x, pos.y * max.y, pos.z * max.z])
    }

    /// Trilinear sample in local coordinates, zero if outside
    fn sample_local(&self, pos: Point3<f32>) -> f32 {
        match self.local_to_voxel(pos) {
            Some(voxel) => self.sample_at(voxel),
            None => 0.0,
        }
    }

    /// Gradient in local coordinates estimated by central differences.
    ///
    /// Neighbours are half a voxel away; outside neighbours read as 0,
    /// so the border of the volume has a gradient pointing inwards.
    fn gradient_local(&self, pos: Point3<f32>) -> Vector3<f32> {
        let size = self.get_size();
        let mut grad = Vector3::zeros();
        for axis in 0..3 {
            let h = 0.5 / size[axis].saturating_sub(1).max(1) as f32;
            let mut offset = vector![0.0, 0.0, 0.0];
            offset[axis] = h;
            let forward = self.sample_local(pos + offset);
            let backward = self.sample_local(pos - offset);
            grad[axis] = (forward - backward) / (2.0 * h);
        }
        grad
    }
}

/// The 8 voxels around a sampling position and the interpolation weights.
///
/// `lo` and `hi` differ by one on every axis with at least two voxels,
/// so a footprint never needs data past the last voxel.
#[derive(Debug, Clone, Copy)]
pub struct Footprint {
    pub lo: Vector3<usize>,
    pub hi: Vector3<usize>,
    pub t: Vector3<f32>,
}

impl Footprint {
    /// `pos` must lie in `<0;size-1>`
    pub fn new(pos: &Point3<f32>, size: &Vector3<usize>) -> Footprint {
        let mut lo = Vector3::zeros();
        let mut hi = Vector3::zeros();
        let mut t = Vector3::zeros();
        for axis in 0..3 {
            let n = size[axis];
            if n < 2 {
                continue;
            }
            let base = (pos[axis].floor().max(0.0) as usize).min(n - 2);
            lo[axis] = base;
            hi[axis] = base + 1;
            t[axis] = (pos[axis] - base as f32).clamp(0.0, 1.0);
        }
        Footprint { lo, hi, t }
    }

    /// True if voxel position `pos` is inside a volume of `size`
    pub fn in_bounds(pos: &Point3<f32>, size: &Vector3<usize>) -> bool {
        (0..3).all(|i| pos[i] >= 0.0 && pos[i] <= size[i].saturating_sub(1) as f32)
    }

    /// Trilinear blend of the 8 values returned by `fetch`
    #[inline]
    pub fn interpolate(&self, fetch: impl Fn(usize, usize, usize) -> f32) -> f32 {
        let Footprint { lo, hi, t } = *self;

        let inv_z_t = 1.0 - t.z;
        let inv_y_t = 1.0 - t.y;

        // first plane
        let c00 = fetch(lo.x, lo.y, lo.z) * inv_z_t + fetch(lo.x, lo.y, hi.z) * t.z; // y low
        let c01 = fetch(lo.x, hi.y, lo.z) * inv_z_t + fetch(lo.x, hi.y, hi.z) * t.z; // y high
        let c0 = c00 * inv_y_t + c01 * t.y; // point on yz plane

        // second plane
        let c10 = fetch(hi.x, lo.y, lo.z) * inv_z_t + fetch(hi.x, lo.y, hi.z) * t.z;
        let c11 = fetch(hi.x, hi.y, lo.z) * inv_z_t + fetch(hi.x, hi.y, hi.z) * t.z;
        let c1 = c10 * inv_y_t + c11 * t.y;

        c0 * (1.0 - t.x) + c1 * t.x
    }
}
