use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use nalgebra::{vector, Point3, Vector3};
use parking_lot::RwLock;

use crate::{
    common::ValueRange,
    error::validation_err,
    RaymarchError, Result,
};

use super::{Footprint, Volume, VolumeInfo, VolumeResource};

/// Cube of `side^3` voxels, x varies fastest.
///
/// Neighbouring bricks share one layer of voxels, so the trilinear
/// footprint of any sample lies entirely inside a single brick.
pub struct Brick {
    origin: Vector3<usize>,
    side: usize,
    data: Vec<f32>,
    value_range: ValueRange,
}

impl Brick {
    /// Decode the voxels of one brick from raw bytes laid out as `info` says
    fn from_raw(info: &VolumeInfo, raw: &[u8], origin: Vector3<usize>, side: usize) -> Brick {
        let dims = info.dims;
        let bpv = info.encoding.bytes_per_voxel();
        let mut data = Vec::with_capacity(side * side * side);
        let mut value_range = ValueRange::empty();
        for z in 0..side {
            for y in 0..side {
                for x in 0..side {
                    let voxel = origin + vector![x, y, z];
                    // Voxels past the end of the volume are padding
                    if (0..3).any(|i| voxel[i] >= dims[i]) {
                        data.push(0.0);
                        continue;
                    }
                    let start = (voxel.x + voxel.y * dims.x + voxel.z * dims.x * dims.y) * bpv;
                    let value = raw
                        .get(start..start + bpv)
                        .map(|bytes| info.encoding.decode_normalized_voxel(bytes))
                        .unwrap_or(0.0);
                    value_range.extend(value);
                    data.push(value);
                }
            }
        }
        Brick {
            origin,
            side,
            data,
            value_range,
        }
    }

    #[inline]
    fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[x + y * self.side + z * self.side * self.side]
    }

    /// First voxel of the brick in volume coordinates
    pub fn origin(&self) -> Vector3<usize> {
        self.origin
    }

    /// Normalized values of the voxels inside the volume, padding excluded
    pub fn value_range(&self) -> ValueRange {
        self.value_range
    }
}

/// Number of resident bricks out of all bricks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Residency {
    pub resident: usize,
    pub total: usize,
}

impl Residency {
    pub fn is_complete(&self) -> bool {
        self.resident == self.total
    }
}

struct BrickState {
    size: Vector3<usize>,
    extent: Vector3<f32>,
    grid: Vector3<usize>,
    source_generation: u64,
    bricks: Vec<Option<Arc<Brick>>>,
}

impl BrickState {
    fn new(info: &VolumeInfo, side: usize, source_generation: u64) -> BrickState {
        let size = info.dims;
        let grid = size.map(|n| bricks_along(n, side));
        BrickState {
            size,
            extent: info.world_extent(),
            grid,
            source_generation,
            bricks: vec![None; grid.x * grid.y * grid.z],
        }
    }

    fn index(&self, coord: Vector3<usize>) -> Option<usize> {
        if (0..3).any(|i| coord[i] >= self.grid[i]) {
            return None;
        }
        Some(coord.x + coord.y * self.grid.x + coord.z * self.grid.x * self.grid.y)
    }

    fn resident(&self) -> usize {
        self.bricks.iter().filter(|b| b.is_some()).count()
    }
}

// Bricks needed to cover `n` voxels when neighbours share one voxel
fn bricks_along(n: usize, side: usize) -> usize {
    if n <= side {
        1
    } else {
        (n - 2) / (side - 1) + 1
    }
}

/// Partially resident view of a [`VolumeResource`].
///
/// Bricks are loaded and evicted independently of rendering. Residency is a
/// mapping brick coordinate -> optional brick; a brick is swapped in or out as
/// a whole, so readers see it either complete or absent.
/// Rendering goes through [`snapshot`](BrickedVolume::snapshot).
pub struct BrickedVolume {
    source: Arc<VolumeResource>,
    side: usize,
    state: RwLock<BrickState>,
    generation: AtomicU64,
}

impl std::fmt::Debug for BrickedVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("BrickedVolume")
            .field("brick_side", &self.side)
            .field("grid", &state.grid)
            .field("resident", &state.resident())
            .field("generation", &self.generation())
            .finish()
    }
}

impl BrickedVolume {
    /// Bricked view with nothing resident. `brick_side` must be at least 2.
    pub fn new(source: Arc<VolumeResource>, brick_side: usize) -> Result<BrickedVolume> {
        if brick_side < 2 {
            return Err(validation_err(format!(
                "brick side must be at least 2, got {brick_side}"
            )));
        }
        let (info, source_generation) = source.versioned_info();
        let state = BrickState::new(&info, brick_side, source_generation);
        log::debug!(
            "Bricked volume {:?} split into {:?} bricks of side {brick_side}",
            state.size,
            state.grid
        );
        Ok(BrickedVolume {
            source,
            side: brick_side,
            state: RwLock::new(state),
            generation: AtomicU64::new(1),
        })
    }

    pub fn source(&self) -> &Arc<VolumeResource> {
        &self.source
    }

    pub fn brick_side(&self) -> usize {
        self.side
    }

    /// Number of bricks along each axis
    pub fn grid(&self) -> Vector3<usize> {
        self.sync_source();
        self.state.read().grid
    }

    pub fn brick_count(&self) -> usize {
        let grid = self.grid();
        grid.x * grid.y * grid.z
    }

    pub fn resident_count(&self) -> usize {
        self.sync_source();
        self.state.read().resident()
    }

    /// Bumped on every residency change
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_resident(&self, coord: Vector3<usize>) -> bool {
        self.brick(coord).is_ok()
    }

    /// Resident brick, [`RaymarchError::ResourceUnavailable`] otherwise
    pub fn brick(&self, coord: Vector3<usize>) -> Result<Arc<Brick>> {
        self.sync_source();
        let state = self.state.read();
        state
            .index(coord)
            .and_then(|i| state.bricks[i].clone())
            .ok_or(RaymarchError::ResourceUnavailable { brick: coord })
    }

    /// Make brick resident, decoding it straight from the source bytes.
    ///
    /// Returns `Ok(true)` once the brick is resident. `Ok(false)` means the
    /// source was reloaded while the brick was decoded; the brick is dropped
    /// and has to be requested again. Coordinates outside the grid are rejected.
    pub fn load_brick(&self, coord: Vector3<usize>) -> Result<bool> {
        self.sync_source();

        {
            let state = self.state.read();
            let index = state
                .index(coord)
                .ok_or_else(|| validation_err(format!("brick {coord:?} outside grid")))?;
            if state.bricks[index].is_some() {
                return Ok(true);
            }
        }

        let origin = coord * (self.side - 1);
        let (brick, built_from) = self.source.with_versioned_raw(|info, raw, generation| {
            (Brick::from_raw(info, raw, origin, self.side), generation)
        });

        self.sync_source();
        Ok(self.insert_brick(coord, Arc::new(brick), built_from))
    }

    // False if the brick does not belong to the current grid
    fn insert_brick(&self, coord: Vector3<usize>, brick: Arc<Brick>, built_from: u64) -> bool {
        let mut state = self.state.write();
        if state.source_generation != built_from {
            log::debug!(
                "Dropping brick {coord:?} of generation {built_from}, grid is at {}",
                state.source_generation
            );
            return false;
        }
        match state.index(coord) {
            Some(index) => {
                state.bricks[index] = Some(brick);
                self.generation.fetch_add(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Drop brick, returns `false` if it was not resident
    pub fn evict_brick(&self, coord: Vector3<usize>) -> bool {
        let mut state = self.state.write();
        let evicted = match state.index(coord) {
            Some(index) => state.bricks[index].take().is_some(),
            None => false,
        };
        if evicted {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        evicted
    }

    /// Load every brick, `Ok(false)` if a reload interrupted it
    pub fn load_all(&self) -> Result<bool> {
        let grid = self.grid();
        for z in 0..grid.z {
            for y in 0..grid.y {
                for x in 0..grid.x {
                    if !self.load_brick(vector![x, y, z])? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    pub fn evict_all(&self) {
        let mut state = self.state.write();
        state.bricks.iter_mut().for_each(|b| *b = None);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Frozen view for one pass. Later loads and evictions do not affect it.
    pub fn snapshot(&self) -> BrickSnapshot {
        self.sync_source();
        let state = self.state.read();
        let residency = Residency {
            resident: state.resident(),
            total: state.bricks.len(),
        };
        if !residency.is_complete() {
            log::debug!(
                "Snapshot with {}/{} bricks resident",
                residency.resident,
                residency.total
            );
        }
        BrickSnapshot {
            size: state.size,
            extent: state.extent,
            stride: self.side - 1,
            grid: state.grid,
            bricks: state.bricks.clone(),
            empty: Vec::new(),
            generation: self.generation(),
            source_generation: state.source_generation,
            residency,
        }
    }

    // Throw away bricks of an outdated source generation
    fn sync_source(&self) {
        if self.state.read().source_generation == self.source.generation() {
            return;
        }
        let (info, source_generation) = self.source.versioned_info();
        let mut state = self.state.write();
        if state.source_generation != source_generation {
            *state = BrickState::new(&info, self.side, source_generation);
            self.generation.fetch_add(1, Ordering::AcqRel);
            log::info!("Source volume changed, bricks dropped, grid {:?}", state.grid);
        }
    }
}

/// Residency frozen at pass submission
#[derive(Clone)]
pub struct BrickSnapshot {
    size: Vector3<usize>,
    extent: Vector3<f32>,
    stride: usize,
    grid: Vector3<usize>,
    bricks: Vec<Option<Arc<Brick>>>,
    /// Per brick, true if every sample in it is transparent. Empty until classified.
    empty: Vec<bool>,
    generation: u64,
    source_generation: u64,
    residency: Residency,
}

impl BrickSnapshot {
    /// Completeness signal, missing bricks render as empty space
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Physical size of the grid the bricks were cut from
    pub fn world_extent(&self) -> Vector3<f32> {
        self.extent
    }

    /// Generation of the source volume the bricks were decoded from
    pub fn source_generation(&self) -> u64 {
        self.source_generation
    }

    /// Mark bricks whose value range `is_transparent` rejects as empty space.
    ///
    /// Missing bricks read as 0 and are classified by the range `<0;0>`.
    /// Returns the number of empty bricks.
    pub fn mark_empty_space(&mut self, is_transparent: impl Fn(ValueRange) -> bool) -> usize {
        let missing = is_transparent(ValueRange::new(0.0, 0.0));
        self.empty = self
            .bricks
            .iter()
            .map(|brick| match brick {
                Some(brick) => is_transparent(brick.value_range),
                None => missing,
            })
            .collect();
        self.empty.iter().filter(|&&e| e).count()
    }

    #[inline]
    fn brick_index(&self, voxel: &Vector3<usize>) -> usize {
        let coord = voxel.zip_map(&self.grid, |v, g| (v / self.stride).min(g - 1));
        coord.x + coord.y * self.grid.x + coord.z * self.grid.x * self.grid.y
    }

    #[inline]
    fn brick_for(&self, voxel: &Vector3<usize>) -> Option<&Brick> {
        self.bricks[self.brick_index(voxel)].as_deref()
    }
}

impl Volume for BrickSnapshot {
    fn get_size(&self) -> Vector3<usize> {
        self.size
    }

    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return None;
        }
        let voxel = vector![x, y, z];
        let brick = self.brick_for(&voxel)?;
        let off = voxel - brick.origin;
        Some(brick.get(off.x, off.y, off.z))
    }

    fn sample_at(&self, pos: Point3<f32>) -> f32 {
        if !Footprint::in_bounds(&pos, &self.size) {
            return 0.0;
        }
        let footprint = Footprint::new(&pos, &self.size);
        let brick = match self.brick_for(&footprint.lo) {
            Some(b) => b,
            None => return 0.0,
        };
        let o = brick.origin;
        footprint.interpolate(|x, y, z| brick.get(x - o.x, y - o.y, z - o.z))
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    fn skips_local(&self, pos: Point3<f32>) -> bool {
        if self.empty.is_empty() {
            return false;
        }
        match self.local_to_voxel(pos) {
            Some(voxel) if Footprint::in_bounds(&voxel, &self.size) => {
                // Same brick sample_at reads from
                let footprint = Footprint::new(&voxel, &self.size);
                self.empty[self.brick_index(&footprint.lo)]
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;

    use super::*;
    use crate::{
        test_helpers::{ramp_volume, uniform_volume},
        volumetric::ScalarEncoding,
    };

    #[test]
    fn brick_counts() {
        assert_eq!(bricks_along(1, 4), 1);
        assert_eq!(bricks_along(4, 4), 1);
        assert_eq!(bricks_along(5, 4), 2);
        assert_eq!(bricks_along(7, 4), 2);
        assert_eq!(bricks_along(8, 4), 3);
    }

    #[test]
    fn rejects_tiny_bricks() {
        let vol = Arc::new(ramp_volume(vector![4, 4, 4]));
        assert!(BrickedVolume::new(vol, 1).is_err());
    }

    #[test]
    fn fully_resident_matches_dense() {
        let vol = Arc::new(ramp_volume(vector![9, 5, 6]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();
        bricked.load_all().unwrap();

        let dense = vol.get_gpu_handle();
        let snapshot = bricked.snapshot();
        assert!(snapshot.residency().is_complete());

        for z in 0..6 {
            for y in 0..5 {
                for x in 0..9 {
                    assert_eq!(snapshot.get_data(x, y, z), dense.get_data(x, y, z));
                }
            }
        }

        let spots = [0.1, 0.33, 0.5, 0.77, 0.99];
        for s in spots {
            let pos = point![s * 8.0, s * 4.0, s * 5.0];
            let diff = (snapshot.sample_at(pos) - dense.sample_at(pos)).abs();
            assert!(diff < 1e-6);
        }
    }

    #[test]
    fn missing_brick_samples_empty() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol, 4).unwrap();
        bricked.load_all().unwrap();
        assert!(bricked.evict_brick(vector![2, 2, 2]));
        assert!(!bricked.evict_brick(vector![2, 2, 2]));

        let snapshot = bricked.snapshot();
        assert_eq!(snapshot.residency().resident, snapshot.residency().total - 1);
        assert_eq!(snapshot.sample_at(point![7.0, 7.0, 7.0]), 0.0);
        assert!(snapshot.sample_at(point![7.0, 0.0, 0.0]) > 0.0);

        let err = bricked.brick(vector![2, 2, 2]);
        assert!(matches!(
            err,
            Err(RaymarchError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn snapshot_is_frozen() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol, 4).unwrap();
        bricked.load_all().unwrap();

        let snapshot = bricked.snapshot();
        let generation = bricked.generation();
        bricked.evict_all();

        assert!(bricked.generation() > generation);
        assert_eq!(bricked.resident_count(), 0);
        assert!(snapshot.sample_at(point![7.0, 1.0, 1.0]) > 0.0);
    }

    #[test]
    fn out_of_grid_load_is_rejected() {
        let vol = Arc::new(ramp_volume(vector![4, 4, 4]));
        let bricked = BrickedVolume::new(vol, 4).unwrap();

        assert!(bricked.load_brick(vector![1, 0, 0]).is_err());
        assert!(bricked.load_brick(vector![0, 0, 0]).is_ok());
        assert!(bricked.is_resident(vector![0, 0, 0]));
    }

    #[test]
    fn source_reload_drops_bricks() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();
        bricked.load_all().unwrap();

        vol.reload(
            vec![0; 4 * 4 * 4],
            vector![4, 4, 4],
            vector![1.0, 1.0, 1.0],
            ScalarEncoding::u8(),
        )
        .unwrap();

        assert_eq!(bricked.resident_count(), 0);
        assert_eq!(bricked.grid(), vector![1, 1, 1]);
    }

    #[test]
    fn concurrent_eviction_does_not_tear() {
        let vol = Arc::new(ramp_volume(vector![16, 16, 16]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();
        bricked.load_all().unwrap();
        let dense = vol.get_gpu_handle();

        crossbeam::thread::scope(|s| {
            s.spawn(|_| {
                for round in 0..50 {
                    let coord = vector![round % 5, (round / 5) % 5, 0];
                    bricked.evict_brick(coord);
                    bricked.load_brick(coord).unwrap();
                }
            });
            s.spawn(|_| {
                for _ in 0..50 {
                    let snapshot = bricked.snapshot();
                    for i in 0..16 {
                        let pos = point![i as f32 * 0.9, 2.5, 0.5];
                        let sample = snapshot.sample_at(pos);
                        // Either the whole brick or nothing
                        assert!(sample == 0.0 || (sample - dense.sample_at(pos)).abs() < 1e-6);
                    }
                }
            });
        })
        .unwrap();
    }

    #[test]
    fn loading_bricks_leaves_texture_alone() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();

        assert!(bricked.load_brick(vector![1, 1, 1]).unwrap());
        assert!(!vol.is_uploaded());

        assert!(bricked.load_all().unwrap());
        bricked.evict_all();
        assert!(bricked.load_brick(vector![0, 0, 0]).unwrap());
        assert!(!vol.is_uploaded());
    }

    #[test]
    fn brick_decodes_multi_byte_voxels() {
        let mut raw = Vec::new();
        for v in 0..27u16 {
            raw.extend_from_slice(&(v * 1000).to_le_bytes());
        }
        let encoding = ScalarEncoding::u16().with_range(ValueRange::new(0.0, 26000.0));
        let vol = Arc::new(
            VolumeResource::load(raw, vector![3, 3, 3], vector![1.0, 1.0, 1.0], encoding).unwrap(),
        );
        let bricked = BrickedVolume::new(vol, 3).unwrap();
        bricked.load_all().unwrap();

        let snapshot = bricked.snapshot();
        assert_eq!(snapshot.get_data(0, 0, 0), Some(0.0));
        assert_eq!(snapshot.get_data(2, 2, 2), Some(1.0));
        let brick = bricked.brick(vector![0, 0, 0]).unwrap();
        assert_eq!(brick.value_range(), ValueRange::new(0.0, 1.0));
    }

    #[test]
    fn stale_brick_is_reported() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();

        let (brick, built_from) = vol.with_versioned_raw(|info, raw, generation| {
            (Brick::from_raw(info, raw, Vector3::zeros(), 4), generation)
        });
        vol.reload(
            vec![0; 8 * 8 * 8],
            vector![8, 8, 8],
            vector![1.0, 1.0, 1.0],
            ScalarEncoding::u8(),
        )
        .unwrap();
        assert_eq!(bricked.resident_count(), 0);

        assert!(!bricked.insert_brick(vector![0, 0, 0], Arc::new(brick), built_from));
        assert!(!bricked.is_resident(vector![0, 0, 0]));

        assert!(bricked.load_brick(vector![0, 0, 0]).unwrap());
        assert_eq!(bricked.brick(vector![0, 0, 0]).unwrap().value_range(), ValueRange::new(0.0, 0.0));
    }

    #[test]
    fn empty_space_follows_classifier() {
        // 0 below x = 4, 1 from there on
        let mut raw = vec![0u8; 8 * 8 * 8];
        for (i, v) in raw.iter_mut().enumerate() {
            if i % 8 >= 4 {
                *v = 255;
            }
        }
        let vol = Arc::new(
            VolumeResource::load(raw, vector![8, 8, 8], vector![1.0, 1.0, 1.0], ScalarEncoding::u8())
                .unwrap(),
        );
        let bricked = BrickedVolume::new(vol, 4).unwrap();
        bricked.load_all().unwrap();
        bricked.evict_brick(vector![2, 2, 2]);

        let mut snapshot = bricked.snapshot();
        assert!(!snapshot.skips_local(point![0.1, 0.1, 0.1]));

        // Bricks starting at x 0 hold zeros only, the rest touch the filled half
        let empty = snapshot.mark_empty_space(|range| range.high <= 0.0);
        assert_eq!(empty, 9 + 1);
        assert!(snapshot.skips_local(point![0.1, 0.5, 0.5]));
        assert!(!snapshot.skips_local(point![0.9, 0.5, 0.5]));
        // The evicted corner brick reads as 0
        assert!(snapshot.skips_local(point![1.0, 1.0, 1.0]));
        assert_eq!(snapshot.sample_local(point![1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn debug_lists_grid() {
        let vol = Arc::new(uniform_volume(vector![8, 8, 8], 10));
        let bricked = BrickedVolume::new(vol, 4).unwrap();
        let text = format!("{bricked:?}");
        assert!(text.contains("BrickedVolume"));
        assert!(text.contains("brick_side: 4"));
    }

    #[test]
    fn snapshot_keeps_extent_of_its_source() {
        let vol = Arc::new(ramp_volume(vector![8, 8, 8]));
        let bricked = BrickedVolume::new(vol.clone(), 4).unwrap();
        let before = bricked.snapshot();

        vol.reload(
            vec![0; 4 * 4 * 4],
            vector![4, 4, 4],
            vector![3.0, 3.0, 3.0],
            ScalarEncoding::u8(),
        )
        .unwrap();
        let after = bricked.snapshot();

        assert_eq!(before.world_extent(), vector![8.0, 8.0, 8.0]);
        assert_eq!(after.world_extent(), vector![12.0, 12.0, 12.0]);
        assert!(after.source_generation() > before.source_generation());
        assert_eq!(after.get_size(), vector![4, 4, 4]);
    }
}
