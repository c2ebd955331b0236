mod bricked_volume;
mod encoding;
mod resource;
mod texture;
mod volume;

use std::sync::Arc;

use nalgebra::{Point3, Vector3};

use crate::common::ValueRange;

pub use bricked_volume::{Brick, BrickSnapshot, BrickedVolume, Residency};
pub use encoding::ScalarEncoding;
pub use resource::{VolumeInfo, VolumeResource};
pub use texture::VolumeTexture;
pub use volume::{Footprint, Volume};

/// Data one render pass samples from, fixed when the pass is submitted
#[derive(Clone)]
pub enum PassVolume {
    Dense(Arc<VolumeTexture>),
    Bricked(BrickSnapshot),
}

impl PassVolume {
    /// `None` for dense volumes, which are always complete
    pub fn residency(&self) -> Option<Residency> {
        match self {
            PassVolume::Dense(_) => None,
            PassVolume::Bricked(snapshot) => Some(snapshot.residency()),
        }
    }

    /// Physical size of the grid the pass samples
    pub fn world_extent(&self) -> Vector3<f32> {
        match self {
            PassVolume::Dense(texture) => texture.world_extent(),
            PassVolume::Bricked(snapshot) => snapshot.world_extent(),
        }
    }

    /// Generation of the [`VolumeResource`] the data was taken from
    pub fn source_generation(&self) -> u64 {
        match self {
            PassVolume::Dense(texture) => texture.generation(),
            PassVolume::Bricked(snapshot) => snapshot.source_generation(),
        }
    }

    /// Mark empty bricks, see [`BrickSnapshot::mark_empty_space`].
    /// Dense volumes have no bricks and nothing is marked.
    pub fn mark_empty_space(&mut self, is_transparent: impl Fn(ValueRange) -> bool) -> usize {
        match self {
            PassVolume::Dense(_) => 0,
            PassVolume::Bricked(snapshot) => snapshot.mark_empty_space(is_transparent),
        }
    }
}

impl Volume for PassVolume {
    fn get_size(&self) -> Vector3<usize> {
        match self {
            PassVolume::Dense(v) => v.get_size(),
            PassVolume::Bricked(v) => v.get_size(),
        }
    }

    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        match self {
            PassVolume::Dense(v) => v.get_data(x, y, z),
            PassVolume::Bricked(v) => v.get_data(x, y, z),
        }
    }

    #[inline]
    fn sample_at(&self, pos: Point3<f32>) -> f32 {
        match self {
            PassVolume::Dense(v) => v.sample_at(pos),
            PassVolume::Bricked(v) => v.sample_at(pos),
        }
    }

    fn generation(&self) -> u64 {
        match self {
            PassVolume::Dense(v) => v.generation(),
            PassVolume::Bricked(v) => v.generation(),
        }
    }

    #[inline]
    fn skips_local(&self, pos: Point3<f32>) -> bool {
        match self {
            PassVolume::Dense(_) => false,
            PassVolume::Bricked(v) => v.skips_local(pos),
        }
    }
}
