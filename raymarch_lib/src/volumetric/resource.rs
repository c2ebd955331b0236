use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use nalgebra::Vector3;
use parking_lot::{Mutex, RwLock};

use crate::{common::ValueRange, error::format_err, Result};

use super::{ScalarEncoding, Volume, VolumeTexture};

/// Shape of the voxel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo {
    /// Number of voxels per axis
    pub dims: Vector3<usize>,
    /// Physical size of one voxel
    pub spacing: Vector3<f32>,
    pub encoding: ScalarEncoding,
}

impl VolumeInfo {
    pub fn voxel_count(&self) -> usize {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Physical size of the whole grid, `dims * spacing`
    pub fn world_extent(&self) -> Vector3<f32> {
        self.dims.map(|v| v as f32).component_mul(&self.spacing)
    }

    fn validate(&self, raw_len: usize) -> Result<()> {
        if self.dims.iter().any(|&d| d == 0) {
            return Err(format_err(format!("non-positive dimensions {:?}", self.dims)));
        }
        if self.spacing.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(format_err(format!("invalid voxel spacing {:?}", self.spacing)));
        }
        self.encoding.validate()?;

        let expected = self
            .dims
            .iter()
            .try_fold(self.encoding.bytes_per_voxel(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| format_err("volume dimensions overflow"))?;
        if raw_len != expected {
            return Err(format_err(format!(
                "data length mismatch: expected {expected} bytes, got {raw_len}"
            )));
        }
        Ok(())
    }
}

struct ResourceData {
    info: VolumeInfo,
    raw: Vec<u8>,
    value_range: ValueRange,
}

impl ResourceData {
    fn new(info: VolumeInfo, raw: Vec<u8>) -> ResourceData {
        let bpv = info.encoding.bytes_per_voxel();
        let mut value_range = ValueRange::empty();
        for bytes in raw.chunks_exact(bpv) {
            let v = info.encoding.decode(bytes);
            if !v.is_nan() {
                value_range.extend(v);
            }
        }
        ResourceData {
            info,
            raw,
            value_range,
        }
    }
}

/// Volume data owned by the renderer.
///
/// Holds the raw voxels as loaded and lazily derives a [`VolumeTexture`] from them.
/// Every invalidation (reload) bumps the generation; passes hold on to the
/// texture they captured, so they finish against a frozen snapshot.
///
/// Share between placements with `Arc<VolumeResource>`.
pub struct VolumeResource {
    // Lock order: texture, then data
    texture: Mutex<Option<Arc<VolumeTexture>>>,
    data: RwLock<ResourceData>,
    generation: AtomicU64,
}

impl std::fmt::Debug for VolumeResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeResource")
            .field("info", &self.info())
            .field("generation", &self.generation())
            .finish()
    }
}

impl VolumeResource {
    /// Validate and take ownership of raw voxel data, x varies fastest.
    ///
    /// Fails with [`RaymarchError::Format`](crate::RaymarchError::Format) for zero dimensions,
    /// bad spacing, unsupported encoding or when `raw.len()` does not match
    /// `dims.x * dims.y * dims.z * bytes_per_voxel`.
    pub fn load(
        raw: Vec<u8>,
        dims: Vector3<usize>,
        spacing: Vector3<f32>,
        encoding: ScalarEncoding,
    ) -> Result<VolumeResource> {
        let info = VolumeInfo {
            dims,
            spacing,
            encoding,
        };
        info.validate(raw.len())?;

        log::info!(
            "Loaded volume {}x{}x{}, {} bit, spacing {:?}",
            dims.x,
            dims.y,
            dims.z,
            encoding.bits,
            spacing
        );

        Ok(VolumeResource {
            texture: Mutex::new(None),
            data: RwLock::new(ResourceData::new(info, raw)),
            generation: AtomicU64::new(1),
        })
    }

    /// Replace the data. On failure the current data stays active.
    ///
    /// Passes already in flight keep rendering the texture they captured.
    pub fn reload(
        &self,
        raw: Vec<u8>,
        dims: Vector3<usize>,
        spacing: Vector3<f32>,
        encoding: ScalarEncoding,
    ) -> Result<()> {
        let info = VolumeInfo {
            dims,
            spacing,
            encoding,
        };
        info.validate(raw.len())?;
        let new_data = ResourceData::new(info, raw);

        let mut texture = self.texture.lock();
        let mut data = self.data.write();
        *data = new_data;
        *texture = None;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        log::info!("Volume reloaded, generation {generation}");
        Ok(())
    }

    /// Current resource-generation token
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn info(&self) -> VolumeInfo {
        self.data.read().info
    }

    pub fn dims(&self) -> Vector3<usize> {
        self.data.read().info.dims
    }

    pub fn spacing(&self) -> Vector3<f32> {
        self.data.read().info.spacing
    }

    pub fn world_extent(&self) -> Vector3<f32> {
        self.data.read().info.world_extent()
    }

    /// Range of raw (not normalized) scalar values present in the data
    pub fn value_range(&self) -> ValueRange {
        self.data.read().value_range
    }

    /// Run `f` with the raw voxel bytes, the data cannot change meanwhile
    pub fn with_raw<R>(&self, f: impl FnOnce(&VolumeInfo, &[u8]) -> R) -> R {
        self.with_versioned_raw(|info, raw, _| f(info, raw))
    }

    /// Like [`with_raw`](VolumeResource::with_raw), also passes the generation the bytes belong to
    pub fn with_versioned_raw<R>(&self, f: impl FnOnce(&VolumeInfo, &[u8], u64) -> R) -> R {
        let data = self.data.read();
        // Reload bumps the generation under the write lock
        f(&data.info, &data.raw, self.generation())
    }

    /// Shape of the grid together with its generation, read atomically
    pub fn versioned_info(&self) -> (VolumeInfo, u64) {
        let data = self.data.read();
        (data.info, self.generation())
    }

    /// Render-ready texture, built on first access and cached until reload
    pub fn get_gpu_handle(&self) -> Arc<VolumeTexture> {
        let mut texture = self.texture.lock();
        if let Some(tex) = texture.as_ref() {
            return tex.clone();
        }

        let data = self.data.read();
        let normalized = data.info.encoding.decode_normalized(&data.raw);
        let tex = Arc::new(
            VolumeTexture::new(data.info.dims, normalized, self.generation())
                .with_spacing(data.info.spacing),
        );
        log::debug!("Built texture for generation {}", tex.generation());

        *texture = Some(tex.clone());
        tex
    }

    /// True if a texture is currently cached
    pub fn is_uploaded(&self) -> bool {
        self.texture.lock().is_some()
    }
}
