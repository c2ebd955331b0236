//! Volumes placed in the world.

mod cutting_plane;
mod params;
mod transform;

use std::sync::Arc;

use nalgebra::Point3;

use crate::{
    common::{BoundBox, Ray},
    error::validation_err,
    transfer_function::TransferFunction,
    volumetric::{BrickedVolume, PassVolume, VolumeResource},
    Result,
};

pub use cutting_plane::{CuttingPlane, LocalPlane, PlaneSpace};
pub use params::{RenderParams, DEFAULT_STEP_SIZE};
pub use transform::{LocalFrame, Transform};

/// Stable identifier, used to order placements at equal distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementId(pub u64);

/// One instance of a volume in the world.
///
/// Many placements may share a [`VolumeResource`]. Each has its own transform,
/// transfer function and [`RenderParams`].
#[derive(Debug)]
pub struct VolumePlacement {
    id: PlacementId,
    volume: Arc<VolumeResource>,
    streaming: Option<Arc<BrickedVolume>>,
    transform: Transform,
    params: RenderParams,
    tf: TransferFunction,
    visible: bool,
}

impl VolumePlacement {
    pub fn new(id: PlacementId, volume: Arc<VolumeResource>, tf: TransferFunction) -> Self {
        VolumePlacement {
            id,
            volume,
            streaming: None,
            transform: Transform::identity(),
            params: RenderParams::new(),
            tf,
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn id(&self) -> PlacementId {
        self.id
    }

    pub fn volume(&self) -> &Arc<VolumeResource> {
        &self.volume
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut RenderParams {
        &mut self.params
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.tf
    }

    pub fn transfer_function_mut(&mut self) -> &mut TransferFunction {
        &mut self.tf
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Sample through partially resident bricks instead of the whole texture.
    ///
    /// The bricked volume must be built over this placement's resource.
    pub fn set_streaming(&mut self, bricked: Option<Arc<BrickedVolume>>) -> Result<()> {
        if let Some(b) = &bricked {
            if !Arc::ptr_eq(b.source(), &self.volume) {
                return Err(validation_err(
                    "bricked volume belongs to a different resource",
                ));
            }
        }
        self.streaming = bricked;
        Ok(())
    }

    pub fn streaming(&self) -> Option<&Arc<BrickedVolume>> {
        self.streaming.as_ref()
    }

    /// Current mapping between the unit cube and the world
    pub fn local_frame(&self) -> LocalFrame {
        LocalFrame::new(&self.transform, &self.volume.world_extent())
    }

    pub fn local_to_world(&self, p: &Point3<f32>) -> Point3<f32> {
        self.local_frame().local_to_world(p)
    }

    pub fn world_to_local(&self, p: &Point3<f32>) -> Point3<f32> {
        self.local_frame().world_to_local(p)
    }

    pub fn ray_to_local(&self, ray: &Ray) -> (Ray, f32) {
        self.local_frame().ray_to_local(ray)
    }

    /// Axis aligned box around the transformed volume
    pub fn world_bound_box(&self) -> BoundBox {
        self.local_frame().world_bound_box()
    }

    pub fn center_world(&self) -> Point3<f32> {
        self.local_frame().center_world()
    }

    /// Data the next pass samples from
    pub fn pass_volume(&self) -> PassVolume {
        match &self.streaming {
            Some(bricked) => PassVolume::Bricked(bricked.snapshot()),
            None => PassVolume::Dense(self.volume.get_gpu_handle()),
        }
    }
}
