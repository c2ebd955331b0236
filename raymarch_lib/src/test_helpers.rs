//! Module with helper functions
//! Saves repetition in unit tests

use nalgebra::{point, vector, Vector3};

use crate::{
    color,
    premade::transfer_functions,
    transfer_function::{ControlPoint, TransferFunction},
    volumetric::{ScalarEncoding, VolumeResource},
    PerspectiveCamera,
};

/// `u8` volume with every voxel set to `value`, unit spacing
pub fn uniform_volume(dims: Vector3<usize>, value: u8) -> VolumeResource {
    let data = vec![value; dims.x * dims.y * dims.z];
    VolumeResource::load(data, dims, vector![1.0, 1.0, 1.0], ScalarEncoding::u8())
        .expect("uniform volume")
}

/// `u8` volume where value grows with the voxel index, never zero
pub fn ramp_volume(dims: Vector3<usize>) -> VolumeResource {
    let count = dims.x * dims.y * dims.z;
    let data = (0..count).map(|i| (1 + i % 250) as u8).collect();
    VolumeResource::load(data, dims, vector![1.0, 1.0, 1.0], ScalarEncoding::u8())
        .expect("ramp volume")
}

/// Transparent at 0, opaque red at 1
pub fn red_tf() -> TransferFunction {
    TransferFunction::from_points(vec![
        ControlPoint::new(0.0, color::zero()),
        ControlPoint::new(1.0, color::new(1.0, 0.0, 0.0, 1.0)),
    ])
    .expect("red tf")
}

/// Gray, opacity at most 0.1
pub fn grayscale_tf() -> TransferFunction {
    TransferFunction::from_points(vec![
        ControlPoint::new(0.0, color::mono(0.0, 0.0)),
        ControlPoint::new(1.0, color::mono(1.0, 0.1)),
    ])
    .expect("grayscale tf")
}

pub fn opaque_tf(rgb: Vector3<f32>) -> TransferFunction {
    transfer_functions::opaque(rgb)
}

/// Camera on the +z axis looking at the center of the unit cube
pub fn unit_cube_camera(distance: f32) -> PerspectiveCamera {
    PerspectiveCamera::looking_at(point![0.5, 0.5, 0.5 + distance], point![0.5, 0.5, 0.5])
}
