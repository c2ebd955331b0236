//! Direct volume rendering by ray marching.
//!
//! A [`volumetric::VolumeResource`] owns voxel data, a [`placement::VolumePlacement`]
//! puts it into the world together with its [`transfer_function::TransferFunction`]
//! and per-instance parameters, and the [`render::Compositor`] marches rays through
//! every visible placement and blends the result over a [`render::FrameBuffer`].

pub mod camera;
pub mod common;
mod error;
pub mod persist;
pub mod placement;
pub mod premade;
pub mod render;
pub mod test_helpers;
pub mod transfer_function;
pub mod volumetric;

pub use camera::PerspectiveCamera;
pub use error::{RaymarchError, Result};

/// Colors are linear RGB in `<0;1>`, opacity in `<0;1>`
pub mod color {
    use nalgebra::{vector, Vector4};

    pub type RGBA = Vector4<f32>;

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> RGBA {
        vector![r, g, b, a]
    }

    pub fn zero() -> RGBA {
        vector![0.0, 0.0, 0.0, 0.0]
    }

    pub fn mono(v: f32, opacity: f32) -> RGBA {
        vector![v, v, v, opacity]
    }

    /// Component-wise linear blend, `t = 0` yields `a`
    pub fn lerp(a: &RGBA, b: &RGBA, t: f32) -> RGBA {
        a * (1.0 - t) + b * t
    }
}
