//! Per-ray marching and front-to-back compositing.
//!
//! Everything here is infallible. Invalid configuration is rejected before a
//! pass is built, so the per-sample path has no error branches.

use nalgebra::Vector3;

use crate::{
    color::{self, RGBA},
    common::{BoundBox, Ray, ValueRange},
    placement::LocalPlane,
    transfer_function::LookupTable,
    volumetric::Volume,
};

use super::Lighting;

/// Settings of one ray march, all distances in local unit cube units
#[derive(Debug, Clone, Copy)]
pub struct MarchParams {
    pub step_size: f32,
    pub window: ValueRange,
    pub early_ray_termination: bool,
    pub termination_threshold: f32,
    /// Stop before this ray parameter, opaque geometry is there
    pub t_limit: Option<f32>,
}

impl Default for MarchParams {
    fn default() -> Self {
        MarchParams {
            step_size: crate::placement::DEFAULT_STEP_SIZE,
            window: ValueRange::unit(),
            early_ray_termination: true,
            termination_threshold: super::DEFAULT_TERMINATION_THRESHOLD,
            t_limit: None,
        }
    }
}

/// Accumulated color is premultiplied by opacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayResult {
    pub color: Vector3<f32>,
    pub opacity: f32,
    /// Volume samples taken
    pub samples: usize,
    /// Sample positions inside empty space, never read
    pub skipped: usize,
    pub terminated_early: bool,
}

impl RayResult {
    pub fn transparent() -> RayResult {
        RayResult {
            color: Vector3::zeros(),
            opacity: 0.0,
            samples: 0,
            skipped: 0,
            terminated_early: false,
        }
    }

    pub fn as_rgba(&self) -> RGBA {
        color::new(self.color.x, self.color.y, self.color.z, self.opacity)
    }
}

/// Blend `sample` behind `accum`.
///
/// `accum` is premultiplied, `sample` is straight alpha in `<0;1>`.
#[inline]
pub fn composite(accum: &mut RGBA, sample: &RGBA) {
    let weight = (1.0 - accum.w) * sample.w;
    accum.x += weight * sample.x;
    accum.y += weight * sample.y;
    accum.z += weight * sample.z;
    accum.w += weight;
}

/// March `ray` (local coordinates) through the unit cube of `volume`.
pub fn march_ray<V, L>(
    ray: &Ray,
    volume: &V,
    table: &LookupTable,
    params: &MarchParams,
    planes: &[LocalPlane],
    lighting: &L,
) -> RayResult
where
    V: Volume + ?Sized,
    L: Lighting + ?Sized,
{
    if table.is_empty() {
        return RayResult::transparent();
    }

    let (t_near, t_far) = match BoundBox::unit().intersect(ray) {
        Some(range) => range,
        None => return RayResult::transparent(),
    };

    let t_start = t_near.max(0.0);
    let t_end = match params.t_limit {
        Some(limit) => t_far.min(limit),
        None => t_far,
    };

    let shade = lighting.needs_gradient();
    let mut accum = color::zero();
    let mut samples = 0;
    let mut skipped = 0;
    let mut terminated_early = false;

    let mut step = 0;
    loop {
        let t = t_start + step as f32 * params.step_size;
        if t > t_end {
            break;
        }
        step += 1;

        // The segment is inside the cube, keep rounding errors from leaving it
        let pos = ray.point_from_t(t).map(|v| v.clamp(0.0, 1.0));

        if planes.iter().any(|p| !p.keeps(&pos)) {
            continue;
        }
        if volume.skips_local(pos) {
            skipped += 1;
            continue;
        }

        let raw = volume.sample_local(pos);
        samples += 1;

        let mut sample = table.sample(params.window.normalize(raw));
        if sample.w <= 0.0 {
            continue;
        }
        if shade {
            sample = lighting.shade(sample, &volume.gradient_local(pos));
        }

        composite(&mut accum, &sample);

        if params.early_ray_termination && accum.w >= params.termination_threshold {
            terminated_early = true;
            break;
        }
    }

    RayResult {
        color: accum.xyz(),
        opacity: accum.w,
        samples,
        skipped,
        terminated_early,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use nalgebra::{point, vector};

    use super::*;
    use crate::{
        placement::{CuttingPlane, LocalFrame, PlaneSpace, Transform},
        render::PreparedLighting,
        test_helpers::{grayscale_tf, red_tf, uniform_volume},
        volumetric::VolumeTexture,
    };

    fn texture(value: u8) -> Arc<VolumeTexture> {
        uniform_volume(vector![2, 2, 2], value).get_gpu_handle()
    }

    fn through_center() -> Ray {
        Ray::new(point![0.5, 0.5, -1.0], vector![0.0, 0.0, 1.0])
    }

    #[test]
    fn miss_is_transparent() {
        let table = red_tf().build_lookup_texture(64).unwrap();
        let ray = Ray::new(point![2.0, 2.0, -1.0], vector![0.0, 0.0, 1.0]);
        let res = march_ray(
            &ray,
            &*texture(255),
            &table,
            &MarchParams::default(),
            &[],
            &PreparedLighting::unlit(),
        );
        assert_eq!(res.opacity, 0.0);
        assert_eq!(res.samples, 0);
    }

    #[test]
    fn behind_camera_is_transparent() {
        let table = red_tf().build_lookup_texture(64).unwrap();
        let ray = Ray::new(point![0.5, 0.5, 2.0], vector![0.0, 0.0, 1.0]);
        let res = march_ray(
            &ray,
            &*texture(255),
            &table,
            &MarchParams::default(),
            &[],
            &PreparedLighting::unlit(),
        );
        assert_eq!(res.opacity, 0.0);
    }

    #[test]
    fn opaque_terminates_early() {
        let table = red_tf().build_lookup_texture(256).unwrap();
        let params = MarchParams {
            step_size: 0.1,
            ..Default::default()
        };
        let res = march_ray(
            &through_center(),
            &*texture(255),
            &table,
            &params,
            &[],
            &PreparedLighting::unlit(),
        );

        assert!(res.terminated_early);
        assert!(res.samples < 10);
        assert!((res.color - vector![1.0, 0.0, 0.0]).norm() < 1e-3);
        assert!((res.opacity - 1.0).abs() < 1e-3);
    }

    #[test]
    fn no_termination_walks_whole_segment() {
        let table = red_tf().build_lookup_texture(256).unwrap();
        let params = MarchParams {
            step_size: 0.1,
            early_ray_termination: false,
            ..Default::default()
        };
        let res = march_ray(
            &through_center(),
            &*texture(255),
            &table,
            &params,
            &[],
            &PreparedLighting::unlit(),
        );
        assert!(!res.terminated_early);
        assert!(res.samples >= 10);
        assert!(res.opacity <= 1.0);
    }

    #[test]
    fn empty_table_is_transparent() {
        let table = crate::transfer_function::TransferFunction::new()
            .build_lookup_texture(16)
            .unwrap();
        let res = march_ray(
            &through_center(),
            &*texture(255),
            &table,
            &MarchParams::default(),
            &[],
            &PreparedLighting::unlit(),
        );
        assert_eq!(res, RayResult::transparent());
    }

    #[test]
    fn cutting_plane_removes_everything() {
        let table = red_tf().build_lookup_texture(64).unwrap();
        let frame = LocalFrame::new(&Transform::identity(), &vector![1.0, 1.0, 1.0]);
        // Keeps only x >= 2, outside the cube
        let plane = CuttingPlane::new(vector![1.0, 0.0, 0.0], 2.0, PlaneSpace::Local)
            .unwrap()
            .to_local(&frame);
        let res = march_ray(
            &through_center(),
            &*texture(255),
            &table,
            &MarchParams::default(),
            &[plane],
            &PreparedLighting::unlit(),
        );
        assert_eq!(res.opacity, 0.0);
        assert_eq!(res.samples, 0);
    }

    #[test]
    fn t_limit_stops_march() {
        let table = grayscale_tf().build_lookup_texture(64).unwrap();
        let params = MarchParams {
            step_size: 0.05,
            early_ray_termination: false,
            ..Default::default()
        };
        let full = march_ray(
            &through_center(),
            &*texture(128),
            &table,
            &params,
            &[],
            &PreparedLighting::unlit(),
        );
        let limited = march_ray(
            &through_center(),
            &*texture(128),
            &table,
            &MarchParams {
                t_limit: Some(1.5),
                ..params
            },
            &[],
            &PreparedLighting::unlit(),
        );
        assert!(limited.samples < full.samples);
        assert!(limited.opacity < full.opacity);
    }

    // Texture with every position marked as empty space
    struct Skipped(Arc<VolumeTexture>);

    impl Volume for Skipped {
        fn get_size(&self) -> Vector3<usize> {
            self.0.get_size()
        }

        fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
            self.0.get_data(x, y, z)
        }

        fn sample_at(&self, pos: nalgebra::Point3<f32>) -> f32 {
            self.0.sample_at(pos)
        }

        fn generation(&self) -> u64 {
            self.0.generation()
        }

        fn skips_local(&self, _pos: nalgebra::Point3<f32>) -> bool {
            true
        }
    }

    #[test]
    fn empty_space_is_not_sampled() {
        let table = red_tf().build_lookup_texture(64).unwrap();
        let params = MarchParams {
            step_size: 0.1,
            ..Default::default()
        };
        let res = march_ray(
            &through_center(),
            &Skipped(texture(255)),
            &table,
            &params,
            &[],
            &PreparedLighting::unlit(),
        );
        assert_eq!(res.samples, 0);
        assert!(res.skipped >= 10);
        assert_eq!(res.opacity, 0.0);
    }

    #[test]
    fn composite_accumulates() {
        let mut accum = color::zero();
        composite(&mut accum, &color::new(1.0, 0.0, 0.0, 0.5));
        composite(&mut accum, &color::new(0.0, 1.0, 0.0, 0.5));
        assert!((accum.w - 0.75).abs() < 1e-6);
        assert!((accum.x - 0.5).abs() < 1e-6);
        assert!((accum.y - 0.25).abs() < 1e-6);
    }
}
