use std::sync::Arc;

pub use criterion::Criterion;
pub use nalgebra::{point, vector, Point3, Vector3};
pub use raymarch_lib::{
    placement::{PlacementId, VolumePlacement},
    premade::transfer_functions::ct_soft_tissue,
    render::{Compositor, FrameBuffer, RenderOptions},
    volumetric::{BrickedVolume, ScalarEncoding, VolumeResource},
    PerspectiveCamera,
};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 256;
pub const SIDE: usize = 64;

pub const DEFAULT_CAMERA_POSITIONS: [Point3<f32>; 3] = [
    point![32.0, 32.0, 200.0],
    point![150.0, 140.0, 150.0],
    point![-60.0, 32.0, -40.0],
];

/// Soft sphere of radius `SIDE / 2`, denser towards the center
pub fn sphere_volume() -> Arc<VolumeResource> {
    let half = SIDE as f32 / 2.0;
    let mut data = Vec::with_capacity(SIDE * SIDE * SIDE);
    for z in 0..SIDE {
        for y in 0..SIDE {
            for x in 0..SIDE {
                let d = vector![x as f32 - half, y as f32 - half, z as f32 - half].norm() / half;
                data.push(((1.0 - d).max(0.0) * 255.0) as u8);
            }
        }
    }
    let volume = VolumeResource::load(
        data,
        vector![SIDE, SIDE, SIDE],
        vector![1.0, 1.0, 1.0],
        ScalarEncoding::u8(),
    )
    .unwrap();
    Arc::new(volume)
}

pub fn placement(volume: Arc<VolumeResource>) -> VolumePlacement {
    VolumePlacement::new(PlacementId(0), volume, ct_soft_tissue())
}

pub fn bench_frames(
    c: &mut Criterion,
    name: &str,
    options: RenderOptions,
    placements: &[VolumePlacement],
) {
    let compositor = Compositor::new(options);
    let center = point![32.0, 32.0, 32.0];

    c.bench_function(name, |b| {
        b.iter(|| {
            for position in DEFAULT_CAMERA_POSITIONS {
                let camera = PerspectiveCamera::looking_at(position, center);
                let mut frame = FrameBuffer::new(WIDTH, HEIGHT);
                compositor.render(placements, &camera, &mut frame);
            }
        })
    });
}
