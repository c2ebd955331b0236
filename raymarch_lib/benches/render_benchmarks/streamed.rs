use std::sync::Arc;

use crate::common::*;

pub fn render_streamed(c: &mut Criterion) {
    let options = RenderOptions::builder()
        .resolution(WIDTH, HEIGHT)
        .early_ray_termination(true)
        .build_unchecked();

    let volume = sphere_volume();
    let bricked = Arc::new(BrickedVolume::new(volume.clone(), 17).unwrap());
    bricked.load_all().unwrap();

    let mut placement = placement(volume);
    placement.set_streaming(Some(bricked)).unwrap();
    bench_frames(c, "streamed", options, &[placement]);
}
