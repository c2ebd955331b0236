use crate::common::*;

pub fn render_dense(c: &mut Criterion) {
    let options = RenderOptions::builder()
        .resolution(WIDTH, HEIGHT)
        .early_ray_termination(false)
        .build_unchecked();

    let placements = [placement(sphere_volume())];
    bench_frames(c, "dense", options, &placements);
}

pub fn render_dense_ert(c: &mut Criterion) {
    let options = RenderOptions::builder()
        .resolution(WIDTH, HEIGHT)
        .early_ray_termination(true)
        .build_unchecked();

    let placements = [placement(sphere_volume())];
    bench_frames(c, "dense ert", options, &placements);
}

pub fn render_dense_single_worker(c: &mut Criterion) {
    let options = RenderOptions::builder()
        .resolution(WIDTH, HEIGHT)
        .early_ray_termination(true)
        .workers(1)
        .build_unchecked();

    let placements = [placement(sphere_volume())];
    bench_frames(c, "dense single worker", options, &placements);
}
