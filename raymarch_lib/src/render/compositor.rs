use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use nalgebra::{vector, Vector3, Vector4};

use crate::{
    common::{PixelBox, ValueRange},
    placement::{LocalFrame, LocalPlane, PlacementId, VolumePlacement},
    transfer_function::LookupTable,
    volumetric::PassVolume,
    PerspectiveCamera,
};

use super::{
    kernel::{march_ray, MarchParams},
    FrameBuffer, PreparedLighting, RenderOptions,
};

/// Entries of the transfer function table used by passes
pub const LOOKUP_RESOLUTION: usize = 256;

/// Counters of one rendered frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: usize,
    pub rays: usize,
    pub samples: usize,
    pub early_terminations: usize,
    /// Passes whose volume changed while they ran; they finished on their snapshot
    pub stale_passes: usize,
    /// Passes that sampled a partially resident volume
    pub incomplete_passes: usize,
    /// Bricks over all passes the transfer function maps to nothing
    pub empty_bricks: usize,
    /// Sample positions stepped over inside empty bricks
    pub skipped_samples: usize,
}

impl FrameStats {
    fn add(&mut self, other: &FrameStats) {
        self.rays += other.rays;
        self.samples += other.samples;
        self.skipped_samples += other.skipped_samples;
        self.early_terminations += other.early_terminations;
    }
}

/// Premultiplied color and opacity over the screen footprint of one pass
pub struct PassBuffer {
    pub pixels: PixelBox,
    pub colors: Vec<Vector3<f32>>,
    pub opacities: Vec<f32>,
}

impl PassBuffer {
    pub fn new(pixels: PixelBox) -> PassBuffer {
        let size = pixels.items();
        PassBuffer {
            pixels,
            colors: vec![Vector3::zeros(); size],
            opacities: vec![0.0; size],
        }
    }
}

// Everything a pass reads, captured at submission
struct Pass {
    id: PlacementId,
    distance: f32,
    source_generation: u64,
    volume: PassVolume,
    empty_bricks: usize,
    frame: LocalFrame,
    table: Arc<LookupTable>,
    march: MarchParams,
    planes: Vec<LocalPlane>,
    lighting: PreparedLighting,
    pixels: PixelBox,
}

// One row of one pass
struct RowJob<'a> {
    pass: &'a Pass,
    y: usize,
    colors: &'a mut [Vector3<f32>],
    opacities: &'a mut [f32],
}

/// Renders visible placements and blends them over a frame.
///
/// Every visible placement becomes a pass over the projection of its bounding
/// box. Passes are rendered in parallel and merged front to back, nearest first.
pub struct Compositor {
    options: RenderOptions,
}

impl Compositor {
    pub fn new(options: RenderOptions) -> Compositor {
        Compositor { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    /// Render all visible placements over `frame`.
    ///
    /// Rays are spread over the camera's image plane, so its aspect ratio
    /// should match the frame resolution.
    pub fn render(
        &self,
        placements: &[VolumePlacement],
        camera: &PerspectiveCamera,
        frame: &mut FrameBuffer,
    ) -> FrameStats {
        let never = AtomicBool::new(false);
        // Only cancellation makes the frame incomplete
        self.render_cancellable(placements, camera, frame, &never)
            .unwrap_or_default()
    }

    /// Render unless `cancel` is raised; a cancelled frame leaves `frame` untouched
    pub fn render_cancellable(
        &self,
        placements: &[VolumePlacement],
        camera: &PerspectiveCamera,
        frame: &mut FrameBuffer,
        cancel: &AtomicBool,
    ) -> Option<FrameStats> {
        let passes = self.submit_all(placements, camera, frame.resolution());
        self.render_submitted(&passes, placements, camera, frame, cancel)
    }

    // Passes of visible placements, nearest first
    fn submit_all(
        &self,
        placements: &[VolumePlacement],
        camera: &PerspectiveCamera,
        resolution: (usize, usize),
    ) -> Vec<Pass> {
        let mut passes: Vec<Pass> = placements
            .iter()
            .filter(|p| p.is_visible())
            .filter_map(|p| self.submit(p, camera, resolution))
            .collect();

        // Nearest first, placement id decides ties
        passes.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        passes
    }

    fn render_submitted(
        &self,
        passes: &[Pass],
        placements: &[VolumePlacement],
        camera: &PerspectiveCamera,
        frame: &mut FrameBuffer,
        cancel: &AtomicBool,
    ) -> Option<FrameStats> {
        let mut stats = FrameStats {
            passes: passes.len(),
            incomplete_passes: passes
                .iter()
                .filter(|p| matches!(p.volume.residency(), Some(r) if !r.is_complete()))
                .count(),
            empty_bricks: passes.iter().map(|p| p.empty_bricks).sum(),
            ..Default::default()
        };

        let mut buffers: Vec<PassBuffer> = passes
            .iter()
            .map(|p| PassBuffer::new(p.pixels.clone()))
            .collect();

        let worker_stats = self.run_passes(passes, &mut buffers, camera, frame, cancel)?;
        stats.add(&worker_stats);

        for (pass, placement) in passes.iter().filter_map(|pass| {
            placements
                .iter()
                .find(|p| p.id() == pass.id)
                .map(|p| (pass, p))
        }) {
            if placement.volume().generation() != pass.source_generation {
                log::debug!("Pass {:?} finished on an outdated volume", pass.id);
                stats.stale_passes += 1;
            }
        }

        merge_into(frame, &buffers);

        log::debug!("Frame done: {stats:?}");
        Some(stats)
    }

    fn submit(
        &self,
        placement: &VolumePlacement,
        camera: &PerspectiveCamera,
        resolution: (usize, usize),
    ) -> Option<Pass> {
        let table = match placement
            .transfer_function()
            .build_lookup_texture(LOOKUP_RESOLUTION)
        {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Skipping placement {:?}: {e}", placement.id());
                return None;
            }
        };

        // Generation and extent come from the captured data, a reload cannot split them
        let mut volume = placement.pass_volume();
        let source_generation = volume.source_generation();
        let frame = LocalFrame::new(placement.transform(), &volume.world_extent());

        let pixels = camera
            .project_box(frame.world_bound_box())
            .get_pixel_range(resolution);
        if pixels.is_empty() {
            return None;
        }

        if let Some(residency) = volume.residency() {
            if !residency.is_complete() {
                log::warn!(
                    "Placement {:?} rendered with {}/{} bricks",
                    placement.id(),
                    residency.resident,
                    residency.total
                );
            }
        }

        let params = placement.params();
        let empty_bricks = if self.options.empty_space_skipping {
            let window = params.window();
            volume.mark_empty_space(|range| {
                table.is_transparent_over(ValueRange::new(
                    window.normalize(range.low),
                    window.normalize(range.high),
                ))
            })
        } else {
            0
        };

        let planes = params
            .cutting_planes()
            .iter()
            .map(|plane| plane.to_local(&frame))
            .collect();

        Some(Pass {
            id: placement.id(),
            distance: camera.point_distance(&frame.center_world()),
            source_generation,
            volume,
            empty_bricks,
            frame,
            table,
            march: MarchParams {
                step_size: params.step_size(),
                window: params.window(),
                early_ray_termination: self.options.early_ray_termination,
                termination_threshold: self.options.termination_threshold,
                t_limit: None,
            },
            planes,
            lighting: params.lighting().prepare(&frame),
            pixels,
        })
    }

    fn run_passes(
        &self,
        passes: &[Pass],
        buffers: &mut [PassBuffer],
        camera: &PerspectiveCamera,
        frame: &FrameBuffer,
        cancel: &AtomicBool,
    ) -> Option<FrameStats> {
        let (job_sender, job_receiver) = crossbeam::channel::unbounded();
        for (pass, buffer) in passes.iter().zip(buffers.iter_mut()) {
            let width = buffer.pixels.width();
            let rows = buffer
                .colors
                .chunks_mut(width)
                .zip(buffer.opacities.chunks_mut(width));
            for ((colors, opacities), y) in rows.zip(pass.pixels.y.clone()) {
                let job = RowJob {
                    pass,
                    y,
                    colors,
                    opacities,
                };
                // Receiver is alive in this scope
                let _ = job_sender.send(job);
            }
        }
        drop(job_sender);

        let workers = self.options.workers.max(1);
        let resolution = frame.resolution();

        let result = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let jobs = job_receiver.clone();
                    s.spawn(move |_| {
                        let mut stats = FrameStats::default();
                        while let Ok(job) = jobs.recv() {
                            if cancel.load(Ordering::Relaxed) {
                                return None;
                            }
                            render_row(job, camera, frame, resolution, &mut stats);
                        }
                        Some(stats)
                    })
                })
                .collect();

            let mut total = FrameStats::default();
            let mut complete = true;
            for handle in handles {
                match handle.join() {
                    Ok(Some(stats)) => total.add(&stats),
                    Ok(None) => complete = false,
                    Err(_) => {
                        log::error!("Render worker panicked");
                        complete = false;
                    }
                }
            }
            complete.then_some(total)
        });

        let stats = result.ok().flatten();
        if stats.is_none() || cancel.load(Ordering::Relaxed) {
            log::debug!("Frame cancelled");
            return None;
        }
        stats
    }
}

fn render_row(
    job: RowJob,
    camera: &PerspectiveCamera,
    frame: &FrameBuffer,
    resolution: (usize, usize),
    stats: &mut FrameStats,
) {
    let pass = job.pass;
    let y = job.y;
    for (i, x) in pass.pixels.x.clone().enumerate() {
        let ray = camera.get_pixel_ray(x, y, resolution);
        let (local_ray, scale) = pass.frame.ray_to_local(&ray);

        let depth = frame.depth_at(x, y);
        let march = MarchParams {
            t_limit: depth.is_finite().then(|| depth * scale),
            ..pass.march
        };

        let result = march_ray(
            &local_ray,
            &pass.volume,
            &pass.table,
            &march,
            &pass.planes,
            &pass.lighting,
        );

        job.colors[i] = result.color;
        job.opacities[i] = result.opacity;
        stats.rays += 1;
        stats.samples += result.samples;
        stats.skipped_samples += result.skipped;
        if result.terminated_early {
            stats.early_terminations += 1;
        }
    }
}

/// Front to back merge of sorted pass buffers, then blend over the frame
fn merge_into(frame: &mut FrameBuffer, buffers: &[PassBuffer]) {
    let (width, height) = frame.resolution();
    let mut merged: Vec<Vector4<f32>> = vec![Vector4::zeros(); width * height];

    for buffer in buffers {
        let pixels = &buffer.pixels;
        for (row, y) in pixels.y.clone().enumerate() {
            for (col, x) in pixels.x.clone().enumerate() {
                let src = row * pixels.width() + col;
                let dst = &mut merged[y * width + x];
                let weight = 1.0 - dst.w;
                let color = buffer.colors[src];
                *dst += vector![color.x, color.y, color.z, buffer.opacities[src]] * weight;
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            let m = merged[y * width + x];
            let existing = frame.pixel_mut(x, y);
            *existing = m.xyz() + *existing * (1.0 - m.w);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use nalgebra::{point, vector};

    use super::*;
    use crate::{
        placement::Transform,
        test_helpers::{opaque_tf, uniform_volume},
    };

    fn options() -> RenderOptions {
        RenderOptions::builder()
            .resolution(16, 16)
            .workers(3)
            .build()
            .unwrap()
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::looking_at(point![0.5, 0.5, 5.0], point![0.5, 0.5, 0.5])
    }

    #[test]
    fn merge_blends_over_background() {
        let mut frame = FrameBuffer::with_background(1, 1, vector![0.0, 0.0, 1.0]);
        let mut buffer = PassBuffer::new(PixelBox::new(0..1, 0..1));
        buffer.colors[0] = vector![0.5, 0.0, 0.0];
        buffer.opacities[0] = 0.5;

        merge_into(&mut frame, &[buffer]);
        assert!((frame.pixel(0, 0) - vector![0.5, 0.0, 0.5]).norm() < 1e-6);
    }

    #[test]
    fn empty_scene_keeps_frame() {
        let compositor = Compositor::new(options());
        let mut frame = FrameBuffer::with_background(16, 16, vector![0.2, 0.2, 0.2]);
        let before = frame.clone();
        let stats = compositor.render(&[], &camera(), &mut frame);

        assert_eq!(stats.passes, 0);
        assert_eq!(frame, before);
    }

    #[test]
    fn hidden_placement_is_skipped() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let mut placement =
            VolumePlacement::new(PlacementId(0), volume, opaque_tf(vector![1.0, 1.0, 1.0]));
        placement.set_visible(false);

        let mut frame = FrameBuffer::new(16, 16);
        let stats = Compositor::new(options()).render(&[placement], &camera(), &mut frame);
        assert_eq!(stats.passes, 0);
    }

    #[test]
    fn cancelled_frame_is_untouched() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement =
            VolumePlacement::new(PlacementId(0), volume, opaque_tf(vector![1.0, 1.0, 1.0]));

        let mut frame = FrameBuffer::new(16, 16);
        let cancel = AtomicBool::new(true);
        let res = Compositor::new(options()).render_cancellable(
            &[placement],
            &camera(),
            &mut frame,
            &cancel,
        );

        assert!(res.is_none());
        assert_eq!(frame, FrameBuffer::new(16, 16));
    }

    #[test]
    fn depth_hides_volume_behind_geometry() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement =
            VolumePlacement::new(PlacementId(0), volume, opaque_tf(vector![1.0, 1.0, 1.0]));
        let compositor = Compositor::new(options());

        let mut open = FrameBuffer::new(16, 16);
        compositor.render(std::slice::from_ref(&placement), &camera(), &mut open);
        assert!(open.pixel(8, 8).x > 0.9);

        // Opaque surface one unit in front of the camera
        let mut blocked = FrameBuffer::new(16, 16);
        assert!(blocked.set_depth(vec![1.0; 16 * 16]));
        compositor.render(&[placement], &camera(), &mut blocked);
        assert_eq!(blocked.pixel(8, 8), Vector3::zeros());
    }

    #[test]
    fn stats_count_rays() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement =
            VolumePlacement::new(PlacementId(0), volume, opaque_tf(vector![1.0, 1.0, 1.0]))
                .with_transform(Transform::identity());

        let mut frame = FrameBuffer::new(16, 16);
        let stats = Compositor::new(options()).render(&[placement], &camera(), &mut frame);
        assert_eq!(stats.passes, 1);
        assert!(stats.rays > 0);
        assert!(stats.early_terminations > 0);
        assert_eq!(stats.stale_passes, 0);
    }

    #[test]
    fn reload_during_frame_marks_pass_stale() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement = VolumePlacement::new(
            PlacementId(0),
            volume.clone(),
            opaque_tf(vector![1.0, 1.0, 1.0]),
        );
        let placements = [placement];
        let compositor = Compositor::new(options());
        let camera = camera();
        let mut frame = FrameBuffer::new(16, 16);

        let passes = compositor.submit_all(&placements, &camera, frame.resolution());
        assert_eq!(passes.len(), 1);

        // Empty data arrives after submission
        volume
            .reload(
                vec![0; 8],
                vector![2, 2, 2],
                vector![1.0, 1.0, 1.0],
                crate::volumetric::ScalarEncoding::u8(),
            )
            .unwrap();

        let never = AtomicBool::new(false);
        let stats = compositor
            .render_submitted(&passes, &placements, &camera, &mut frame, &never)
            .unwrap();
        assert_eq!(stats.stale_passes, 1);
        // The pass finished on the data it captured
        assert!(frame.pixel(8, 8).x > 0.9);

        let mut next = FrameBuffer::new(16, 16);
        let stats = compositor.render(&placements, &camera, &mut next);
        assert_eq!(stats.stale_passes, 0);
        assert_eq!(next.pixel(8, 8), Vector3::zeros());
    }

    #[test]
    fn pass_frame_matches_captured_volume() {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement =
            VolumePlacement::new(PlacementId(0), volume.clone(), opaque_tf(vector![1.0, 1.0, 1.0]));
        let compositor = Compositor::new(options());

        let passes = compositor.submit_all(
            std::slice::from_ref(&placement),
            &camera(),
            (16, 16),
        );
        volume
            .reload(
                vec![255; 64],
                vector![4, 4, 4],
                vector![3.0, 3.0, 3.0],
                crate::volumetric::ScalarEncoding::u8(),
            )
            .unwrap();

        let pass = &passes[0];
        assert_eq!(pass.source_generation, pass.volume.source_generation());
        assert!(pass.source_generation < volume.generation());
        // Extent of the 2x2x2 grid, not the reloaded one
        let corner = pass.frame.local_to_world(&point![1.0, 1.0, 1.0]);
        assert!((corner - point![2.0, 2.0, 2.0]).norm() < 1e-5);
    }

    #[test]
    fn streamed_empty_bricks_are_skipped() {
        // Filled only for x < 4
        let mut raw = vec![0u8; 16 * 16 * 16];
        for (i, v) in raw.iter_mut().enumerate() {
            if i % 16 < 4 {
                *v = 255;
            }
        }
        let volume = Arc::new(
            crate::volumetric::VolumeResource::load(
                raw,
                vector![16, 16, 16],
                vector![1.0, 1.0, 1.0],
                crate::volumetric::ScalarEncoding::u8(),
            )
            .unwrap(),
        );
        let bricked = Arc::new(crate::volumetric::BrickedVolume::new(volume.clone(), 4).unwrap());
        bricked.load_all().unwrap();

        let mut placement = VolumePlacement::new(
            PlacementId(0),
            volume,
            crate::test_helpers::grayscale_tf(),
        )
        .with_transform(
            Transform::new(
                Vector3::zeros(),
                nalgebra::UnitQuaternion::identity(),
                Vector3::repeat(1.0 / 16.0),
            )
            .unwrap(),
        );
        placement.set_streaming(Some(bricked)).unwrap();
        let placements = [placement];

        let mut skipping = FrameBuffer::new(16, 16);
        let stats = Compositor::new(options()).render(&placements, &camera(), &mut skipping);
        assert!(stats.empty_bricks > 0);
        assert!(stats.skipped_samples > 0);

        let plain_options = RenderOptions {
            empty_space_skipping: false,
            ..options()
        };
        let mut plain = FrameBuffer::new(16, 16);
        let plain_stats = Compositor::new(plain_options).render(&placements, &camera(), &mut plain);
        assert_eq!(plain_stats.skipped_samples, 0);
        assert_eq!(plain_stats.empty_bricks, 0);
        assert!(plain_stats.samples > stats.samples);

        for (a, b) in skipping.as_slice().iter().zip(plain.as_slice()) {
            assert!((a - b).norm() < 1e-5);
        }
    }
}
