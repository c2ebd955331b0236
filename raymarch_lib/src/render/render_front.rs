use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam::channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::{placement::VolumePlacement, PerspectiveCamera, Result};

use super::{Compositor, FrameBuffer, FrameStats};

/// Messages to renderer
///
/// Queued `StartRendering` messages are coalesced into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererMessage {
    /// Render a frame, superseding the one in flight
    StartRendering,
    /// Shut down, thread will get ready to be joined
    ShutDown,
}

/// Scene shared with the render thread
pub type SharedScene = Arc<RwLock<Vec<VolumePlacement>>>;

/// Communicating with a render thread
///
/// Can be active or inactive. Scene and camera are read at the start of
/// every frame, the finished frame is swapped into the shared buffer.
pub struct RendererFront {
    handle: Option<JoinHandle<()>>,
    buffer: Option<Arc<Mutex<FrameBuffer>>>,
    camera: Option<Arc<RwLock<PerspectiveCamera>>>,
    scene: Option<SharedScene>,
    cancel: Arc<AtomicBool>,
    communication_in: (Sender<RendererMessage>, Receiver<RendererMessage>),
    communication_out: (Sender<FrameStats>, Receiver<FrameStats>),
}

impl RendererFront {
    /// Create inactive front
    pub fn new() -> Self {
        Self {
            handle: None,
            buffer: None,
            camera: None,
            scene: None,
            cancel: Arc::new(AtomicBool::new(false)),
            communication_in: crossbeam::channel::unbounded(), // main -> renderer
            communication_out: crossbeam::channel::unbounded(), // renderer -> main
        }
    }

    /// Spawn render thread, it waits for messages and does _not_ start rendering.
    ///
    /// The camera aspect ratio is set to match the compositor resolution.
    /// If front was already active, previous renderer gets shut down first.
    pub fn start_rendering(
        &mut self,
        compositor: Compositor,
        scene: SharedScene,
        camera: Arc<RwLock<PerspectiveCamera>>,
    ) -> Result<()> {
        self.finish();

        let (width, height) = compositor.options().resolution;
        let background = compositor.options().background;
        let buffer = Arc::new(Mutex::new(FrameBuffer::with_background(
            width, height, background,
        )));
        camera.write().change_aspect_from_resolution(width, height);

        let thread = RenderThread {
            compositor,
            scene: scene.clone(),
            camera: camera.clone(),
            buffer: buffer.clone(),
            cancel: self.cancel.clone(),
            messages: self.communication_in.1.clone(),
            frames: self.communication_out.0.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("raymarch-render".into())
            .spawn(move || thread.run())?;

        log::info!("Render thread started, {width}x{height}");
        self.handle = Some(handle);
        self.buffer = Some(buffer);
        self.camera = Some(camera);
        self.scene = Some(scene);
        Ok(())
    }

    /// Send message to renderer, `false` if no renderer listens
    pub fn send_message(&self, msg: RendererMessage) -> bool {
        if self.handle.is_none() {
            return false;
        }
        // Frame in flight is dropped as a whole
        self.cancel.store(true, Ordering::Release);
        self.communication_in.0.send(msg).is_ok()
    }

    /// Getter for sender
    ///
    /// Messages sent this way do not cancel the frame in flight.
    pub fn get_sender(&self) -> Sender<RendererMessage> {
        self.communication_in.0.clone()
    }

    /// Getter for receiver of finished frame notifications
    pub fn get_receiver(&self) -> Receiver<FrameStats> {
        self.communication_out.1.clone()
    }

    /// Wait for the next finished frame
    pub fn receive_message(&self) -> Option<FrameStats> {
        self.communication_out.1.recv().ok()
    }

    /// If front is inactive, return `None`
    pub fn get_buffer_handle(&self) -> Option<Arc<Mutex<FrameBuffer>>> {
        self.buffer.clone()
    }

    pub fn get_camera_handle(&self) -> Option<Arc<RwLock<PerspectiveCamera>>> {
        self.camera.clone()
    }

    pub fn get_scene_handle(&self) -> Option<SharedScene> {
        self.scene.clone()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Shut the render thread down and join it.
    /// Front goes into inactive state.
    pub fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.store(true, Ordering::Release);
            let _ = self.communication_in.0.send(RendererMessage::ShutDown);
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
            // Leftover messages were meant for the old thread
            while self.communication_in.1.try_recv().is_ok() {}
            log::info!("Render thread shut down");
        }
        self.buffer = None;
        self.camera = None;
        self.scene = None;
    }
}

impl Default for RendererFront {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RendererFront {
    fn drop(&mut self) {
        self.finish();
    }
}

struct RenderThread {
    compositor: Compositor,
    scene: SharedScene,
    camera: Arc<RwLock<PerspectiveCamera>>,
    buffer: Arc<Mutex<FrameBuffer>>,
    cancel: Arc<AtomicBool>,
    messages: Receiver<RendererMessage>,
    frames: Sender<FrameStats>,
}

impl RenderThread {
    fn run(self) {
        let (width, height) = self.compositor.options().resolution;
        let background = self.compositor.options().background;
        let mut frame = FrameBuffer::with_background(width, height, background);

        while let Ok(mut msg) = self.messages.recv() {
            // Coalesce queued requests
            while let Ok(next) = self.messages.try_recv() {
                if msg != RendererMessage::ShutDown {
                    msg = next;
                }
            }
            if msg == RendererMessage::ShutDown {
                break;
            }
            self.cancel.store(false, Ordering::Release);

            // Camera may have been replaced with one of a different aspect
            let mut camera = self.camera.read().clone();
            camera.change_aspect_from_resolution(width, height);
            frame.clear(background);
            let stats = {
                let scene = self.scene.read();
                self.compositor
                    .render_cancellable(&scene[..], &camera, &mut frame, &self.cancel)
            };

            match stats {
                Some(stats) => {
                    std::mem::swap(&mut *self.buffer.lock(), &mut frame);
                    if self.frames.send(stats).is_err() {
                        break;
                    }
                }
                None => log::debug!("Frame superseded"),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use nalgebra::{point, vector};

    use super::*;
    use crate::{
        placement::PlacementId,
        render::RenderOptions,
        test_helpers::{opaque_tf, uniform_volume},
    };

    fn scene() -> SharedScene {
        let volume = Arc::new(uniform_volume(vector![2, 2, 2], 255));
        let placement =
            VolumePlacement::new(PlacementId(0), volume, opaque_tf(vector![0.0, 1.0, 0.0]));
        Arc::new(RwLock::new(vec![placement]))
    }

    #[test]
    fn renders_frame_on_request() {
        let options = RenderOptions::builder()
            .resolution(8, 8)
            .workers(2)
            .build()
            .unwrap();
        let camera = Arc::new(RwLock::new(PerspectiveCamera::looking_at(
            point![1.0, 1.0, 6.0],
            point![1.0, 1.0, 1.0],
        )));

        let mut front = RendererFront::new();
        assert!(!front.send_message(RendererMessage::StartRendering));

        front
            .start_rendering(Compositor::new(options), scene(), camera)
            .unwrap();
        assert!(front.send_message(RendererMessage::StartRendering));

        let stats = front
            .get_receiver()
            .recv_timeout(Duration::from_secs(10))
            .unwrap();
        assert_eq!(stats.passes, 1);

        let buffer = front.get_buffer_handle().unwrap();
        let center = buffer.lock().pixel(4, 4);
        assert!(center.y > 0.9);

        front.finish();
        assert!(!front.is_active());
        assert!(front.get_buffer_handle().is_none());
    }

    #[test]
    fn camera_follows_frame_aspect() {
        let options = RenderOptions::builder()
            .resolution(16, 8)
            .workers(2)
            .build()
            .unwrap();
        let camera = Arc::new(RwLock::new(PerspectiveCamera::looking_at(
            point![1.0, 1.0, 6.0],
            point![1.0, 1.0, 1.0],
        )));

        let mut front = RendererFront::new();
        front
            .start_rendering(Compositor::new(options), scene(), camera.clone())
            .unwrap();
        assert!((camera.read().aspect() - 2.0).abs() < 1e-6);

        // A square camera swapped in later is still rendered at 2:1
        *camera.write() = PerspectiveCamera::looking_at(point![1.0, 1.0, 6.0], point![1.0, 1.0, 1.0]);
        assert!(front.send_message(RendererMessage::StartRendering));
        front
            .get_receiver()
            .recv_timeout(Duration::from_secs(10))
            .unwrap();

        let buffer = front.get_buffer_handle().unwrap();
        let frame = buffer.lock();
        // The volume is centered, wider than tall on screen
        let covered_x = (0..16).filter(|&x| frame.pixel(x, 4).y > 0.5).count();
        let covered_y = (0..8).filter(|&y| frame.pixel(8, y).y > 0.5).count();
        assert!(covered_x > 0);
        assert!(covered_x <= covered_y + 1);
        drop(frame);
        front.finish();
    }
}
