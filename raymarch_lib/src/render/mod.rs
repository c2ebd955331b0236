mod compositor;
mod frame_buffer;
pub mod kernel;
mod lighting;
mod render_front;
mod render_options;

pub use compositor::{Compositor, FrameStats, PassBuffer, LOOKUP_RESOLUTION};
pub use frame_buffer::FrameBuffer;
pub use kernel::{composite, march_ray, MarchParams, RayResult};
pub use lighting::{DirectionalLight, Lighting, LightingMode, PreparedLighting};
pub use render_front::{RendererFront, RendererMessage, SharedScene};
pub use render_options::{RenderOptions, RenderOptionsBuilder, DEFAULT_TERMINATION_THRESHOLD};
