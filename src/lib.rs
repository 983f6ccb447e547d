//! A minimal real-time rendering demo built on wgpu.
//!
//! The crate wires the one-time setup calls (context acquisition, shader
//! pipeline construction, mesh upload) into a winit-driven frame loop that
//! redraws a single spinning mesh under two point lights.  Everything the
//! loop touches is an explicit value created at startup and threaded by
//! reference; there is no global state, which keeps the setup sequence and
//! the per-frame mutation boundary testable in isolation.

pub mod app;
pub mod context;
pub mod frame;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod shader;

pub use app::run;
pub use context::{ContextError, RenderContext};
pub use frame::{model_view_matrix, projection_matrix, FrameUniforms};
pub use mesh::{MeshBuffers, MeshData, MeshError};
pub use render::{FrameOutcome, Renderer};
pub use scene::SceneState;
pub use shader::{
    ShaderError, ShaderInterface, ShaderPipeline, ATTR_FRONT_COLOR, ATTR_NORMAL, ATTR_POSITION,
    FRAGMENT_SHADER, UNIFORM_NAMES, VERTEX_SHADER,
};
