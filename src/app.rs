//! Window creation and the frame loop.
//!
//! Startup runs the one-time setup sequence the first time the application
//! is resumed. Every `RedrawRequested` renders with the angle computed on
//! the previous iteration, then advances the animator and re-requests a
//! redraw, so an angle update becomes visible one frame after it is
//! computed. That ordering is part of the loop's contract; do not swap it.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::context::RenderContext;
use crate::mesh::{MeshBuffers, MeshData};
use crate::render::Renderer;
use crate::scene::SceneState;
use crate::shader::{ShaderPipeline, FRAGMENT_SHADER, VERTEX_SHADER};

const WINDOW_TITLE: &str = "Phong Spin";
const INITIAL_ANGLE_DEG: f32 = 180.0;
const MODEL_JSON: &str = include_str!("../assets/cube.json");

/// Opens the window and runs the frame loop until the window is closed.
///
/// Setup failures are returned to the caller rather than presented from
/// inside the loop; the binary decides how to report them.
pub fn run() -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    event_loop.run_app(&mut app).context("event loop failed")?;

    if let Some(err) = app.last_error.take() {
        return Err(err);
    }
    Ok(())
}

#[derive(Default)]
struct App {
    window: Option<Arc<Window>>,
    stage: Option<Stage>,
    last_error: Option<anyhow::Error>,
}

/// Everything the frame loop touches, created once at startup.
struct Stage {
    context: RenderContext,
    renderer: Renderer,
    mesh: Option<MeshBuffers>,
    scene: SceneState,
}

fn setup(window: Arc<Window>) -> Result<Stage> {
    let size = window.inner_size();
    let context = block_on(RenderContext::new(Arc::clone(&window), size))
        .context("could not acquire a rendering context")?;
    info!(
        "rendering context ready ({}x{}, {:?})",
        size.width,
        size.height,
        context.surface_format()
    );

    let pipeline = block_on(ShaderPipeline::build(&context, VERTEX_SHADER, FRAGMENT_SHADER))
        .context("could not initialise shaders")?;

    let data = MeshData::from_json(MODEL_JSON).context("embedded model is malformed")?;
    let mesh = MeshBuffers::upload(&context, &data).context("embedded model is malformed")?;
    info!("uploaded mesh with {} vertices", mesh.num_items());

    Ok(Stage {
        context,
        renderer: Renderer::new(pipeline),
        mesh: Some(mesh),
        scene: SceneState::new(INITIAL_ANGLE_DEG),
    })
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.last_error = Some(anyhow!(err).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        match setup(Arc::clone(&window)) {
            Ok(stage) => {
                window.request_redraw();
                self.window = Some(window);
                self.stage = Some(stage);
            }
            Err(err) => {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        let (Some(window), Some(stage)) = (self.window.as_ref(), self.stage.as_mut()) else {
            return;
        };

        match event {
            WindowEvent::Resized(size) => {
                stage.context.resize(size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                stage.context.resize(window.inner_size());
            }
            WindowEvent::RedrawRequested => {
                match stage
                    .renderer
                    .render(&stage.context, stage.mesh.as_ref(), &stage.scene)
                {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        stage.context.resize(window.inner_size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        self.last_error = Some(anyhow!("GPU is out of memory"));
                        event_loop.exit();
                        return;
                    }
                    Err(err) => {
                        error!("render error: {err}");
                    }
                }
                stage.scene.advance(Instant::now());
                window.request_redraw();
            }
            _ => {}
        }
    }
}
