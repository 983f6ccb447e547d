//! Per-frame rendering.

use crate::context::RenderContext;
use crate::frame::FrameUniforms;
use crate::mesh::MeshBuffers;
use crate::scene::SceneState;
use crate::shader::ShaderPipeline;

/// What a frame ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// One draw call was issued over this many vertices.
    Drawn { vertices: u32 },
    /// The target was cleared but no draw call was issued.
    Skipped,
}

/// Draws one frame: clear, upload uniforms, bind the mesh, one draw call.
pub struct Renderer {
    pipeline: ShaderPipeline,
}

impl Renderer {
    pub fn new(pipeline: ShaderPipeline) -> Self {
        Self { pipeline }
    }

    /// Renders a single frame.
    ///
    /// When the mesh is absent the frame is skipped entirely: the target is
    /// still cleared, but nothing is drawn and no uniforms are written. A
    /// missing mesh is not an error on the steady-state path; the loop
    /// keeps running and picks the mesh up once it exists.
    pub fn render(
        &self,
        ctx: &RenderContext,
        mesh: Option<&MeshBuffers>,
        scene: &SceneState,
    ) -> Result<FrameOutcome, wgpu::SurfaceError> {
        let output = ctx.surface().get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let outcome = {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: ctx.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            match mesh {
                Some(mesh) => {
                    let uniforms = FrameUniforms::compose(ctx.aspect_ratio(), scene.angle_deg());
                    ctx.queue.write_buffer(
                        &self.pipeline.uniform_buffer,
                        0,
                        bytemuck::bytes_of(&uniforms),
                    );

                    pass.set_pipeline(&self.pipeline.pipeline);
                    pass.set_bind_group(0, &self.pipeline.bind_group, &[]);
                    pass.set_vertex_buffer(0, mesh.positions.slice(..));
                    pass.set_vertex_buffer(1, mesh.normals.slice(..));
                    pass.set_vertex_buffer(2, mesh.front_colors.slice(..));
                    pass.draw(0..mesh.num_items(), 0..1);
                    FrameOutcome::Drawn {
                        vertices: mesh.num_items(),
                    }
                }
                None => FrameOutcome::Skipped,
            }
        };

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(outcome)
    }
}
