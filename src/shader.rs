//! Shading pipeline construction.
//!
//! The two WGSL stages are compiled inside validation error scopes so the
//! backend diagnostic text can be surfaced, then linked into a render
//! pipeline. Before the pipeline is built, the shader interface is resolved
//! by name from the vertex stage source: attribute names map to `@location`
//! slots and uniform names map to byte offsets inside the frame uniform
//! block. Every slot the frame renderer uses must resolve here, or startup
//! fails; a missing name is a distinct failure kind from a link error,
//! though both read as shader-initialisation failures to the user.

use std::collections::HashMap;
use std::mem;
use std::num::NonZeroU64;

use thiserror::Error;

use crate::context::{RenderContext, DEPTH_FORMAT};
use crate::frame::FrameUniforms;

pub const VERTEX_SHADER: &str = include_str!("shaders/phong.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("shaders/phong.frag.wgsl");

/// Attribute names the mesh buffers bind to.
pub const ATTR_POSITION: &str = "aVertexPosition";
pub const ATTR_NORMAL: &str = "aVertexNormal";
pub const ATTR_FRONT_COLOR: &str = "aFrontColor";

/// Uniform names the frame renderer writes every frame.
pub const UNIFORM_NAMES: [&str; 10] = [
    "uPMatrix",
    "uMVMatrix",
    "u_pointLightPos1",
    "u_lightColor1",
    "u_pointLightPos2",
    "u_lightColor2",
    "u_ambient",
    "u_diffuse",
    "u_specular",
    "u_shiningness",
];

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile: {message}")]
    Compile {
        stage: &'static str,
        message: String,
    },
    #[error("could not initialise shaders: {0}")]
    Link(String),
    #[error("could not initialise shaders: {0}")]
    Interface(String),
    #[error("could not initialise shaders: vertex input `{0}` is not declared")]
    MissingAttribute(String),
    #[error("could not initialise shaders: uniform `{0}` is not declared")]
    MissingUniform(String),
    #[error(
        "could not initialise shaders: uniform block is {shader} bytes \
         in WGSL but {host} bytes on the host"
    )]
    LayoutMismatch { shader: u32, host: u32 },
}

/// Shader interface resolved from the vertex stage source.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderInterface {
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, u32>,
    uniform_size: u32,
}

impl ShaderInterface {
    /// Resolves attribute slots and uniform offsets from the WGSL source.
    ///
    /// Attributes come from the `VertexInput` struct; uniform offsets are
    /// computed from the `FrameUniforms` struct per WGSL layout rules.
    pub fn parse(vertex_src: &str) -> Result<Self, ShaderError> {
        let input_body = struct_body(vertex_src, "VertexInput").ok_or_else(|| {
            ShaderError::Interface("vertex stage does not declare a `VertexInput` struct".into())
        })?;
        let uniform_body = struct_body(vertex_src, "FrameUniforms").ok_or_else(|| {
            ShaderError::Interface("vertex stage does not declare a `FrameUniforms` struct".into())
        })?;
        let attributes = parse_attributes(input_body)?;
        let (uniforms, uniform_size) = parse_uniform_block(uniform_body)?;
        Ok(Self {
            attributes,
            uniforms,
            uniform_size,
        })
    }

    /// The `@location` slot declared for an attribute name.
    pub fn attribute(&self, name: &str) -> Result<u32, ShaderError> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| ShaderError::MissingAttribute(name.to_string()))
    }

    /// Byte offset of a uniform inside the frame uniform block.
    pub fn uniform_offset(&self, name: &str) -> Result<u32, ShaderError> {
        self.uniforms
            .get(name)
            .copied()
            .ok_or_else(|| ShaderError::MissingUniform(name.to_string()))
    }

    /// Total size of the uniform block, including trailing padding.
    pub fn uniform_size(&self) -> u32 {
        self.uniform_size
    }
}

fn struct_body<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    let decl = format!("struct {name}");
    let start = source.find(&decl)?;
    let open = source[start..].find('{')? + start;
    let close = source[open..].find('}')? + open;
    Some(&source[open + 1..close])
}

fn parse_attributes(body: &str) -> Result<HashMap<String, u32>, ShaderError> {
    let mut attributes = HashMap::new();
    for line in body.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("@location(") else {
            continue;
        };
        let malformed =
            || ShaderError::Interface(format!("malformed vertex input declaration `{line}`"));
        let (index, rest) = rest.split_once(')').ok_or_else(malformed)?;
        let slot = index.trim().parse::<u32>().map_err(|_| malformed())?;
        let name = rest
            .split(':')
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(malformed)?;
        attributes.insert(name.to_string(), slot);
    }
    Ok(attributes)
}

fn parse_uniform_block(body: &str) -> Result<(HashMap<String, u32>, u32), ShaderError> {
    let mut uniforms = HashMap::new();
    let mut cursor = 0u32;
    for line in body.lines() {
        let line = line.trim().trim_end_matches(',');
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let (name, ty) = line.split_once(':').ok_or_else(|| {
            ShaderError::Interface(format!("malformed uniform declaration `{line}`"))
        })?;
        let ty = ty.trim();
        let (size, align) = wgsl_size_align(ty).ok_or_else(|| {
            ShaderError::Interface(format!("unsupported uniform field type `{ty}`"))
        })?;
        let offset = align_to(cursor, align);
        uniforms.insert(name.trim().to_string(), offset);
        cursor = offset + size;
    }
    Ok((uniforms, align_to(cursor, 16)))
}

fn wgsl_size_align(ty: &str) -> Option<(u32, u32)> {
    match ty {
        "f32" => Some((4, 4)),
        "vec2<f32>" => Some((8, 8)),
        "vec3<f32>" => Some((12, 16)),
        "vec4<f32>" => Some((16, 16)),
        "mat4x4<f32>" => Some((64, 16)),
        _ => None,
    }
}

fn align_to(value: u32, align: u32) -> u32 {
    (value + align - 1) / align * align
}

/// Compiled and linked shading pipeline with its uniform buffer.
pub struct ShaderPipeline {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
    interface: ShaderInterface,
}

impl ShaderPipeline {
    /// Compiles both stages, resolves the shader interface, and links the
    /// render pipeline.
    ///
    /// Activating the pipeline is left to the render pass; with a single
    /// program in the whole demo it is set once per pass.
    pub async fn build(
        ctx: &RenderContext,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, ShaderError> {
        let interface = ShaderInterface::parse(vertex_src)?;

        // Every slot the renderer touches must resolve before the first draw.
        let position_slot = interface.attribute(ATTR_POSITION)?;
        let normal_slot = interface.attribute(ATTR_NORMAL)?;
        let front_color_slot = interface.attribute(ATTR_FRONT_COLOR)?;
        for name in UNIFORM_NAMES {
            interface.uniform_offset(name)?;
        }
        let host_size = mem::size_of::<FrameUniforms>() as u32;
        if interface.uniform_size() != host_size {
            return Err(ShaderError::LayoutMismatch {
                shader: interface.uniform_size(),
                host: host_size,
            });
        }

        let vertex_module = compile_stage(ctx, "vertex", vertex_src).await?;
        let fragment_module = compile_stage(ctx, "fragment", fragment_src).await?;

        let bind_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame-bind-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(mem::size_of::<FrameUniforms>() as u64).unwrap(),
                        ),
                    },
                    count: None,
                }],
            });

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniforms"),
            size: mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &bind_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("phong-pipeline-layout"),
                bind_group_layouts: &[&bind_layout],
                push_constant_ranges: &[],
            });

        // One buffer per attribute: 3 x f32, unnormalized, tightly packed,
        // zero offset, stepped per vertex.
        let attribute_sets = [
            [vertex_attribute(position_slot)],
            [vertex_attribute(normal_slot)],
            [vertex_attribute(front_color_slot)],
        ];
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attribute_sets
            .iter()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: (3 * mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("phong-pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format(),
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });
        if let Some(err) = ctx.device.pop_error_scope().await {
            return Err(ShaderError::Link(err.to_string()));
        }

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            interface,
        })
    }

    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }
}

fn vertex_attribute(shader_location: u32) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location,
    }
}

async fn compile_stage(
    ctx: &RenderContext,
    stage: &'static str,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = ctx
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(stage),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
    match ctx.device.pop_error_scope().await {
        Some(err) => Err(ShaderError::Compile {
            stage,
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn resolves_attribute_slots_from_the_real_source() {
        let interface = ShaderInterface::parse(VERTEX_SHADER).unwrap();
        assert_eq!(interface.attribute(ATTR_POSITION).unwrap(), 0);
        assert_eq!(interface.attribute(ATTR_NORMAL).unwrap(), 1);
        assert_eq!(interface.attribute(ATTR_FRONT_COLOR).unwrap(), 2);
    }

    #[test]
    fn uniform_offsets_match_the_host_struct() {
        let interface = ShaderInterface::parse(VERTEX_SHADER).unwrap();
        let expected = [
            ("uPMatrix", offset_of!(FrameUniforms, p_matrix)),
            ("uMVMatrix", offset_of!(FrameUniforms, mv_matrix)),
            ("u_pointLightPos1", offset_of!(FrameUniforms, point_light_pos_1)),
            ("u_lightColor1", offset_of!(FrameUniforms, light_color_1)),
            ("u_pointLightPos2", offset_of!(FrameUniforms, point_light_pos_2)),
            ("u_lightColor2", offset_of!(FrameUniforms, light_color_2)),
            ("u_ambient", offset_of!(FrameUniforms, ambient_color)),
            ("u_diffuse", offset_of!(FrameUniforms, diffuse_color)),
            ("u_specular", offset_of!(FrameUniforms, specular_color)),
            ("u_shiningness", offset_of!(FrameUniforms, shininess)),
        ];
        for (name, offset) in expected {
            assert_eq!(
                interface.uniform_offset(name).unwrap(),
                offset as u32,
                "offset mismatch for `{name}`"
            );
        }
        assert_eq!(
            interface.uniform_size() as usize,
            mem::size_of::<FrameUniforms>()
        );
    }

    #[test]
    fn missing_attribute_is_a_distinct_failure_kind() {
        let source = VERTEX_SHADER.replace(ATTR_FRONT_COLOR, "aBackColor");
        let interface = ShaderInterface::parse(&source).unwrap();
        assert!(matches!(
            interface.attribute(ATTR_FRONT_COLOR),
            Err(ShaderError::MissingAttribute(_))
        ));
    }

    #[test]
    fn missing_uniform_is_a_distinct_failure_kind() {
        let source = VERTEX_SHADER.replace("u_shiningness", "u_gloss");
        let interface = ShaderInterface::parse(&source).unwrap();
        assert!(matches!(
            interface.uniform_offset("u_shiningness"),
            Err(ShaderError::MissingUniform(_))
        ));
    }

    #[test]
    fn unknown_uniform_type_is_rejected() {
        let source = VERTEX_SHADER.replace("u_shiningness: f32", "u_shiningness: mat3x3<f32>");
        assert!(matches!(
            ShaderInterface::parse(&source),
            Err(ShaderError::Interface(_))
        ));
    }

    #[test]
    fn fragment_stage_declares_the_same_uniform_block() {
        let vertex = ShaderInterface::parse(VERTEX_SHADER).unwrap();
        let fragment = ShaderInterface::parse(
            // The fragment source has no VertexInput; graft one on so the
            // parser accepts it and the uniform blocks can be compared.
            &format!("{FRAGMENT_SHADER}\nstruct VertexInput {{}}\n"),
        )
        .unwrap();
        for name in UNIFORM_NAMES {
            assert_eq!(
                vertex.uniform_offset(name).unwrap(),
                fragment.uniform_offset(name).unwrap()
            );
        }
    }
}
