//! Static mesh description and its GPU-resident buffers.
//!
//! The asset is a JSON document with three flat float arrays, one 3-tuple
//! per vertex: `vertexPositions`, `vertexNormals`, `vertexFrontcolors`.
//! Integrity is checked before anything touches the GPU; a malformed asset
//! fails loudly at load time rather than drawing garbage.

use bytemuck::cast_slice;
use serde::Deserialize;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::context::RenderContext;

/// Floats per vertex in every mesh buffer.
pub const VERTEX_ARITY: usize = 3;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh asset is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("`{buffer}` holds {len} floats, not a whole number of {VERTEX_ARITY}-float vertices")]
    NotTriples { buffer: &'static str, len: usize },
    #[error(
        "mesh buffers disagree on vertex count: \
         {positions} positions, {normals} normals, {front_colors} front colors"
    )]
    CountMismatch {
        positions: usize,
        normals: usize,
        front_colors: usize,
    },
}

/// Pre-parsed mesh description, as produced by the asset pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshData {
    pub vertex_positions: Vec<f32>,
    pub vertex_normals: Vec<f32>,
    pub vertex_frontcolors: Vec<f32>,
}

impl MeshData {
    pub fn from_json(text: &str) -> Result<Self, MeshError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validates the three arrays and returns the shared vertex count.
    pub fn vertex_count(&self) -> Result<usize, MeshError> {
        let positions = triple_count("vertexPositions", &self.vertex_positions)?;
        let normals = triple_count("vertexNormals", &self.vertex_normals)?;
        let front_colors = triple_count("vertexFrontcolors", &self.vertex_frontcolors)?;
        if positions != normals || positions != front_colors {
            return Err(MeshError::CountMismatch {
                positions,
                normals,
                front_colors,
            });
        }
        Ok(positions)
    }
}

fn triple_count(buffer: &'static str, values: &[f32]) -> Result<usize, MeshError> {
    if values.len() % VERTEX_ARITY != 0 {
        return Err(MeshError::NotTriples {
            buffer,
            len: values.len(),
        });
    }
    Ok(values.len() / VERTEX_ARITY)
}

/// Three parallel static vertex buffers sharing one vertex count.
pub struct MeshBuffers {
    pub(crate) positions: wgpu::Buffer,
    pub(crate) normals: wgpu::Buffer,
    pub(crate) front_colors: wgpu::Buffer,
    item_size: u32,
    num_items: u32,
}

impl MeshBuffers {
    /// Validates the description and uploads it into static GPU buffers.
    pub fn upload(ctx: &RenderContext, data: &MeshData) -> Result<Self, MeshError> {
        let count = data.vertex_count()?;
        let make = |label: &str, contents: &[f32]| {
            ctx.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: cast_slice(contents),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        };
        Ok(Self {
            positions: make("mesh-positions", &data.vertex_positions),
            normals: make("mesh-normals", &data.vertex_normals),
            front_colors: make("mesh-front-colors", &data.vertex_frontcolors),
            item_size: VERTEX_ARITY as u32,
            num_items: count as u32,
        })
    }

    pub fn item_size(&self) -> u32 {
        self.item_size
    }

    pub fn num_items(&self) -> u32 {
        self.num_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(count: usize, value: f32) -> Vec<f32> {
        vec![value; count * VERTEX_ARITY]
    }

    #[test]
    fn equal_counts_validate() {
        let data = MeshData {
            vertex_positions: flat(4, 1.0),
            vertex_normals: flat(4, 0.0),
            vertex_frontcolors: flat(4, 0.5),
        };
        assert_eq!(data.vertex_count().unwrap(), 4);
    }

    #[test]
    fn mismatched_counts_fail() {
        let data = MeshData {
            vertex_positions: flat(4, 1.0),
            vertex_normals: flat(3, 0.0),
            vertex_frontcolors: flat(4, 0.5),
        };
        assert!(matches!(
            data.vertex_count(),
            Err(MeshError::CountMismatch {
                positions: 4,
                normals: 3,
                front_colors: 4,
            })
        ));
    }

    #[test]
    fn ragged_array_fails() {
        let data = MeshData {
            vertex_positions: vec![0.0; 7],
            vertex_normals: flat(2, 0.0),
            vertex_frontcolors: flat(2, 0.5),
        };
        assert!(matches!(
            data.vertex_count(),
            Err(MeshError::NotTriples {
                buffer: "vertexPositions",
                len: 7,
            })
        ));
    }

    #[test]
    fn decodes_asset_field_names() {
        let json = r#"{
            "vertexPositions": [0, 0, 0, 1, 0, 0, 0, 1, 0],
            "vertexNormals": [0, 0, 1, 0, 0, 1, 0, 0, 1],
            "vertexFrontcolors": [1, 0, 0, 0, 1, 0, 0, 0, 1]
        }"#;
        let data = MeshData::from_json(json).unwrap();
        assert_eq!(data.vertex_count().unwrap(), 3);
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        assert!(matches!(
            MeshData::from_json("not json"),
            Err(MeshError::Decode(_))
        ));
    }
}
