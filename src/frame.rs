//! Per-frame transform and lighting data.
//!
//! Both matrices are recomputed from scratch every frame; nothing here is
//! persisted across frames. The lighting values are fixed for the demo and
//! written with the matrices in a single uniform block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

pub const FIELD_OF_VIEW_DEG: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// Fixed camera offset along the view axis.
pub const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -40.0);

const POINT_LIGHT_POS_1: [f32; 3] = [-8.0, -3.0, 1.0];
const LIGHT_COLOR_1: [f32; 3] = [0.5, 0.5, 0.5];
const POINT_LIGHT_POS_2: [f32; 3] = [8.0, 3.0, 1.0];
const LIGHT_COLOR_2: [f32; 3] = [0.5, 0.5, 0.5];
const AMBIENT_COLOR: [f32; 3] = [0.24, 0.19, 0.07];
const DIFFUSE_COLOR: [f32; 3] = [0.75, 0.6, 0.22];
const SPECULAR_COLOR: [f32; 3] = [0.62, 0.55, 0.36];
const SHININESS: f32 = 0.4 * 128.0;

/// Perspective projection for the current surface aspect ratio.
pub fn projection_matrix(aspect: f32) -> Mat4 {
    Mat4::perspective_rh_gl(
        FIELD_OF_VIEW_DEG.to_radians(),
        aspect,
        NEAR_PLANE,
        FAR_PLANE,
    )
}

/// Model-view matrix: camera offset, then rotation about the vertical axis.
pub fn model_view_matrix(angle_deg: f32) -> Mat4 {
    Mat4::from_translation(CAMERA_OFFSET) * Mat4::from_rotation_y(angle_deg.to_radians())
}

/// Uniform block written once per frame.
///
/// Field order and padding must match the `FrameUniforms` struct in the
/// WGSL sources; the pipeline builder cross-checks the layout at startup.
/// `vec3` fields are padded to 16 bytes, and the trailing `f32` packs into
/// the final vector's padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub p_matrix: [[f32; 4]; 4],
    pub mv_matrix: [[f32; 4]; 4],
    pub point_light_pos_1: [f32; 3],
    pub _pad0: f32,
    pub light_color_1: [f32; 3],
    pub _pad1: f32,
    pub point_light_pos_2: [f32; 3],
    pub _pad2: f32,
    pub light_color_2: [f32; 3],
    pub _pad3: f32,
    pub ambient_color: [f32; 3],
    pub _pad4: f32,
    pub diffuse_color: [f32; 3],
    pub _pad5: f32,
    pub specular_color: [f32; 3],
    pub shininess: f32,
}

impl FrameUniforms {
    /// Builds the complete uniform block for one frame.
    pub fn compose(aspect: f32, angle_deg: f32) -> Self {
        Self {
            p_matrix: projection_matrix(aspect).to_cols_array_2d(),
            mv_matrix: model_view_matrix(angle_deg).to_cols_array_2d(),
            point_light_pos_1: POINT_LIGHT_POS_1,
            _pad0: 0.0,
            light_color_1: LIGHT_COLOR_1,
            _pad1: 0.0,
            point_light_pos_2: POINT_LIGHT_POS_2,
            _pad2: 0.0,
            light_color_2: LIGHT_COLOR_2,
            _pad3: 0.0,
            ambient_color: AMBIENT_COLOR,
            _pad4: 0.0,
            diffuse_color: DIFFUSE_COLOR,
            _pad5: 0.0,
            specular_color: SPECULAR_COLOR,
            shininess: SHININESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_reproduces_perspective_coefficients() {
        for aspect in [800.0 / 600.0, 1.0, 2.4] {
            let m = projection_matrix(aspect);
            let f = 1.0 / (FIELD_OF_VIEW_DEG.to_radians() / 2.0).tan();
            assert_relative_eq!(m.x_axis.x, f / aspect, max_relative = 1e-6);
            assert_relative_eq!(m.y_axis.y, f, max_relative = 1e-6);
            assert_relative_eq!(
                m.z_axis.z,
                (FAR_PLANE + NEAR_PLANE) / (NEAR_PLANE - FAR_PLANE),
                max_relative = 1e-6
            );
            assert_relative_eq!(m.z_axis.w, -1.0, max_relative = 1e-6);
            assert_relative_eq!(
                m.w_axis.z,
                2.0 * FAR_PLANE * NEAR_PLANE / (NEAR_PLANE - FAR_PLANE),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn model_view_rotation_block_matches_rotation_about_y() {
        for (angle, cos, sin) in [(0.0f32, 1.0f32, 0.0f32), (90.0, 0.0, 1.0), (180.0, -1.0, 0.0)] {
            let m = model_view_matrix(angle);
            assert_relative_eq!(m.x_axis.x, cos, epsilon = 1e-6);
            assert_relative_eq!(m.x_axis.z, -sin, epsilon = 1e-6);
            assert_relative_eq!(m.z_axis.x, sin, epsilon = 1e-6);
            assert_relative_eq!(m.z_axis.z, cos, epsilon = 1e-6);
            assert_relative_eq!(m.y_axis.y, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn model_view_translation_is_fixed_regardless_of_angle() {
        for angle in [0.0f32, 37.5, 180.0, 1234.0] {
            let m = model_view_matrix(angle);
            assert_eq!(m.w_axis.x, 0.0);
            assert_eq!(m.w_axis.y, 0.0);
            assert_eq!(m.w_axis.z, -40.0);
            assert_eq!(m.w_axis.w, 1.0);
        }
    }

    #[test]
    fn compose_carries_matrices_and_lighting_constants() {
        let aspect = 800.0 / 600.0;
        let uniforms = FrameUniforms::compose(aspect, 180.0);
        assert_eq!(uniforms.p_matrix, projection_matrix(aspect).to_cols_array_2d());
        assert_eq!(uniforms.mv_matrix, model_view_matrix(180.0).to_cols_array_2d());
        assert_eq!(uniforms.point_light_pos_1, [-8.0, -3.0, 1.0]);
        assert_eq!(uniforms.point_light_pos_2, [8.0, 3.0, 1.0]);
        assert_eq!(uniforms.shininess, 51.2);
    }
}
