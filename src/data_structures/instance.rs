//! Per-instance data uploaded to the GPU.
//!
//! [`Instance`] is the transform of a model instance (the ship), [`SpriteRaw`]
//! is one snow flake. Both are written to vertex buffers stepped per instance.

use cgmath::One;

use crate::data_structures::model;

/// Position, rotation and scale of a model instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU layout of an [`Instance`].
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // Locations 0..=2 are taken by `ModelVertex`. The world matrix is four
    // vec4 columns, the normal matrix three vec3 columns.
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One snow flake: world position and quad size.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteRaw {
    pub position: [f32; 3],
    pub scale: f32,
}

impl SpriteRaw {
    pub fn new(position: cgmath::Vector3<f32>, scale: f32) -> Self {
        Self {
            position: position.into(),
            scale,
        }
    }
}

impl model::Vertex for SpriteRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteRaw>() as wgpu::BufferAddress,
            // The quad corners come from the vertex index, so this is the only buffer
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Rotation3, Vector3, Vector4};

    use super::*;

    #[test]
    fn matrix_translates_after_scaling() {
        let instance = Instance {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: cgmath::Quaternion::one(),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let p = instance.to_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(p, Vector4::new(3.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn rotation_applies_to_normals() {
        let instance = Instance {
            rotation: cgmath::Quaternion::from_angle_y(cgmath::Deg(90.0)),
            ..Default::default()
        };
        let raw = instance.to_raw();
        let normal: cgmath::Matrix3<f32> = raw.normal.into();
        let n = normal * Vector3::unit_x();
        assert!((n - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn raw_layouts_have_expected_size() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 25 * 4);
        assert_eq!(std::mem::size_of::<SpriteRaw>(), 16);
    }
}
