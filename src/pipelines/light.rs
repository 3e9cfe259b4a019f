use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    config::{LightConfig, srgb_hex_to_linear},
    pipelines::shadow::ShadowMap,
};

/// The scene lighting: one ambient term and one directional light with its
/// shadow map.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub direction: [f32; 3],
    _padding2: u32,
    pub colour: [f32; 3],
    _padding3: u32,
}

impl LightUniform {
    /// The directional light shines from its position towards the origin.
    pub fn from_config(config: &LightConfig) -> Self {
        let position = Vector3::from(config.directional_position);
        let direction = if position.magnitude2() > 0.0 {
            position.normalize()
        } else {
            Vector3::unit_y()
        };
        let colour = Vector3::from(srgb_hex_to_linear(config.directional_colour))
            * config.directional_intensity;
        Self {
            ambient: srgb_hex_to_linear(config.ambient_colour),
            _padding: 0,
            direction: direction.into(),
            _padding2: 0,
            colour: colour.into(),
            _padding3: 0,
        }
    }
}

impl LightResources {
    pub fn new(config: &LightConfig, device: &wgpu::Device, shadow: &ShadowMap) -> Self {
        let uniform = LightUniform::from_config(config);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, shadow);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// The light uniform followed by the shadow map, its comparison sampler and
/// the light's view projection.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform(0),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
            uniform(3),
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow: &ShadowMap,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow.texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: shadow.buffer.as_entire_binding(),
            },
        ],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_three_aligned_vec3s() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 48);
    }

    #[test]
    fn default_light_points_from_above_and_in_front() {
        let uniform = LightUniform::from_config(&LightConfig::default());
        let d = Vector3::from(uniform.direction);
        assert!((d.magnitude() - 1.0).abs() < 1e-6);
        assert_eq!(d.x, 0.0);
        assert!((d.y - d.z).abs() < 1e-6);
        assert!(d.y > 0.0);
        for c in uniform.colour {
            assert!((c - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn intensity_scales_colour() {
        let config = LightConfig {
            directional_intensity: 0.5,
            ..Default::default()
        };
        let uniform = LightUniform::from_config(&config);
        for c in uniform.colour {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }
}
