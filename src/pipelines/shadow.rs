//! Shadow map of the directional light.
//!
//! Every frame the models are drawn depth-only from the light's point of view
//! into a square depth texture centred on the ship. The model shader compares
//! each fragment against it with a 3x3 PCF kernel, which gives the ship soft
//! self-shadowing.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::LightConfig,
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub light_view_proj: [[f32; 4]; 4],
    /// Size of one shadow map texel in texture coordinates.
    pub texel_size: f32,
    /// `0.0` turns shadow lookups off.
    pub enabled: f32,
    _padding: [f32; 2],
}

#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub sampler: wgpu::Sampler,
    pub uniform: ShadowUniform,
    pub buffer: wgpu::Buffer,
    /// Group 0 of the shadow pipeline.
    pub bind_group: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
    half_extent: f32,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, config: &LightConfig) -> Self {
        let size = config
            .shadow_map_size
            .min(device.limits().max_texture_dimension_2d)
            .max(1);
        let texture = Texture::create_depth_texture(device, [size, size], "shadow_map");
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let half_extent = config.shadow_half_extent.max(f32::EPSILON);
        let uniform = ShadowUniform {
            light_view_proj: light_view_proj(
                Vector3::from(config.directional_position),
                Point3::new(0.0, 0.0, 0.0),
                half_extent,
            )
            .into(),
            texel_size: 1.0 / size as f32,
            enabled: if config.cast_shadows { 1.0 } else { 0.0 },
            _padding: [0.0; 2],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("shadow_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });
        let pipeline = mk_shadow_pipeline(device, &bind_group_layout);

        Self {
            texture,
            sampler,
            uniform,
            buffer,
            bind_group,
            pipeline,
            half_extent,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.uniform.enabled != 0.0
    }

    /// Aim the shadow map at `target`. `direction` points towards the light.
    pub fn update(&mut self, queue: &wgpu::Queue, direction: Vector3<f32>, target: Vector3<f32>) {
        let target = Point3::new(target.x, target.y, target.z);
        self.uniform.light_view_proj = light_view_proj(direction, target, self.half_extent).into();
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Orthographic view of the square `2 * half_extent` wide area around
/// `target`, seen from the light. `target` lands in the middle of the depth
/// range so casters on either side of it are kept.
pub fn light_view_proj(
    direction: Vector3<f32>,
    target: Point3<f32>,
    half_extent: f32,
) -> Matrix4<f32> {
    let direction = if direction.magnitude2() > 0.0 {
        direction.normalize()
    } else {
        Vector3::unit_y()
    };
    let up = if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let eye = target + direction * 2.0 * half_extent;
    let view = Matrix4::look_at_rh(eye, target, up);
    let proj = cgmath::ortho(
        -half_extent,
        half_extent,
        -half_extent,
        half_extent,
        0.0,
        4.0 * half_extent,
    );
    OPENGL_TO_WGPU_MATRIX * proj * view
}

fn mk_shadow_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Shadow Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[ModelVertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        // depth only
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // double sided materials cast from both faces
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector4, vec3};

    use super::*;

    fn project(m: Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
        let clip = m * Vector4::new(p.x, p.y, p.z, 1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 80);
    }

    #[test]
    fn target_sits_in_the_middle_of_the_map() {
        let target = Point3::new(3.0, 1.0, -2.0);
        let m = light_view_proj(vec3(0.0, 10.0, 10.0), target, 50.0);
        let p = project(m, vec3(3.0, 1.0, -2.0));
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!((p.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn points_towards_the_light_are_closer() {
        let direction = vec3(0.0, 1.0, 1.0).normalize();
        let m = light_view_proj(direction, Point3::new(0.0, 0.0, 0.0), 50.0);
        let near = project(m, direction * 50.0);
        assert!((near.z - 0.25).abs() < 1e-5);
        assert!(near.x.abs() < 1e-5 && near.y.abs() < 1e-5);
    }

    #[test]
    fn half_extent_reaches_the_map_edge() {
        let m = light_view_proj(vec3(0.0, 10.0, 10.0), Point3::new(0.0, 0.0, 0.0), 50.0);
        // the light looks along -y/-z, so world x stays horizontal in the map
        let edge = project(m, vec3(50.0, 0.0, 0.0));
        assert!((edge.x.abs() - 1.0).abs() < 1e-5);
        assert!(edge.y.abs() < 1e-5);
    }

    #[test]
    fn light_straight_above_still_has_a_view() {
        let m = light_view_proj(Vector3::unit_y(), Point3::new(0.0, 0.0, 0.0), 10.0);
        let p = project(m, vec3(5.0, 0.0, 5.0));
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        assert!((p.x.abs() - 0.5).abs() < 1e-5);
        assert!((p.y.abs() - 0.5).abs() < 1e-5);
    }
}
