use crate::{
    data_structures::{
        instance::SpriteRaw,
        model::Vertex,
        texture::Texture,
    },
    pipelines::basic::{PipelineOptions, mk_render_pipeline},
};

/**
 * Camera-facing textured quads, one per instance. The quad corners are
 * generated in the vertex shader, so the only vertex buffer is the
 * `SpriteRaw` instance buffer.
 *
 * Sprites are depth tested against the ship but do not write depth, which
 * keeps overlapping flakes from cutting holes into each other.
 */
pub fn mk_sprite_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Sprite Pipeline Layout"),
        bind_group_layouts: &[texture_bind_group_layout, camera_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Sprite Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        PipelineOptions {
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: None,
            depth_write: false,
            depth_compare: wgpu::CompareFunction::Less,
        },
        Some(Texture::DEPTH_FORMAT),
        &[SpriteRaw::desc()],
        shader,
    )
}

/// Vertices drawn per sprite instance.
pub const SPRITE_VERTICES: u32 = 6;
