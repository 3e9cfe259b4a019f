//! Render pipelines of the scene.
//!
//! - `background` draws the background image as a fullscreen triangle
//! - `basic` holds the shared pipeline builder and the lit model pipelines
//! - `light` contains the light uniform and its bind group
//! - `shadow` renders the directional light's shadow map
//! - `sprite` draws camera-facing instanced quads (the snow)

pub mod background;
pub mod basic;
pub mod light;
pub mod shadow;
pub mod sprite;

use basic::ModelPipelines;

/// All pipelines, created once with the surface format.
#[derive(Debug)]
pub struct Pipelines {
    pub background: wgpu::RenderPipeline,
    pub model: ModelPipelines,
    pub sprite: wgpu::RenderPipeline,
    /// Layout of the background and sprite texture bind groups.
    pub texture_layout: wgpu::BindGroupLayout,
    /// Layout of model material bind groups.
    pub material_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        light_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let texture_layout = crate::resources::texture::diffuse_layout(device);
        let material_layout = crate::resources::texture::material_layout(device);
        Self {
            background: background::mk_background_pipeline(device, config, &texture_layout),
            model: basic::mk_model_pipelines(
                device,
                config,
                &material_layout,
                light_bind_group_layout,
                camera_bind_group_layout,
            ),
            sprite: sprite::mk_sprite_pipeline(
                device,
                config,
                &texture_layout,
                camera_bind_group_layout,
            ),
            texture_layout,
            material_layout,
        }
    }
}
