use crate::data_structures::{
    instance::InstanceRaw,
    model::{self, Material, Vertex},
    texture::Texture,
};

/// The fixed-function state that differs between the scene's pipelines.
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            blend: Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            cull_mode: Some(wgpu::Face::Back),
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        }
    }
}

impl PipelineOptions {
    /// Model pipeline state for a material. Blended materials are drawn after
    /// the opaque ones and leave the depth buffer alone.
    pub fn for_model(blended: bool, double_sided: bool) -> Self {
        let defaults = Self::default();
        Self {
            blend: if blended {
                Some(wgpu::BlendState::ALPHA_BLENDING)
            } else {
                defaults.blend
            },
            cull_mode: if double_sided {
                None
            } else {
                defaults.cull_mode
            },
            depth_write: !blended,
            ..defaults
        }
    }
}

/// Lit, textured, instanced meshes, one variant per material kind. Used for
/// the ship.
#[derive(Debug)]
pub struct ModelPipelines {
    opaque: wgpu::RenderPipeline,
    opaque_double_sided: wgpu::RenderPipeline,
    blended: wgpu::RenderPipeline,
    blended_double_sided: wgpu::RenderPipeline,
}

impl ModelPipelines {
    pub fn for_material(&self, material: &Material) -> &wgpu::RenderPipeline {
        match (material.is_blended(), material.double_sided) {
            (false, false) => &self.opaque,
            (false, true) => &self.opaque_double_sided,
            (true, false) => &self.blended,
            (true, true) => &self.blended_double_sided,
        }
    }
}

pub fn mk_model_pipelines(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    material_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> ModelPipelines {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Model Pipeline Layout"),
        bind_group_layouts: &[
            material_bind_group_layout,
            camera_bind_group_layout,
            light_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let build = |blended, double_sided| {
        mk_render_pipeline(
            device,
            &render_pipeline_layout,
            config.format,
            PipelineOptions::for_model(blended, double_sided),
            Some(Texture::DEPTH_FORMAT),
            &[model::ModelVertex::desc(), InstanceRaw::desc()],
            wgpu::ShaderModuleDescriptor {
                label: Some("Model Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("model.wgsl").into()),
            },
        )
    };

    ModelPipelines {
        opaque: build(false, false),
        opaque_double_sided: build(false, true),
        blended: build(true, false),
        blended_double_sided: build(true, true),
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    options: PipelineOptions,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let label = shader.label.map(|label| format!("{} Pipeline", label));
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: label.as_deref(),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: options.depth_write,
            depth_compare: options.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_single_sided_is_the_default() {
        let options = PipelineOptions::for_model(false, false);
        let defaults = PipelineOptions::default();
        assert_eq!(options.blend, defaults.blend);
        assert_eq!(options.cull_mode, Some(wgpu::Face::Back));
        assert!(options.depth_write);
    }

    #[test]
    fn double_sided_disables_culling() {
        assert_eq!(PipelineOptions::for_model(false, true).cull_mode, None);
        assert_eq!(PipelineOptions::for_model(true, true).cull_mode, None);
    }

    #[test]
    fn blended_materials_blend_without_depth_writes() {
        let options = PipelineOptions::for_model(true, false);
        assert_eq!(options.blend, Some(wgpu::BlendState::ALPHA_BLENDING));
        assert!(!options.depth_write);
        assert_eq!(options.depth_compare, wgpu::CompareFunction::Less);
        assert_eq!(options.cull_mode, Some(wgpu::Face::Back));
    }
}
