//! Meshes, materials and models on the GPU.
//!
//! A [`Model`] is created from CPU-side [`ModelData`] once an asset load
//! finishes. Each mesh references one material by index; a material is a
//! diffuse texture bound together with its sampler and alpha cutoff. Its alpha
//! mode and sidedness pick the pipeline it is drawn with.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{Texture, create_default_sampler},
    resources::gltf::{AlphaMode, MaterialData, ModelData},
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-material shader parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Fragments below this alpha are discarded. Zero keeps everything.
    pub alpha_cutoff: f32,
    _padding: [f32; 3],
}

impl From<AlphaMode> for MaterialUniform {
    fn from(mode: AlphaMode) -> Self {
        let alpha_cutoff = match mode {
            AlphaMode::Mask { cutoff } => cutoff,
            AlphaMode::Opaque | AlphaMode::Blend => 0.0,
        };
        Self {
            alpha_cutoff,
            _padding: [0.0; 3],
        }
    }
}

#[derive(Debug)]
pub struct Material {
    #[allow(unused)]
    pub name: String,
    #[allow(unused)]
    pub diffuse_texture: Texture,
    #[allow(unused)]
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

impl Material {
    /// Upload a decoded material. Materials without a texture get a 1x1
    /// texture of their base colour.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &MaterialData,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let diffuse_texture = match &data.base_colour_texture {
            Some(image) => Texture::from_rgba(device, queue, image, Some(&data.name), false)?,
            None => Texture::solid_colour(device, queue, data.base_colour_rgba8(), &data.name)?,
        };
        let sampler = diffuse_texture
            .sampler
            .clone()
            .unwrap_or_else(|| create_default_sampler(device));
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Material Buffer", data.name)),
            contents: bytemuck::cast_slice(&[MaterialUniform::from(data.alpha_mode)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some(&data.name),
        });

        Ok(Self {
            name: data.name.clone(),
            diffuse_texture,
            uniform_buffer,
            bind_group,
            alpha_mode: data.alpha_mode,
            double_sided: data.double_sided,
        })
    }

    pub fn is_blended(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &ModelData,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let mut materials = data
            .materials
            .iter()
            .map(|material| Material::upload(device, queue, material, layout))
            .collect::<anyhow::Result<Vec<_>>>()?;
        // Meshes without a material fall back to the last slot
        materials.push(Material::upload(
            device,
            queue,
            &MaterialData::default(),
            layout,
        )?);
        let fallback = materials.len() - 1;

        let meshes = data
            .meshes
            .iter()
            .filter(|mesh| !mesh.indices.is_empty())
            .map(|mesh| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Mesh {
                    name: mesh.name.clone(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: mesh.indices.len() as u32,
                    material: mesh
                        .material
                        .filter(|&idx| idx < fallback)
                        .unwrap_or(fallback),
                }
            })
            .collect();

        Ok(Self { meshes, materials })
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );

    /// Depth only: the caller binds the light's view projection at group 0.
    fn draw_mesh_shadow(&mut self, mesh: &'a Mesh, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_mesh_shadow(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}
