//! Scene graph: the GPU side of the scene.
//!
//! The scene holds three nodes in draw order: the background, the ship model
//! and the snow sprites. Nodes that depend on an asset start out empty and
//! render nothing until their asset has been uploaded. Each frame the graph
//! is synchronised from the [`SimulationState`], written to the GPU buffers
//! and turned into a [`Render`].

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, SpriteRaw},
        load_state::LoadState,
        model::Model,
        texture::{Texture, create_clamped_sampler},
    },
    render::{Backdrop, Instanced, Render, Sprites},
    resources::gltf::ModelData,
    simulation::{SimulationState, SnowField},
};

pub trait SceneNode {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    fn get_render(&self) -> Render<'_>;
}

/// A texture with the bind group used to sample it.
#[derive(Debug)]
pub struct TextureBinding {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl TextureBinding {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &RgbaImage,
        label: &str,
    ) -> anyhow::Result<Self> {
        let texture = Texture::from_rgba(device, queue, image, Some(label), true)?;
        let sampler = texture
            .sampler
            .clone()
            .unwrap_or_else(|| create_clamped_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(label),
        });
        Ok(Self {
            texture,
            bind_group,
        })
    }
}

#[derive(Debug)]
pub struct BackgroundNode {
    binding: TextureBinding,
}

impl BackgroundNode {
    pub fn new(binding: TextureBinding) -> Self {
        Self { binding }
    }
}

impl SceneNode for BackgroundNode {
    fn write_to_buffers(&mut self, _queue: &wgpu::Queue) {}

    fn get_render(&self) -> Render<'_> {
        Render::Background(Backdrop {
            group: &self.binding.bind_group,
        })
    }
}

/// All snow flakes as one instance buffer. The buffer exists from the start;
/// the flakes are only drawn once the sprite texture is available.
#[derive(Debug)]
pub struct SnowNode {
    sprites: Vec<SpriteRaw>,
    instance_buffer: wgpu::Buffer,
    pub texture: LoadState<TextureBinding>,
}

impl SnowNode {
    pub fn new(device: &wgpu::Device, snow: &SnowField, scale: f32) -> Self {
        let sprites = sprite_instances(snow, scale);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Snow Instance Buffer"),
            contents: bytemuck::cast_slice(&sprites),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            sprites,
            instance_buffer,
            texture: LoadState::Pending,
        }
    }

    pub fn sync(&mut self, snow: &SnowField) {
        for (sprite, position) in self.sprites.iter_mut().zip(snow.positions()) {
            sprite.position = (*position).into();
        }
    }
}

impl SceneNode for SnowNode {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if !self.sprites.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.sprites));
        }
    }

    fn get_render(&self) -> Render<'_> {
        match self.texture.ready() {
            Some(binding) => Render::Sprites(Sprites {
                instance: &self.instance_buffer,
                group: &binding.bind_group,
                amount: self.sprites.len(),
            }),
            None => Render::None,
        }
    }
}

/// One model drawn with a single instance transform.
#[derive(Debug)]
pub struct ModelNode {
    model: Model,
    instance: Instance,
    instance_buffer: wgpu::Buffer,
}

impl ModelNode {
    pub fn from_model(device: &wgpu::Device, model: Model) -> Self {
        let instance = Instance::new();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Instance Buffer"),
            contents: bytemuck::cast_slice(&[instance.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            model,
            instance,
            instance_buffer,
        }
    }

    pub fn set_position(&mut self, position: cgmath::Vector3<f32>) {
        self.instance.position = position;
    }
}

impl SceneNode for ModelNode {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&[self.instance.to_raw()]),
        );
    }

    fn get_render(&self) -> Render<'_> {
        Render::Default(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: 1,
        })
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    pub background: LoadState<BackgroundNode>,
    pub ship: Option<ModelNode>,
    pub snow: SnowNode,
}

impl SceneGraph {
    pub fn new(device: &wgpu::Device, simulation: &SimulationState, sprite_scale: f32) -> Self {
        Self {
            background: LoadState::Pending,
            ship: None,
            snow: SnowNode::new(device, &simulation.snow, sprite_scale),
        }
    }

    pub fn set_background(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: anyhow::Result<RgbaImage>,
    ) {
        let node = image.and_then(|image| {
            TextureBinding::new(device, queue, layout, &image, "background").map(BackgroundNode::new)
        });
        if let Err(e) = &node {
            log::warn!("Background unavailable: {:#}", e);
        }
        self.background = LoadState::from_result(node);
    }

    pub fn set_snow_sprite(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: anyhow::Result<RgbaImage>,
    ) {
        let binding =
            image.and_then(|image| TextureBinding::new(device, queue, layout, &image, "snow sprite"));
        if let Err(e) = &binding {
            log::warn!("Snow sprite unavailable, snow will not be drawn: {:#}", e);
        }
        self.snow.texture = LoadState::from_result(binding);
    }

    /// Upload the ship model. It is drawn from the next frame on.
    pub fn set_ship(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &ModelData,
    ) -> anyhow::Result<()> {
        let model = Model::upload(device, queue, data, layout)?;
        self.ship = Some(ModelNode::from_model(device, model));
        Ok(())
    }

    /// Copy positions from the simulation.
    pub fn sync(&mut self, simulation: &SimulationState) {
        self.snow.sync(&simulation.snow);
        if let (Some(node), Some(position)) = (self.ship.as_mut(), simulation.ship_position()) {
            node.set_position(position);
        }
    }
}

impl SceneNode for SceneGraph {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if let Some(background) = self.background.ready_mut() {
            background.write_to_buffers(queue);
        }
        if let Some(ship) = self.ship.as_mut() {
            ship.write_to_buffers(queue);
        }
        self.snow.write_to_buffers(queue);
    }

    fn get_render(&self) -> Render<'_> {
        Render::Composed(vec![
            self.background
                .ready()
                .map(|background| background.get_render())
                .unwrap_or(Render::None),
            self.ship
                .as_ref()
                .map(|ship| ship.get_render())
                .unwrap_or(Render::None),
            self.snow.get_render(),
        ])
    }
}

/// GPU instances for every flake of `snow`.
pub fn sprite_instances(snow: &SnowField, scale: f32) -> Vec<SpriteRaw> {
    snow.positions()
        .iter()
        .map(|position| SpriteRaw::new(*position, scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::config::SnowConfig;

    #[test]
    fn one_sprite_per_flake() {
        let snow = SnowField::from_positions(
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-4.0, 5.0, -6.0)],
            &SnowConfig::default(),
        );
        let sprites = sprite_instances(&snow, 1.5);
        assert_eq!(
            sprites,
            vec![
                SpriteRaw {
                    position: [1.0, 2.0, 3.0],
                    scale: 1.5
                },
                SpriteRaw {
                    position: [-4.0, 5.0, -6.0],
                    scale: 1.5
                },
            ]
        );
    }
}
