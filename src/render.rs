//! Render composition and pipeline batching.
//!
//! Scene nodes describe what they want drawn with a [`Render`] value. The
//! frame loop collects them into [`Batches`], one list per pipeline, and
//! draws the batches in a fixed order: background, opaque model meshes,
//! blended model meshes, sprites. Models are also drawn into the shadow map
//! in a pass of their own before that.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing render operations
//! - [`Instanced<'a>`] contains data for instanced rendering (model + instance buffer)
//! - [`Sprites<'a>`] contains an instance buffer of sprites and their texture
//! - [`Backdrop<'a>`] is a fullscreen texture

use crate::{
    context::Context,
    data_structures::model::{DrawModel, Model},
    pipelines::{shadow::ShadowMap, sprite::SPRITE_VERTICES},
};

/// Data for instanced object rendering: a model and its instance buffer.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Camera-facing quads sharing one texture.
pub struct Sprites<'a> {
    pub instance: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: usize,
}

/// A texture stretched over the whole viewport.
pub struct Backdrop<'a> {
    pub group: &'a wgpu::BindGroup,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Background(Backdrop)` fills the viewport behind everything else
/// - `Default(Instanced)` renders a single opaque instanced object
/// - `Sprites(Sprites)` renders alpha blended billboards
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Background(Backdrop<'a>),
    Default(Instanced<'a>),
    Sprites(Sprites<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Background(backdrop) => batches.backgrounds.push(backdrop),
            Render::Default(instanced) => batches.basics.push(instanced),
            Render::Sprites(sprites) => batches.sprites.push(sprites),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

/// Renders sorted by pipeline.
#[derive(Default)]
pub struct Batches<'a> {
    pub backgrounds: Vec<Backdrop<'a>>,
    pub basics: Vec<Instanced<'a>>,
    pub sprites: Vec<Sprites<'a>>,
}

impl<'a> From<Render<'a>> for Batches<'a> {
    fn from(render: Render<'a>) -> Self {
        let mut batches = Batches::default();
        render.set_pipelines(&mut batches);
        batches
    }
}

impl<'a> Batches<'a> {
    pub fn draw(&self, ctx: &'a Context, render_pass: &mut wgpu::RenderPass<'a>) {
        if !self.backgrounds.is_empty() {
            render_pass.set_pipeline(&ctx.pipelines.background);
            for backdrop in &self.backgrounds {
                render_pass.set_bind_group(0, backdrop.group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        // opaque meshes first, blended ones over them
        for blended in [false, true] {
            for instanced in &self.basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    continue;
                }
                let model = instanced.model;
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                for mesh in &model.meshes {
                    let material = &model.materials[mesh.material];
                    if material.is_blended() != blended {
                        continue;
                    }
                    render_pass.set_pipeline(ctx.pipelines.model.for_material(material));
                    render_pass.draw_mesh_instanced(
                        mesh,
                        material,
                        0..instanced.amount as u32,
                        &ctx.camera.bind_group,
                        &ctx.light.bind_group,
                    );
                }
            }
        }

        if !self.sprites.is_empty() {
            render_pass.set_pipeline(&ctx.pipelines.sprite);
            render_pass.set_bind_group(1, &ctx.camera.bind_group, &[]);
            for sprites in &self.sprites {
                if sprites.amount == 0 {
                    continue;
                }
                render_pass.set_bind_group(0, sprites.group, &[]);
                render_pass.set_vertex_buffer(0, sprites.instance.slice(..));
                render_pass.draw(0..SPRITE_VERTICES, 0..sprites.amount as u32);
            }
        }
    }

    /// Draw every model depth-only into the shadow map.
    pub fn draw_shadows(&self, shadow: &'a ShadowMap, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.basics.is_empty() {
            return;
        }
        render_pass.set_pipeline(&shadow.pipeline);
        render_pass.set_bind_group(0, &shadow.bind_group, &[]);
        for instanced in &self.basics {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                continue;
            }
            let model = instanced.model;
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            for mesh in &model.meshes {
                render_pass.draw_mesh_shadow(mesh, 0..instanced.amount as u32);
            }
        }
    }
}
