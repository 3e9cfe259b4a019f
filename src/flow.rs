//! Application event loop and the per-frame update.
//!
//! [`App`] implements winit's `ApplicationHandler`. Once the window exists it
//! builds the [`AppState`] (GPU context, simulation and scene graph) and
//! starts the three asset loads. Each load runs on its own task and reports
//! back through a [`FlowEvent`] sent to the event loop, where the result is
//! uploaded to the GPU.
//!
//! # Lifecycle
//!
//! Every `RedrawRequested` runs one frame:
//! 1. Measure the time since the previous frame
//! 2. Turn queued key events into a `KeyState` snapshot
//! 3. Step the simulation (ship steering, falling snow)
//! 4. Apply the damped orbit camera motion and upload the camera uniform
//! 5. Copy positions into the scene graph and write its buffers, aim the
//!    shadow map at the ship
//! 6. Draw the ship into the shadow map, then background, ship and snow,
//!    present, and request the next frame

use std::{fmt::Debug, iter, sync::Arc};

use cgmath::{Vector3, Zero};
use image::RgbaImage;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    data_structures::{load_state::LoadState, scene_graph::{SceneGraph, SceneNode}},
    input::{InputQueue, KeyState},
    render::Batches,
    resources::{gltf::{ModelData, load_model_gltf}, texture::load_image},
    simulation::{FrameClock, Ship, SimulationState},
    stats::FrameStats,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Application state bundle: GPU context, scene, simulation and input.
#[derive(Debug)]
pub(crate) struct AppState {
    pub(crate) ctx: Context,
    scene: SceneGraph,
    simulation: SimulationState,
    input: InputQueue,
    keys: KeyState,
    clock: FrameClock,
    stats: FrameStats,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let simulation = SimulationState::new(config);
        let scene = SceneGraph::new(&ctx.device, &simulation, config.snow.sprite_scale);
        Ok(Self {
            ctx,
            scene,
            simulation,
            input: InputQueue::new(),
            keys: KeyState::default(),
            clock: FrameClock::new(),
            stats: FrameStats::new(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn update(&mut self) {
        let dt = self.clock.delta();
        self.stats.record_and_log(dt);

        self.keys = self.input.drain(self.keys);
        self.simulation.step(self.keys, dt);

        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.camera);
        camera.write_to_buffer(&self.ctx.projection, &self.ctx.queue);

        self.scene.sync(&self.simulation);
        self.scene.write_to_buffers(&self.ctx.queue);

        let target = self.simulation.ship_position().unwrap_or(Vector3::zero());
        let direction = Vector3::from(self.ctx.light.uniform.direction);
        self.ctx.shadow.update(&self.ctx.queue, direction, target);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let batches = Batches::from(self.scene.get_render());

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.shadow.texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if self.ctx.shadow.is_enabled() {
                batches.draw_shadows(&self.ctx.shadow, &mut shadow_pass);
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            batches.draw(&self.ctx, &mut render_pass);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn on_asset(&mut self, event: FlowEvent) {
        let ctx = &self.ctx;
        let layout = &ctx.pipelines.texture_layout;
        match event {
            FlowEvent::BackgroundLoaded(image) => {
                self.scene
                    .set_background(&ctx.device, &ctx.queue, layout, image);
            }
            FlowEvent::SpriteLoaded(image) => {
                self.scene
                    .set_snow_sprite(&ctx.device, &ctx.queue, layout, image);
            }
            FlowEvent::ModelLoaded(data) => {
                let layout = &ctx.pipelines.material_layout;
                let uploaded = data.and_then(|data| {
                    self.scene.set_ship(&ctx.device, &ctx.queue, layout, &data)
                });
                self.simulation.ship = match uploaded {
                    Ok(()) => {
                        log::info!("Ship ready, steer with w/a/s/d");
                        LoadState::Ready(Ship::default())
                    }
                    Err(e) => {
                        log::error!("Ship model failed to load, movement stays disabled: {:#}", e);
                        LoadState::from_result(Err(e))
                    }
                };
            }
            FlowEvent::Initialized(_) => {
                log::warn!("Ignoring a second initialisation");
            }
        }
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(anyhow::Result<Box<AppState>>),
    BackgroundLoaded(anyhow::Result<RgbaImage>),
    SpriteLoaded(anyhow::Result<RgbaImage>),
    ModelLoaded(anyhow::Result<ModelData>),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = |ok: bool| if ok { "Ok" } else { "Err" };
        match self {
            Self::Initialized(state) => f
                .debug_tuple("Initialized")
                .field(&status(state.is_ok()))
                .finish(),
            Self::BackgroundLoaded(image) => f
                .debug_tuple("BackgroundLoaded")
                .field(&status(image.is_ok()))
                .finish(),
            Self::SpriteLoaded(image) => f
                .debug_tuple("SpriteLoaded")
                .field(&status(image.is_ok()))
                .finish(),
            Self::ModelLoaded(model) => f
                .debug_tuple("ModelLoaded")
                .field(&status(model.is_ok()))
                .finish(),
        }
    }
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: SceneConfig,
    state: Option<AppState>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
        })
    }

    /// Fire off the background, sprite and model loads.
    fn start_loads(&self) {
        let background = self.config.background_url.clone();
        self.spawn(async move { FlowEvent::BackgroundLoaded(load_image(&background).await) });

        let sprite = self.config.snow_sprite_url.clone();
        self.spawn(async move { FlowEvent::SpriteLoaded(load_image(&sprite).await) });

        let ship = self.config.ship_model_url.clone();
        self.spawn(async move { FlowEvent::ModelLoaded(load_model_gltf(&ship).await) });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn<F>(&self, load: F)
    where
        F: Future<Output = FlowEvent> + Send + 'static,
    {
        let proxy = self.proxy.clone();
        self.async_runtime.spawn(async move {
            if proxy.send_event(load.await).is_err() {
                log::warn!("Event loop closed before an asset finished loading");
            }
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn<F>(&self, load: F)
    where
        F: Future<Output = FlowEvent> + 'static,
    {
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if proxy.send_event(load.await).is_err() {
                log::warn!("Event loop closed before an asset finished loading");
            }
        });
    }

    fn initialized(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.start_loads();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Starship Snow");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            window_attributes = match find_canvas(&self.config.canvas_id) {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => window_attributes.with_append(true),
            };
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(target_arch = "wasm32")]
        fill_page(&window);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(AppState::new(window, &self.config))
            {
                Ok(state) => self.initialized(state),
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = AppState::new(window, &config).await.map(Box::new);
                if proxy.send_event(FlowEvent::Initialized(state)).is_err() {
                    log::error!("Event loop closed during initialisation");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        log::debug!("{:?}", event);
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized(Ok(state)) if self.state.is_none() => {
                self.initialized(*state);
            }
            FlowEvent::Initialized(Err(e)) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
            }
            event => {
                if let Some(state) = &mut self.state {
                    state.on_asset(event);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let camera = &mut state.ctx.camera;
        camera
            .controller
            .handle_window_events(&event, &camera.camera, &state.ctx.projection);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                state.input.handle_keyboard_input(&event);
            }
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn find_canvas(id: &str) -> Option<web_sys::HtmlCanvasElement> {
    web_sys::window()?
        .document()?
        .get_element_by_id(id)?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .ok()
}

/// Stretch the canvas over the whole page. winit reports the resulting size
/// as a `Resized` event.
#[cfg(target_arch = "wasm32")]
fn fill_page(window: &Window) {
    use winit::platform::web::WindowExtWebSys;
    if let Some(canvas) = window.canvas() {
        let style = canvas.style();
        for (property, value) in [("width", "100%"), ("height", "100%"), ("display", "block")] {
            if style.set_property(property, value).is_err() {
                log::warn!("Could not set canvas {} to {}", property, value);
            }
        }
    }
}

/// Start the scene with the stock settings.
pub fn run() -> anyhow::Result<()> {
    run_with_config(SceneConfig::default())
}

pub fn run_with_config(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }
    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    #[allow(unused_mut)]
    let mut app = App::new(&event_loop, config)?;

    #[cfg(not(target_arch = "wasm32"))]
    event_loop.run_app(&mut app)?;

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}
