//! Scene configuration.
//!
//! [`SceneConfig`] collects every constant the scene is built from: asset
//! locations, snow field bounds, ship speed, camera and light setup. The
//! defaults reproduce the stock scene; callers can override single fields and
//! pass the result to [`crate::flow::run_with_config`].

/// Everything needed to set up the scene and drive the frame loop.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub background_url: String,
    pub snow_sprite_url: String,
    pub ship_model_url: String,

    pub snow: SnowConfig,

    /// Distance the ship moves per frame for every held key.
    pub ship_step: f32,

    pub camera: CameraConfig,
    pub light: LightConfig,

    /// Shown until the background texture arrives.
    pub clear_colour: wgpu::Color,

    /// Seed for the snow spawn positions. `None` picks one from the clock.
    pub seed: Option<u64>,

    /// Canvas element id looked up on the web. A canvas is appended to the
    /// body when no element with this id exists.
    pub canvas_id: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background_url:
                "https://threejsfundamentals.org/threejs/resources/images/starfield.jpg".into(),
            snow_sprite_url:
                "https://cdn.jsdelivr.net/gh/devReemoNg/EE5808-models/static/snow.png".into(),
            ship_model_url: "https://cdn.jsdelivr.net/gh/devReemoNg/EE5808-models/constitution_ii_class_railgun_destroyer_ddr-2000/scene.gltf".into(),
            snow: SnowConfig::default(),
            ship_step: 0.1,
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            clear_colour: wgpu::Color::BLACK,
            seed: None,
            canvas_id: "canvas".into(),
        }
    }
}

/// Snow field bounds and motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnowConfig {
    pub count: usize,
    /// Flakes spawn in `[-spread / 2, spread / 2)` on x and z.
    pub spread: f32,
    /// Flakes spawn in `[0, spawn_height)` on y.
    pub spawn_height: f32,
    /// Units per second.
    pub fall_rate: f32,
    pub floor: f32,
    pub ceiling: f32,
    /// World size of a single sprite.
    pub sprite_scale: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            spread: 1000.0,
            spawn_height: 600.0,
            fall_rate: 60.0,
            floor: -100.0,
            ceiling: 600.0,
            sprite_scale: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub damping_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 10.0, 20.0],
            target: [0.0, 0.0, 0.0],
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            damping_factor: 0.25,
        }
    }
}

/// Colours are `0xRRGGBB` in sRGB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightConfig {
    pub ambient_colour: u32,
    pub directional_colour: u32,
    pub directional_intensity: f32,
    /// The directional light shines from here toward the origin.
    pub directional_position: [f32; 3],
    /// The ship shadows itself through a shadow map of the directional light.
    pub cast_shadows: bool,
    /// Side length of the shadow map in texels. Capped by the device limit.
    pub shadow_map_size: u32,
    /// Half the width of the square area around the ship covered by the
    /// shadow map, in world units.
    pub shadow_half_extent: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_colour: 0x404040,
            directional_colour: 0xffffff,
            directional_intensity: 1.0,
            directional_position: [0.0, 10.0, 10.0],
            cast_shadows: true,
            shadow_map_size: 2048,
            shadow_half_extent: 50.0,
        }
    }
}

/// Convert a `0xRRGGBB` sRGB colour into linear RGB.
pub fn srgb_hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}
