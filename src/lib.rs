//! starship-snow
//!
//! A single interactive 3D scene: a starfield backdrop, two thousand falling
//! snow flakes, a glTF spaceship steered with `w`/`a`/`s`/`d` and a damped
//! orbit camera. The scene runs as a native window or, built for
//! `wasm32-unknown-unknown`, on a page canvas through WebGL.
//!
//! High-level modules
//! - `camera`: camera, projection and the orbit controller
//! - `config`: scene settings and their defaults
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: models, textures, instances and the scene graph
//! - `flow`: the event loop and the per-frame update
//! - `input`: key events and the per-frame key snapshot
//! - `pipelines`: background, model and sprite pipelines and the light uniform
//! - `render`: render composition and batching per pipeline
//! - `resources`: fetching and decoding images and glTF models
//! - `simulation`: GPU-free scene state (snow field, ship)
//! - `stats`: frame rate logging
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod simulation;
pub mod stats;

pub use config::SceneConfig;
pub use flow::{run, run_with_config};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
