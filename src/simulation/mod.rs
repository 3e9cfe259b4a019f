//! GPU-free scene state and the per-frame update.
//!
//! [`SimulationState`] owns everything that moves: the snow field and the
//! ship. The frame loop calls [`SimulationState::step`] once per frame with
//! the elapsed time and a [`KeyState`] snapshot, then copies the new positions
//! into the scene graph for rendering.

pub mod snow;

use cgmath::Vector3;
use instant::{Duration, Instant};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::{config::SceneConfig, data_structures::load_state::LoadState, input::KeyState};

pub use snow::SnowField;

/// The steerable ship. Only exists once its model has loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Ship {
    pub position: Vector3<f32>,
}

impl Default for Ship {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

impl Ship {
    /// Move by `step` along each axis whose key is held. Opposite keys
    /// cancel out.
    pub fn steer(&mut self, keys: KeyState, step: f32) {
        if keys.forward {
            self.position.z -= step;
        }
        if keys.back {
            self.position.z += step;
        }
        if keys.left {
            self.position.x -= step;
        }
        if keys.right {
            self.position.x += step;
        }
    }
}

#[derive(Debug)]
pub struct SimulationState {
    pub snow: SnowField,
    pub ship: LoadState<Ship>,
    ship_step: f32,
}

impl SimulationState {
    pub fn new(config: &SceneConfig) -> Self {
        let seed = config.seed.unwrap_or_else(clock_seed);
        log::info!("Seeding snow field with {}", seed);
        let mut rng = Pcg32::seed_from_u64(seed);
        Self::with_snow(SnowField::new(&config.snow, &mut rng), config)
    }

    pub fn with_snow(snow: SnowField, config: &SceneConfig) -> Self {
        Self {
            snow,
            ship: LoadState::Pending,
            ship_step: config.ship_step,
        }
    }

    /// Advance the scene by one frame.
    ///
    /// The ship moves a fixed distance per frame regardless of `dt`; the snow
    /// falls proportionally to `dt`.
    pub fn step(&mut self, keys: KeyState, dt: Duration) {
        if let Some(ship) = self.ship.ready_mut() {
            ship.steer(keys, self.ship_step);
        }
        self.snow.fall(dt.as_secs_f32());
    }

    pub fn ship_position(&self) -> Option<Vector3<f32>> {
        self.ship.ready().map(|ship| ship.position)
    }
}

/// Measures the time between consecutive frames.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Time since the previous call (or since construction).
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
fn clock_seed() -> u64 {
    js_sys::Date::now() as u64
}
