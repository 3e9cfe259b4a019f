//! The falling snow particle group.

use cgmath::Vector3;
use rand::Rng;

use crate::config::SnowConfig;

/// All snow flakes. Flakes are never removed: once one drops below the floor
/// it is put back at the ceiling and falls again.
#[derive(Clone, Debug)]
pub struct SnowField {
    flakes: Vec<Vector3<f32>>,
    fall_rate: f32,
    floor: f32,
    ceiling: f32,
}

impl SnowField {
    /// Scatter `config.count` flakes over the spawn volume.
    pub fn new<R: Rng>(config: &SnowConfig, rng: &mut R) -> Self {
        let flakes = (0..config.count)
            .map(|_| {
                let x = config.spread * (rng.random::<f32>() - 0.5);
                let y = config.spawn_height * rng.random::<f32>();
                let z = config.spread * (rng.random::<f32>() - 0.5);
                Vector3::new(x, y, z)
            })
            .collect();
        Self::from_positions(flakes, config)
    }

    pub fn from_positions(flakes: Vec<Vector3<f32>>, config: &SnowConfig) -> Self {
        Self {
            flakes,
            fall_rate: config.fall_rate,
            floor: config.floor,
            ceiling: config.ceiling,
        }
    }

    /// Move every flake down by `dt * fall_rate`, wrapping flakes that end up
    /// below the floor back to the ceiling.
    pub fn fall(&mut self, dt: f32) {
        let drop = dt * self.fall_rate;
        for flake in self.flakes.iter_mut() {
            flake.y -= drop;
            if flake.y < self.floor {
                flake.y = self.ceiling;
            }
        }
    }

    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.flakes
    }

    pub fn len(&self) -> usize {
        self.flakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flakes.is_empty()
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}
