use instant::Duration;
use starship_snow::{
    SceneConfig,
    data_structures::load_state::LoadState,
    input::{InputQueue, KeyEvent, KeyState, ShipKey},
    simulation::{Ship, SimulationState},
};

/// Drives the simulation the way the frame loop does, without a window.
pub(crate) struct Frames {
    pub sim: SimulationState,
    input: InputQueue,
    keys: KeyState,
    frame_counter: u32,
}

impl Frames {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            sim: SimulationState::new(config),
            input: InputQueue::new(),
            keys: KeyState::default(),
            frame_counter: 0,
        }
    }

    pub fn with_ready_ship(config: &SceneConfig) -> Self {
        let mut frames = Self::new(config);
        frames.sim.ship = LoadState::Ready(Ship::default());
        frames
    }

    pub fn press(&mut self, key: ShipKey) {
        self.input.push(KeyEvent { key, pressed: true });
    }

    pub fn release(&mut self, key: ShipKey) {
        self.input.push(KeyEvent {
            key,
            pressed: false,
        });
    }

    pub fn frame(&mut self, dt: Duration) {
        self.keys = self.input.drain(self.keys);
        self.sim.step(self.keys, dt);
        self.frame_counter += 1;
    }

    pub fn keys(&self) -> KeyState {
        self.keys
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }
}

pub fn seeded_config(seed: u64) -> SceneConfig {
    SceneConfig {
        seed: Some(seed),
        ..Default::default()
    }
}
