use cgmath::Vector3;
use instant::Duration;
use starship_snow::{
    SceneConfig,
    config::SnowConfig,
    input::ShipKey,
    simulation::{SimulationState, SnowField},
};

use crate::common::test_utils::{Frames, seeded_config};

mod common;

const FRAME: Duration = Duration::from_millis(16);

#[test]
fn snow_field_fills_the_spawn_volume() {
    let config = seeded_config(7);
    let sim = SimulationState::new(&config);
    assert_eq!(sim.snow.len(), 2000);
    for flake in sim.snow.positions() {
        assert!(flake.x >= -500.0 && flake.x <= 500.0, "{:?}", flake);
        assert!(flake.y >= 0.0 && flake.y <= 600.0, "{:?}", flake);
        assert!(flake.z >= -500.0 && flake.z <= 500.0, "{:?}", flake);
    }
}

#[test]
fn same_seed_same_snow() {
    let a = SimulationState::new(&seeded_config(42));
    let b = SimulationState::new(&seeded_config(42));
    let c = SimulationState::new(&seeded_config(43));
    assert_eq!(a.snow.positions(), b.snow.positions());
    assert_ne!(a.snow.positions(), c.snow.positions());
}

#[test]
fn flakes_fall_sixty_units_per_second() {
    let config = SceneConfig::default();
    let snow = SnowField::from_positions(vec![Vector3::new(3.0, 300.0, -2.0)], &config.snow);
    let mut sim = SimulationState::with_snow(snow, &config);
    sim.step(Default::default(), Duration::from_millis(500));
    assert_eq!(sim.snow.positions()[0], Vector3::new(3.0, 270.0, -2.0));
}

#[test]
fn flake_dropping_below_the_floor_resets_to_the_ceiling() {
    let config = SceneConfig::default();
    let snow = SnowField::from_positions(
        vec![Vector3::new(0.0, -99.0, 0.0), Vector3::new(1.0, -100.0, 1.0)],
        &config.snow,
    );
    let mut sim = SimulationState::with_snow(snow, &config);
    // one second moves both flakes 60 units below the floor
    sim.step(Default::default(), Duration::from_secs(1));
    for flake in sim.snow.positions() {
        assert_eq!(flake.y, 600.0);
    }
}

#[test]
fn reset_flake_keeps_falling_from_the_ceiling() {
    let snow_config = SnowConfig::default();
    let mut snow = SnowField::from_positions(vec![Vector3::new(0.0, -99.5, 0.0)], &snow_config);
    snow.fall(1.0 / 60.0);
    assert_eq!(snow.positions()[0].y, 600.0);
    snow.fall(0.5);
    assert_eq!(snow.positions()[0].y, 570.0);
}

#[test]
fn ship_ignores_keys_until_loaded() {
    let mut frames = Frames::new(&seeded_config(1));
    for key in [ShipKey::Forward, ShipKey::Back, ShipKey::Left, ShipKey::Right] {
        frames.press(key);
    }
    for _ in 0..10 {
        frames.frame(FRAME);
    }
    assert!(frames.sim.ship.is_pending());
    assert_eq!(frames.sim.ship_position(), None);
}

#[test]
fn forward_moves_along_negative_z_each_frame() {
    let mut frames = Frames::with_ready_ship(&seeded_config(1));
    frames.press(ShipKey::Forward);
    let mut last_z = 0.0;
    for _ in 0..5 {
        frames.frame(FRAME);
        let position = frames.sim.ship_position().unwrap();
        assert!(position.z < last_z);
        assert!((last_z - position.z - 0.1).abs() < 1e-6);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 0.0);
        last_z = position.z;
    }
    assert_eq!(frames.frame_counter(), 5);
}

#[test]
fn step_does_not_depend_on_frame_time() {
    let mut fast = Frames::with_ready_ship(&seeded_config(1));
    let mut slow = Frames::with_ready_ship(&seeded_config(1));
    fast.press(ShipKey::Right);
    slow.press(ShipKey::Right);
    fast.frame(Duration::from_millis(1));
    slow.frame(Duration::from_millis(100));
    assert_eq!(fast.sim.ship_position(), slow.sim.ship_position());
}

#[test]
fn opposite_keys_cancel_out() {
    let mut frames = Frames::with_ready_ship(&seeded_config(1));
    frames.press(ShipKey::Forward);
    frames.press(ShipKey::Back);
    frames.press(ShipKey::Left);
    frames.press(ShipKey::Right);
    for _ in 0..3 {
        frames.frame(FRAME);
    }
    let position = frames.sim.ship_position().unwrap();
    assert!(position.x.abs() < 1e-6);
    assert!(position.z.abs() < 1e-6);
}

#[test]
fn press_and_release_between_frames_leaves_key_up() {
    let mut frames = Frames::with_ready_ship(&seeded_config(1));
    frames.press(ShipKey::Left);
    frames.release(ShipKey::Left);
    frames.frame(FRAME);
    assert!(!frames.keys().left);
    assert_eq!(frames.sim.ship_position(), Some(Vector3::new(0.0, 0.0, 0.0)));
}

#[test]
fn held_key_keeps_moving_until_released() {
    let mut frames = Frames::with_ready_ship(&seeded_config(1));
    frames.press(ShipKey::Left);
    frames.frame(FRAME);
    frames.frame(FRAME);
    frames.release(ShipKey::Left);
    frames.frame(FRAME);
    let position = frames.sim.ship_position().unwrap();
    assert!((position.x + 0.2).abs() < 1e-6);
}
