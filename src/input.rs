//! Keyboard input for steering the ship.
//!
//! Key presses and releases are queued as [`KeyEvent`]s while winit delivers
//! them. Once per frame the queue is drained into an immutable [`KeyState`]
//! snapshot which is handed to the simulation. Events are applied in arrival
//! order, so the last event for a key before the frame wins.

use winit::{
    event::{ElementState, KeyEvent as WinitKeyEvent},
    keyboard::Key,
};

/// The four keys the ship reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShipKey {
    Forward,
    Back,
    Left,
    Right,
}

impl ShipKey {
    /// `w`, `s`, `a` and `d` as typed. Upper case letters are ignored.
    pub fn from_character(c: &str) -> Option<Self> {
        match c {
            "w" => Some(Self::Forward),
            "s" => Some(Self::Back),
            "a" => Some(Self::Left),
            "d" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(c) => Self::from_character(c.as_str()),
            _ => None,
        }
    }
}

/// A single press or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: ShipKey,
    pub pressed: bool,
}

/// Which steering keys are held at the start of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    pub fn is_pressed(&self, key: ShipKey) -> bool {
        match key {
            ShipKey::Forward => self.forward,
            ShipKey::Back => self.back,
            ShipKey::Left => self.left,
            ShipKey::Right => self.right,
        }
    }

    /// Returns a copy with `event` applied.
    pub fn with(mut self, event: KeyEvent) -> Self {
        let flag = match event.key {
            ShipKey::Forward => &mut self.forward,
            ShipKey::Back => &mut self.back,
            ShipKey::Left => &mut self.left,
            ShipKey::Right => &mut self.right,
        };
        *flag = event.pressed;
        self
    }
}

/// Key events received since the last frame.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: Vec<KeyEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: KeyEvent) {
        self.events.push(event);
    }

    /// Queue a winit keyboard event if it concerns one of the steering keys.
    ///
    /// Returns `true` if the event was queued.
    pub fn handle_keyboard_input(&mut self, event: &WinitKeyEvent) -> bool {
        match ShipKey::from_key(&event.logical_key) {
            Some(key) => {
                self.push(KeyEvent {
                    key,
                    pressed: event.state == ElementState::Pressed,
                });
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Apply all queued events on top of `previous` and empty the queue.
    pub fn drain(&mut self, previous: KeyState) -> KeyState {
        self.events
            .drain(..)
            .fold(previous, |state, event| state.with(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: ShipKey) -> KeyEvent {
        KeyEvent { key, pressed: true }
    }

    fn release(key: ShipKey) -> KeyEvent {
        KeyEvent {
            key,
            pressed: false,
        }
    }

    #[test]
    fn maps_wasd() {
        assert_eq!(ShipKey::from_character("w"), Some(ShipKey::Forward));
        assert_eq!(ShipKey::from_character("s"), Some(ShipKey::Back));
        assert_eq!(ShipKey::from_character("a"), Some(ShipKey::Left));
        assert_eq!(ShipKey::from_character("d"), Some(ShipKey::Right));
        assert_eq!(ShipKey::from_character("W"), None);
        assert_eq!(ShipKey::from_character("q"), None);
    }

    #[test]
    fn maps_winit_character_keys() {
        let key = Key::Character("d".into());
        assert_eq!(ShipKey::from_key(&key), Some(ShipKey::Right));
        let key = Key::Named(winit::keyboard::NamedKey::ArrowUp);
        assert_eq!(ShipKey::from_key(&key), None);
    }

    #[test]
    fn press_then_release_before_frame_is_released() {
        let mut queue = InputQueue::new();
        queue.push(press(ShipKey::Forward));
        queue.push(release(ShipKey::Forward));
        let keys = queue.drain(KeyState::default());
        assert!(!keys.forward);
        assert!(queue.is_empty());
    }

    #[test]
    fn held_keys_persist_across_frames() {
        let mut queue = InputQueue::new();
        queue.push(press(ShipKey::Left));
        let keys = queue.drain(KeyState::default());
        assert!(keys.left);
        let keys = queue.drain(keys);
        assert!(keys.left);
        queue.push(release(ShipKey::Left));
        let keys = queue.drain(keys);
        assert!(!keys.left);
    }

    #[test]
    fn keys_are_independent() {
        let mut queue = InputQueue::new();
        queue.push(press(ShipKey::Forward));
        queue.push(press(ShipKey::Right));
        queue.push(release(ShipKey::Forward));
        let keys = queue.drain(KeyState::default());
        assert_eq!(
            keys,
            KeyState {
                forward: false,
                back: false,
                left: false,
                right: true,
            }
        );
        assert!(keys.is_pressed(ShipKey::Right));
    }
}
