//! Keyboard input abstraction

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
}

/// Anything that can answer "is this key held right now"
pub trait InputSource {
    fn is_key_down(&self, key: Key) -> bool;

    /// -1 for up, 1 for down, 0 for neither or both
    fn vertical_axis(&self) -> f64 {
        match (self.is_key_down(Key::ArrowUp), self.is_key_down(Key::ArrowDown)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Held-key set fed by press and release events
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    down: HashSet<Key>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.down.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.down.remove(&key);
    }

    pub fn clear(&mut self) {
        self.down.clear();
    }
}

impl InputSource for KeyState {
    fn is_key_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }
}
