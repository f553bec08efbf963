use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Keys the scene listens to. Movement keys are held; `Interact` is edge
/// triggered by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    W,
    A,
    S,
    D,
    #[serde(rename = "e", alias = "interact")]
    Interact,
}

impl Key {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "w" => Some(Key::W),
            "a" => Some(Key::A),
            "s" => Some(Key::S),
            "d" => Some(Key::D),
            "e" | "interact" => Some(Key::Interact),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::Interact => "e",
        }
    }

    /// Unit direction on the ground plane; forward is -z.
    fn direction(self) -> Option<Vec3> {
        match self {
            Key::W => Some(Vec3::NEG_Z),
            Key::S => Some(Vec3::Z),
            Key::A => Some(Vec3::NEG_X),
            Key::D => Some(Vec3::X),
            Key::Interact => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct HeldKeys {
    keys: BTreeSet<Key>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the key was not already held.
    pub fn press(&mut self, key: Key) -> bool {
        self.keys.insert(key)
    }

    pub fn release(&mut self, key: Key) -> bool {
        self.keys.remove(&key)
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    /// Per-frame displacement for the held movement keys. `None` means no
    /// movement key is down; opposing keys still count as movement and yield
    /// a zero vector.
    pub fn movement_delta(&self, speed: f32) -> Option<Vec3> {
        let mut any = false;
        let mut delta = Vec3::ZERO;
        for direction in self.keys.iter().filter_map(|key| key.direction()) {
            any = true;
            delta += direction * speed;
        }
        any.then_some(delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Truck {
    pub position: Vec3,
}

impl Truck {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

/// Pole-mounted transformer the player can repair once per session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformer {
    pub id: String,
    pub label: String,
    pub position: Vec3,
    pub repairable: bool,
}

impl Transformer {
    pub fn new(id: impl Into<String>, label: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position,
            repairable: true,
        }
    }
}
