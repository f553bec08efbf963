use glam::Vec3;

use crate::world::Transformer;

/// Interaction range around a transformer, in world units.
pub const DEFAULT_INTERACTION_RADIUS: f32 = 3.0;

/// Anything the player can target with the interact key.
pub trait Interactable {
    fn position(&self) -> Vec3;
    fn is_active(&self) -> bool;
}

impl Interactable for Transformer {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_active(&self) -> bool {
        self.repairable
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityDetector {
    radius: f32,
}

impl Default for ProximityDetector {
    fn default() -> Self {
        Self::new(DEFAULT_INTERACTION_RADIUS)
    }
}

impl ProximityDetector {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn distance_to<T: Interactable>(&self, player: Vec3, target: &T) -> f32 {
        player.distance(target.position())
    }

    /// Index of the first active target strictly inside the radius, in list
    /// order. Does not mutate anything; the caller deactivates the target.
    pub fn find_target<T: Interactable>(&self, player: Vec3, targets: &[T]) -> Option<usize> {
        targets.iter().position(|target| {
            target.is_active() && self.distance_to(player, target) < self.radius
        })
    }

    /// Closest active target regardless of range, with its distance.
    pub fn nearest<T: Interactable>(&self, player: Vec3, targets: &[T]) -> Option<(usize, f32)> {
        targets
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_active())
            .map(|(idx, target)| (idx, self.distance_to(player, target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
