//! Gameplay core for the lineworker training scene.
//!
//! The crate owns everything the scene needs besides rendering: the truck and
//! transformer model, the proximity check that picks an interaction target,
//! the onboarding tutorial, the fuse-repair encounter and the deferred tasks
//! that auto-hide overlay panels. Hosts drive a [`Session`] one frame at a
//! time and read the [`Overlay`] back to draw it.

pub mod config;
pub mod overlay;
pub mod proximity;
pub mod repair;
pub mod scheduler;
pub mod session;
pub mod tutorial;
pub mod world;

pub use config::SessionConfig;
pub use overlay::{Alert, AlertKind, Overlay, RepairPanel, TutorialBox};
pub use proximity::{Interactable, ProximityDetector, DEFAULT_INTERACTION_RADIUS};
pub use repair::{
    EncounterId, RepairAction, RepairEncounter, RepairError, RepairOutcome, RepairStage,
};
pub use scheduler::{DeferredTask, ScheduledTask, TaskFate, TaskId, TaskQueue, TaskRecord};
pub use session::{FrameReport, InteractOutcome, Session, SessionError, SessionSnapshot};
pub use tutorial::{TutorialProgress, TutorialStep, TutorialTrigger};
pub use world::{HeldKeys, Key, Transformer, Truck};
