use anyhow::Result;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::overlay::{AlertKind, Overlay, RepairPanel, POWER_RESTORED};
use crate::proximity::ProximityDetector;
use crate::repair::{
    EncounterId, RepairAction, RepairEncounter, RepairError, RepairOutcome, RepairStage,
};
use crate::scheduler::{DeferredTask, ScheduledTask, TaskQueue};
use crate::tutorial::{TutorialProgress, TutorialStep, TutorialTrigger};
use crate::world::{HeldKeys, Key, Transformer, Truck};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no repair encounter is open")]
    NoActiveEncounter,
    #[error(transparent)]
    Repair(#[from] RepairError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InteractOutcome {
    Opened {
        transformer: usize,
        encounter: EncounterId,
    },
    NothingInRange,
    EncounterInProgress,
    /// The player has not driven yet, so the interact key is ignored.
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub moved: bool,
    pub fired: Vec<DeferredTask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub frame: u64,
    pub clock: f32,
    pub truck: Truck,
    pub tutorial_step: usize,
    pub tutorial: TutorialStep,
    pub encounter: Option<RepairEncounter>,
    pub transformers: Vec<Transformer>,
    pub overlay: Overlay,
    pub pending_tasks: Vec<ScheduledTask>,
}

/// Owns all mutable scene state and applies input to it one frame at a time.
pub struct Session {
    config: SessionConfig,
    truck: Truck,
    transformers: Vec<Transformer>,
    detector: ProximityDetector,
    tutorial: TutorialProgress,
    encounter: Option<RepairEncounter>,
    tasks: TaskQueue,
    overlay: Overlay,
    keys: HeldKeys,
    rng: StdRng,
    frame: u64,
    next_encounter: u64,
    /// Dotted event strings for transcripts and JSON logs. Not pruned; a
    /// session is expected to be short-lived.
    events: Vec<String>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tutorial = TutorialProgress::from_config(&config.tutorial);
        let overlay = Overlay::new(tutorial.message());
        Ok(Self {
            truck: Truck::new(config.truck_start()),
            transformers: config.build_transformers(),
            detector: ProximityDetector::new(config.interaction_radius),
            tutorial,
            encounter: None,
            tasks: TaskQueue::new(),
            overlay,
            keys: HeldKeys::new(),
            rng,
            frame: 0,
            next_encounter: 0,
            events: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn truck(&self) -> &Truck {
        &self.truck
    }

    pub fn transformers(&self) -> &[Transformer] {
        &self.transformers
    }

    pub fn detector(&self) -> &ProximityDetector {
        &self.detector
    }

    pub fn tutorial(&self) -> &TutorialProgress {
        &self.tutorial
    }

    pub fn encounter(&self) -> Option<&RepairEncounter> {
        self.encounter.as_ref()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut Overlay {
        &mut self.overlay
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn held_keys(&self) -> &HeldKeys {
        &self.keys
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Everything logged since the session started. Diagnostics only.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn log_event(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    pub fn key_down(&mut self, key: Key) -> Option<InteractOutcome> {
        if key == Key::Interact {
            return Some(self.interact());
        }
        self.keys.press(key);
        None
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys.release(key);
    }

    /// Runs one frame: held-key movement, then any deferred task due after
    /// `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> FrameReport {
        self.frame += 1;

        let moved = match self.keys.movement_delta(self.config.move_speed) {
            Some(delta) => {
                self.truck.translate(delta);
                true
            }
            None => false,
        };
        if moved {
            self.notify_tutorial(TutorialTrigger::Moved);
        }

        let fired = self
            .tasks
            .advance(dt)
            .into_iter()
            .map(|entry| {
                self.run_task(entry.task);
                entry.task
            })
            .collect();

        FrameReport {
            frame: self.frame,
            moved,
            fired,
        }
    }

    pub fn interact(&mut self) -> InteractOutcome {
        if self.encounter.is_some() {
            self.log_event("interact.busy");
            return InteractOutcome::EncounterInProgress;
        }
        let gated = self.config.interact_requires_movement
            && self.tutorial.step() == 0
            && !self.tutorial.is_complete();
        if gated {
            self.log_event("interact.locked");
            return InteractOutcome::Locked;
        }
        match self
            .detector
            .find_target(self.truck.position, &self.transformers)
        {
            Some(index) => self.open_encounter(index),
            None => {
                self.log_event("interact.miss");
                InteractOutcome::NothingInRange
            }
        }
    }

    /// Routes a repair panel button into the open encounter.
    pub fn dispatch(&mut self, action: RepairAction) -> Result<RepairOutcome, SessionError> {
        let encounter = self
            .encounter
            .as_mut()
            .ok_or(SessionError::NoActiveEncounter)?;
        let result = encounter.apply(action);
        let snapshot = encounter.clone();

        match result {
            Ok(outcome) => {
                self.log_event(format!("repair.action {action} {}", describe_outcome(outcome)));
                self.overlay
                    .show_repair(RepairPanel::for_encounter(&snapshot, Some(outcome)));
                if outcome == (RepairOutcome::Advanced { stage: RepairStage::Complete }) {
                    self.complete_encounter(&snapshot);
                }
                Ok(outcome)
            }
            Err(RepairError::StepsMissed) => {
                let err = RepairError::StepsMissed;
                log::warn!("repair {} closed out of order: {err}", snapshot.id());
                self.overlay.push_alert(AlertKind::Warning, err.to_string());
                self.log_event(format!("repair.steps_missed {}", snapshot.stage()));
                Err(err.into())
            }
            Err(err) => {
                self.log_event(format!("repair.rejected {action}"));
                Err(err.into())
            }
        }
    }

    /// Host hook for tutorial steps that have no built-in trigger.
    pub fn advance_tutorial(&mut self) -> Option<TutorialStep> {
        let state = self.tutorial.advance()?;
        self.on_tutorial_advanced(state);
        Some(state)
    }

    /// Cancels pending tasks and drops the open encounter.
    pub fn teardown(&mut self) {
        let cancelled = self.tasks.cancel_where(|_| true);
        self.encounter = None;
        self.overlay.hide_repair();
        self.keys.clear();
        self.log_event(format!("session.teardown cancelled={cancelled}"));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame: self.frame,
            clock: self.tasks.now(),
            truck: self.truck,
            tutorial_step: self.tutorial.step(),
            tutorial: self.tutorial.state(),
            encounter: self.encounter.clone(),
            transformers: self.transformers.clone(),
            overlay: self.overlay.clone(),
            pending_tasks: self.tasks.pending().copied().collect(),
        }
    }

    pub fn truck_position(&self) -> Vec3 {
        self.truck.position
    }

    fn open_encounter(&mut self, index: usize) -> InteractOutcome {
        self.transformers[index].repairable = false;
        self.tasks
            .cancel_where(|entry| matches!(entry.task, DeferredTask::CloseEncounter { .. }));

        let id = EncounterId(self.next_encounter);
        self.next_encounter += 1;
        let encounter =
            RepairEncounter::new(id, index, self.config.repair.fuse_count, &mut self.rng);
        self.overlay
            .show_repair(RepairPanel::for_encounter(&encounter, None));
        self.encounter = Some(encounter);

        let transformer_id = self.transformers[index].id.clone();
        log::info!("opened repair {id} on {transformer_id}");
        self.log_event(format!("repair.open {transformer_id}"));
        self.notify_tutorial(TutorialTrigger::ReachedTransformer);

        InteractOutcome::Opened {
            transformer: index,
            encounter: id,
        }
    }

    fn complete_encounter(&mut self, encounter: &RepairEncounter) {
        log::info!("repair {} complete", encounter.id());
        self.log_event(format!(
            "repair.complete {}",
            self.transformers[encounter.transformer()].id
        ));
        self.notify_tutorial(TutorialTrigger::RepairCompleted);
        self.tasks.schedule(
            self.config.repair.close_delay,
            DeferredTask::CloseEncounter {
                encounter: encounter.id(),
            },
        );
    }

    fn run_task(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::HideTutorial => {
                self.overlay.hide_tutorial();
                self.log_event("tutorial.hidden");
            }
            DeferredTask::CloseEncounter { encounter } => {
                if self.encounter.as_ref().map(RepairEncounter::id) != Some(encounter) {
                    log::debug!("ignoring stale close for repair {encounter}");
                    self.log_event(format!("repair.close.stale {}", encounter.0));
                    return;
                }
                self.encounter = None;
                self.overlay.hide_repair();
                self.overlay.push_alert(AlertKind::Notice, POWER_RESTORED);
                log::info!("closed repair {encounter}");
                self.log_event(format!("repair.close {}", encounter.0));
            }
        }
    }

    fn notify_tutorial(&mut self, trigger: TutorialTrigger) {
        if let Some(state) = self.tutorial.notify(trigger) {
            log::debug!("tutorial advanced by {}", trigger.as_str());
            self.on_tutorial_advanced(state);
        }
    }

    fn on_tutorial_advanced(&mut self, state: TutorialStep) {
        match state {
            TutorialStep::Active(step) => {
                let message = self.tutorial.message().to_string();
                self.overlay.set_tutorial_text(message);
                self.log_event(format!("tutorial.advance {step}"));
            }
            TutorialStep::Complete => {
                let message = self.tutorial.message().to_string();
                self.overlay.set_tutorial_text(message);
                self.tasks
                    .schedule(self.config.tutorial.hide_delay, DeferredTask::HideTutorial);
                self.log_event("tutorial.complete");
            }
        }
    }
}

fn describe_outcome(outcome: RepairOutcome) -> String {
    match outcome {
        RepairOutcome::Advanced { stage } => stage.to_string(),
        RepairOutcome::FuseIntact { index } => format!("intact({index})"),
        RepairOutcome::Unchanged => "unchanged".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn session() -> Session {
        let config = SessionConfig {
            seed: Some(7),
            ..SessionConfig::default()
        };
        Session::new(config).expect("session")
    }

    fn drive(session: &mut Session, key: Key, frames: u32) {
        session.key_down(key);
        for _ in 0..frames {
            session.tick(DT);
        }
        session.key_up(key);
    }

    /// Drives the truck from the start position to 2.5 units from the
    /// middle pole.
    fn approach_middle_pole(session: &mut Session) {
        drive(session, Key::W, 75);
        let distance = session
            .detector()
            .distance_to(session.truck_position(), &session.transformers()[1]);
        assert!((distance - 2.5).abs() < 0.01, "distance was {distance}");
    }

    fn finish_repair(session: &mut Session) {
        let blown = session.encounter().expect("encounter").blown_fuse_index();
        session.dispatch(RepairAction::OpenCutout).expect("open");
        session.dispatch(RepairAction::Inspect(blown)).expect("inspect");
        session.dispatch(RepairAction::ReplaceFuse).expect("replace");
        session.dispatch(RepairAction::CloseCutout).expect("close");
    }

    #[test]
    fn first_movement_advances_tutorial() {
        let mut session = session();
        assert_eq!(session.tutorial().step(), 0);

        session.key_down(Key::W);
        let report = session.tick(DT);
        assert!(report.moved);
        assert_eq!(session.tutorial().step(), 1);
        assert_eq!(
            session.overlay().tutorial.text,
            "Drive near the highlighted transformer."
        );
        assert!((session.truck_position().z + 0.1).abs() < 1e-6);

        session.tick(DT);
        assert_eq!(session.tutorial().step(), 1);
    }

    #[test]
    fn interact_is_locked_until_the_player_moves() {
        let mut session = session();
        assert_eq!(session.interact(), InteractOutcome::Locked);
        assert!(session.encounter().is_none());
    }

    #[test]
    fn approaching_a_transformer_opens_a_repair() {
        let mut session = session();
        approach_middle_pole(&mut session);
        assert_eq!(session.tutorial().step(), 1);

        let outcome = session.key_down(Key::Interact);
        assert_eq!(
            outcome,
            Some(InteractOutcome::Opened {
                transformer: 1,
                encounter: EncounterId(0),
            })
        );
        assert_eq!(session.tutorial().step(), 2);
        assert!(!session.transformers()[1].repairable);
        assert!(session.transformers()[0].repairable);
        assert!(session.overlay().repair.is_some());
        assert!(session
            .events()
            .iter()
            .any(|event| event == "repair.open transformer-1"));

        assert_eq!(session.interact(), InteractOutcome::EncounterInProgress);
    }

    #[test]
    fn interact_out_of_range_does_nothing() {
        let mut session = session();
        drive(&mut session, Key::S, 3);
        assert_eq!(session.interact(), InteractOutcome::NothingInRange);
        assert!(session.transformers().iter().all(|t| t.repairable));
    }

    #[test]
    fn completed_repair_advances_tutorial_and_auto_closes() {
        let mut session = session();
        approach_middle_pole(&mut session);
        session.interact();
        finish_repair(&mut session);

        assert_eq!(session.tutorial().step(), 3);
        assert_eq!(
            session.encounter().map(RepairEncounter::stage),
            Some(RepairStage::Complete)
        );
        assert_eq!(
            session.overlay().repair.as_ref().map(|p| p.title.as_str()),
            Some("Repair Complete!")
        );

        // Still open just before the close delay.
        for _ in 0..(3.9 / DT) as u32 {
            session.tick(DT);
        }
        assert!(session.encounter().is_some());

        for _ in 0..12 {
            session.tick(DT);
        }
        assert!(session.encounter().is_none());
        assert!(session.overlay().repair.is_none());
        assert!(!session.transformers()[1].repairable);
        let alerts = session.overlay_mut().take_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Notice);

        // The repaired transformer cannot be targeted again.
        assert_eq!(session.interact(), InteractOutcome::NothingInRange);
    }

    #[test]
    fn skipping_steps_warns_without_completing() {
        let mut session = session();
        approach_middle_pole(&mut session);
        session.interact();
        session.dispatch(RepairAction::OpenCutout).expect("open");

        let err = session
            .dispatch(RepairAction::CloseCutout)
            .expect_err("close before replacing");
        assert!(matches!(err, SessionError::Repair(RepairError::StepsMissed)));
        assert_eq!(
            session.encounter().map(RepairEncounter::stage),
            Some(RepairStage::LineDeEnergized)
        );
        assert_eq!(session.tutorial().step(), 2);
        assert_eq!(session.overlay().alerts()[0].kind, AlertKind::Warning);
        assert!(session.tasks().is_empty());
    }

    #[test]
    fn dispatch_without_encounter_fails() {
        let mut session = session();
        assert!(matches!(
            session.dispatch(RepairAction::OpenCutout),
            Err(SessionError::NoActiveEncounter)
        ));
    }

    #[test]
    fn teardown_cancels_pending_close() {
        let mut session = session();
        approach_middle_pole(&mut session);
        session.interact();
        finish_repair(&mut session);
        assert_eq!(session.tasks().len(), 1);

        session.teardown();
        assert!(session.tasks().is_empty());
        assert!(session.encounter().is_none());
        for _ in 0..600 {
            session.tick(DT);
        }
        assert!(session.overlay().alerts().is_empty());
    }

    #[test]
    fn close_for_another_encounter_is_ignored() {
        let mut session = session();
        approach_middle_pole(&mut session);
        session.interact();
        session.tasks.schedule(
            0.0,
            DeferredTask::CloseEncounter {
                encounter: EncounterId(99),
            },
        );

        let report = session.tick(DT);
        assert_eq!(report.fired.len(), 1);
        assert_eq!(
            session.encounter().map(RepairEncounter::id),
            Some(EncounterId(0))
        );
        assert!(session.overlay().repair.is_some());
        assert!(session.overlay().alerts().is_empty());
        assert!(session.events().iter().any(|e| e == "repair.close.stale 99"));
        assert!(!session.events().iter().any(|e| e == "repair.close 0"));
    }

    #[test]
    fn opening_a_repair_cancels_pending_closes() {
        let mut session = session();
        session.tasks.schedule(
            10.0,
            DeferredTask::CloseEncounter {
                encounter: EncounterId(5),
            },
        );
        session.tasks.schedule(10.0, DeferredTask::HideTutorial);
        approach_middle_pole(&mut session);
        session.interact();

        let pending: Vec<DeferredTask> = session.tasks().pending().map(|e| e.task).collect();
        assert_eq!(pending, vec![DeferredTask::HideTutorial]);
        assert!(session.encounter().is_some());
    }

    #[test]
    fn manual_tutorial_advance_reaches_completion_and_hides() {
        let mut session = session();
        for _ in 0..7 {
            session.advance_tutorial();
        }
        assert!(session.tutorial().is_complete());
        assert_eq!(session.overlay().tutorial.text, "Tutorial complete.");
        assert_eq!(session.advance_tutorial(), None);

        for _ in 0..((3.0 / DT) as u32 + 2) {
            session.tick(DT);
        }
        assert!(!session.overlay().tutorial.visible);
        assert!(session.events().iter().any(|e| e == "tutorial.hidden"));
    }

    #[test]
    fn only_first_transformer_in_range_is_opened() {
        let config = SessionConfig::from_json_str(
            r#"{
                "seed": 3,
                "interact_requires_movement": false,
                "transformers": [
                    { "position": [1.0, 0.5, 0.0] },
                    { "position": [-1.0, 0.5, 0.0] }
                ]
            }"#,
        )
        .expect("config");
        let mut session = Session::new(config).expect("session");
        assert!(matches!(
            session.interact(),
            InteractOutcome::Opened { transformer: 0, .. }
        ));
        assert!(session.transformers()[1].repairable);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut session = session();
        approach_middle_pole(&mut session);
        session.interact();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.tutorial_step, 2);
        assert_eq!(snapshot.frame, 75);
        assert!(snapshot.encounter.is_some());
        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(json["encounter"]["stage"], "not_started");
    }
}
