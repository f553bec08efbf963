use anyhow::{anyhow, bail, ensure, Result};
use glam::Vec3;
use lineworker_core::{
    AlertKind, InteractOutcome, Key, RepairAction, RepairOutcome, Session, SessionError,
};
use serde::Serialize;

use crate::plan::{InputPlan, PlanSegment};

const MOVEMENT_KEYS: [Key; 4] = [Key::W, Key::A, Key::S, Key::D];

/// Fraction of the interaction radius the driver aims for, so float drift
/// cannot leave the truck sitting exactly on the boundary.
const ARRIVAL_FACTOR: f32 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct MovementSample {
    pub frame: u64,
    pub position: [f32; 3],
    pub tutorial_step: usize,
}

/// Feeds an [`InputPlan`] into a [`Session`] frame by frame and prints a
/// transcript of what the overlay would show.
pub struct Runner {
    session: Session,
    frame_dt: f32,
    max_frames: u64,
    verbose: bool,
    samples: Vec<MovementSample>,
    printed_events: usize,
    last_tutorial_text: Option<String>,
    last_panel_text: Option<String>,
}

impl Runner {
    pub fn new(session: Session, frame_dt: f32, max_frames: u64, verbose: bool) -> Self {
        Self {
            session,
            frame_dt,
            max_frames,
            verbose,
            samples: Vec::new(),
            printed_events: 0,
            last_tutorial_text: None,
            last_panel_text: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn samples(&self) -> &[MovementSample] {
        &self.samples
    }

    pub fn run(&mut self, plan: &InputPlan) -> Result<()> {
        self.session.log_event(format!("demo.start {}", plan.label));
        self.flush();
        for segment in &plan.segments {
            self.run_segment(segment)?;
            self.flush();
        }
        self.session.log_event(format!("demo.end {}", plan.label));
        self.flush();
        Ok(())
    }

    fn run_segment(&mut self, segment: &PlanSegment) -> Result<()> {
        match segment {
            PlanSegment::Hold { keys, frames } => {
                for key in keys {
                    self.session.key_down(*key);
                }
                for _ in 0..*frames {
                    self.step()?;
                }
                for key in keys {
                    self.session.key_up(*key);
                }
            }
            PlanSegment::Press { keys } => {
                for key in keys {
                    self.session.key_down(*key);
                }
            }
            PlanSegment::Release => {
                let held: Vec<Key> = self.session.held_keys().iter().collect();
                for key in held {
                    self.session.key_up(key);
                }
            }
            PlanSegment::DriveTo { transformer } => self.drive_to(*transformer)?,
            PlanSegment::Interact => {
                if let Some(outcome) = self.session.key_down(Key::Interact) {
                    describe_interaction(outcome);
                }
            }
            PlanSegment::Action { action } => {
                self.press(*action);
            }
            PlanSegment::InspectUntilFound => self.inspect_until_found()?,
            PlanSegment::Wait { seconds } => {
                let frames = (seconds / self.frame_dt).ceil().max(0.0) as u64;
                for _ in 0..frames {
                    self.step()?;
                }
            }
            PlanSegment::AdvanceTutorial => {
                self.session.advance_tutorial();
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        ensure!(
            self.session.frame() < self.max_frames,
            "input plan exceeded {} frames",
            self.max_frames
        );
        let report = self.session.tick(self.frame_dt);
        let position = self.session.truck_position().to_array();
        if self.verbose {
            println!(
                "frame {:>5} {:.3},{:.3},{:.3}",
                report.frame, position[0], position[1], position[2]
            );
        }
        self.samples.push(MovementSample {
            frame: report.frame,
            position,
            tutorial_step: self.session.tutorial().step(),
        });
        self.flush();
        Ok(())
    }

    fn drive_to(&mut self, index: usize) -> Result<()> {
        let target = self
            .session
            .transformers()
            .get(index)
            .map(|transformer| transformer.position)
            .ok_or_else(|| anyhow!("transformer {index} does not exist"))?;
        let arrival = self.session.detector().radius() * ARRIVAL_FACTOR;
        let speed = self.session.config().move_speed;

        loop {
            let offset = target - self.session.truck_position();
            if offset.length() < arrival {
                break;
            }
            let wanted = steering_keys(offset, speed);
            if wanted.is_empty() {
                bail!(
                    "transformer {index} is out of reach from the ground ({:.2} units away)",
                    offset.length()
                );
            }
            for key in MOVEMENT_KEYS {
                if wanted.contains(&key) {
                    self.session.key_down(key);
                } else {
                    self.session.key_up(key);
                }
            }
            self.step()?;
        }

        for key in MOVEMENT_KEYS {
            self.session.key_up(key);
        }
        Ok(())
    }

    fn inspect_until_found(&mut self) -> Result<()> {
        let count = self
            .session
            .encounter()
            .map(|encounter| encounter.fuse_count())
            .ok_or(SessionError::NoActiveEncounter)?;
        for index in 0..count {
            let outcome = self.session.dispatch(RepairAction::Inspect(index))?;
            self.flush();
            if matches!(
                outcome,
                RepairOutcome::Advanced { .. } | RepairOutcome::Unchanged
            ) {
                return Ok(());
            }
        }
        bail!("inspected {count} fuses without finding the blown one")
    }

    /// Dispatches a panel button. Rejections are part of the transcript,
    /// not fatal: scripted plans exercise the warning paths on purpose.
    fn press(&mut self, action: RepairAction) {
        match self.session.dispatch(action) {
            Ok(_) => {}
            // Surfaced through the overlay alert.
            Err(SessionError::Repair(lineworker_core::RepairError::StepsMissed)) => {}
            Err(err) => println!("!! {action} rejected: {err}"),
        }
    }

    fn flush(&mut self) {
        let events = self.session.events();
        for event in &events[self.printed_events..] {
            println!("{event}");
        }
        self.printed_events = events.len();

        let overlay = self.session.overlay();
        let tutorial_text = overlay
            .tutorial
            .visible
            .then(|| overlay.tutorial.text.clone());
        if tutorial_text != self.last_tutorial_text {
            if let Some(text) = tutorial_text.as_deref() {
                println!("[tutorial] {text}");
            }
            self.last_tutorial_text = tutorial_text;
        }

        let panel_text = overlay.repair.as_ref().map(|panel| panel.step_text.clone());
        if panel_text != self.last_panel_text {
            if let Some(text) = panel_text.as_deref() {
                println!("[repair] {text}");
            }
            self.last_panel_text = panel_text;
        }

        for alert in self.session.overlay_mut().take_alerts() {
            let label = match alert.kind {
                AlertKind::Warning => "warning",
                AlertKind::Notice => "notice",
            };
            println!("[{label}] {}", alert.message);
        }
    }
}

fn describe_interaction(outcome: InteractOutcome) {
    match outcome {
        InteractOutcome::Opened { .. } => {}
        InteractOutcome::NothingInRange => println!("-- no repairable transformer in range"),
        InteractOutcome::EncounterInProgress => println!("-- a repair is already open"),
        InteractOutcome::Locked => println!("-- drive the truck before interacting"),
    }
}

/// Movement keys that close the ground-plane gap in `offset`.
fn steering_keys(offset: Vec3, speed: f32) -> Vec<Key> {
    let deadband = speed * 0.5;
    let mut keys = Vec::new();
    if offset.x > deadband {
        keys.push(Key::D);
    } else if offset.x < -deadband {
        keys.push(Key::A);
    }
    if offset.z > deadband {
        keys.push(Key::S);
    } else if offset.z < -deadband {
        keys.push(Key::W);
    }
    keys
}

#[cfg(test)]
mod tests {
    use lineworker_core::{RepairStage, SessionConfig};

    use super::*;
    use crate::plan::DemoSlug;

    fn runner(seed: u64) -> Runner {
        let config = SessionConfig {
            seed: Some(seed),
            ..SessionConfig::default()
        };
        Runner::new(Session::new(config).expect("session"), 1.0 / 60.0, 20_000, false)
    }

    #[test]
    fn steering_picks_keys_by_sign() {
        assert_eq!(steering_keys(Vec3::new(-5.0, 0.0, -5.0), 0.1), vec![Key::A, Key::W]);
        assert_eq!(steering_keys(Vec3::new(5.0, 0.0, 0.01), 0.1), vec![Key::D]);
        assert!(steering_keys(Vec3::new(0.0, 6.0, 0.0), 0.1).is_empty());
    }

    #[test]
    fn tutorial_demo_completes_first_repair() {
        for seed in 0..6 {
            let mut runner = runner(seed);
            runner
                .run(&InputPlan::demo(DemoSlug::Tutorial))
                .expect("tutorial demo");
            let session = runner.session();
            assert_eq!(session.tutorial().step(), 3, "seed {seed}");
            assert!(!session.transformers()[0].repairable);
            assert!(session.encounter().is_none(), "panel should auto-close");
            assert!(session.events().iter().any(|e| e == "repair.close 0"));
        }
    }

    #[test]
    fn skip_steps_demo_leaves_repair_open() {
        let mut runner = runner(11);
        runner
            .run(&InputPlan::demo(DemoSlug::SkipSteps))
            .expect("skip-steps demo");
        let session = runner.session();
        assert_eq!(
            session.encounter().map(|e| e.stage()),
            Some(RepairStage::LineDeEnergized)
        );
        assert_eq!(session.tutorial().step(), 2);
        assert!(session
            .events()
            .iter()
            .any(|e| e.starts_with("repair.steps_missed")));
    }

    #[test]
    fn walkthrough_uses_continue_only() {
        let mut runner = runner(5);
        runner
            .run(&InputPlan::demo(DemoSlug::Walkthrough))
            .expect("walkthrough demo");
        assert!(!runner.session().transformers()[2].repairable);
        assert_eq!(runner.session().tutorial().step(), 3);
    }

    #[test]
    fn unreachable_transformer_is_an_error() {
        let config = SessionConfig::from_json_str(
            r#"{ "seed": 1, "transformers": [ { "position": [0.0, 7.0, -10.0] } ] }"#,
        )
        .expect("config");
        let session = Session::new(config).expect("session");
        let mut runner = Runner::new(session, 1.0 / 60.0, 5_000, false);
        let plan = InputPlan {
            label: "tall".into(),
            segments: vec![PlanSegment::DriveTo { transformer: 0 }],
        };
        assert!(runner.run(&plan).is_err());
    }

    #[test]
    fn samples_record_every_frame() {
        let mut runner = runner(2);
        let plan = InputPlan {
            label: "hold".into(),
            segments: vec![PlanSegment::Hold {
                keys: vec![Key::W],
                frames: 10,
            }],
        };
        runner.run(&plan).expect("hold");
        assert_eq!(runner.samples().len(), 10);
        assert!((runner.samples()[9].position[2] + 1.0).abs() < 1e-4);
        assert_eq!(runner.samples()[0].tutorial_step, 1);
    }

    #[test]
    fn pressed_keys_stay_down_until_released() {
        let mut runner = runner(4);
        let plan = InputPlan {
            label: "press".into(),
            segments: vec![
                PlanSegment::Press {
                    keys: vec![Key::D, Key::W],
                },
                PlanSegment::Wait { seconds: 0.5 },
                PlanSegment::Release,
                PlanSegment::Wait { seconds: 0.5 },
            ],
        };
        runner.run(&plan).expect("press and release");

        let session = runner.session();
        assert_eq!(session.held_keys().iter().count(), 0);
        let end = session.truck().position;
        assert!((end.x - 3.0).abs() < 1e-3, "x was {}", end.x);
        assert!((end.z + 3.0).abs() < 1e-3, "z was {}", end.z);
        assert_eq!(runner.samples().len(), 60);
        assert_eq!(runner.samples()[29].position, runner.samples()[59].position);
    }
}
