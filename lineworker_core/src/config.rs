use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::proximity::DEFAULT_INTERACTION_RADIUS;
use crate::tutorial::TutorialTrigger;
use crate::world::Transformer;

/// Seconds before the finished tutorial box hides itself.
pub const TUTORIAL_HIDE_DELAY: f32 = 3.0;
/// Seconds the "repair complete" panel stays up before closing.
pub const REPAIR_CLOSE_DELAY: f32 = 4.0;
/// Units per frame per held movement key.
pub const MOVE_SPEED: f32 = 0.1;
pub const FUSE_COUNT: usize = 3;

const TUTORIAL_MESSAGES: [&str; 7] = [
    "Use W A S D to drive your bucket truck.",
    "Drive near the highlighted transformer.",
    "Press E to begin the repair.",
    "De-energize the line before starting repairs.",
    "Inspect for damage and replace faulty components.",
    "Reconnect the line and energize it.",
    "Tutorial complete! You're ready for the real thing.",
];

/// Everything a [`crate::Session`] needs to lay out the scene and pace the
/// tutorial. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub interaction_radius: f32,
    pub move_speed: f32,
    pub truck_start: [f32; 3],
    pub transformers: Vec<TransformerLayout>,
    /// Ignore the interact key until the player has driven at least once.
    pub interact_requires_movement: bool,
    pub seed: Option<u64>,
    pub tutorial: TutorialConfig,
    pub repair: RepairConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            move_speed: MOVE_SPEED,
            truck_start: [0.0, 0.5, 0.0],
            transformers: [-10.0, 0.0, 10.0]
                .into_iter()
                .map(|x| TransformerLayout {
                    label: None,
                    position: [x, 0.5, -10.0],
                })
                .collect(),
            interact_requires_movement: true,
            seed: None,
            tutorial: TutorialConfig::default(),
            repair: RepairConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerLayout {
    #[serde(default)]
    pub label: Option<String>,
    /// Interaction anchor; the pole base at truck height by default.
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorialConfig {
    pub messages: Vec<String>,
    pub complete_message: String,
    /// Trigger per step; steps past the end of the list have none.
    pub triggers: Vec<Option<TutorialTrigger>>,
    pub hide_delay: f32,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            messages: TUTORIAL_MESSAGES.iter().map(|m| m.to_string()).collect(),
            complete_message: "Tutorial complete.".to_string(),
            triggers: vec![
                Some(TutorialTrigger::Moved),
                Some(TutorialTrigger::ReachedTransformer),
                Some(TutorialTrigger::RepairCompleted),
            ],
            hide_delay: TUTORIAL_HIDE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub fuse_count: usize,
    pub close_delay: f32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            fuse_count: FUSE_COUNT,
            close_delay: REPAIR_CLOSE_DELAY,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)
                    .with_context(|| format!("failed to read session config: {}", p.display()))?;
                Self::from_json_str(&raw)
                    .with_context(|| format!("failed to load session config: {}", p.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: SessionConfig =
            serde_json::from_str(raw).context("failed to parse session config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.interaction_radius > 0.0,
            "interaction_radius must be positive (got {})",
            self.interaction_radius
        );
        ensure!(
            self.move_speed >= 0.0,
            "move_speed must not be negative (got {})",
            self.move_speed
        );
        ensure!(
            !self.tutorial.messages.is_empty(),
            "tutorial needs at least one message"
        );
        ensure!(
            self.tutorial.triggers.len() <= self.tutorial.messages.len(),
            "tutorial has {} triggers for {} messages",
            self.tutorial.triggers.len(),
            self.tutorial.messages.len()
        );
        ensure!(
            self.tutorial.hide_delay >= 0.0 && self.repair.close_delay >= 0.0,
            "delays must not be negative"
        );
        ensure!(self.repair.fuse_count > 0, "repair needs at least one fuse");
        Ok(())
    }

    pub fn truck_start(&self) -> Vec3 {
        Vec3::from_array(self.truck_start)
    }

    pub fn build_transformers(&self) -> Vec<Transformer> {
        self.transformers
            .iter()
            .enumerate()
            .map(|(idx, layout)| {
                let label = layout
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("Pole {}", idx + 1));
                Transformer::new(
                    format!("transformer-{idx}"),
                    label,
                    Vec3::from_array(layout.position),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.transformers.len(), 3);
        assert_eq!(config.tutorial.messages.len(), 7);
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = SessionConfig::from_json_file(None).expect("defaults");
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SessionConfig::from_json_str(
            r#"{ "interaction_radius": 5.0, "repair": { "fuse_count": 4 }, "seed": 9 }"#,
        )
        .expect("parse");
        assert_eq!(config.interaction_radius, 5.0);
        assert_eq!(config.repair.fuse_count, 4);
        assert_eq!(config.repair.close_delay, REPAIR_CLOSE_DELAY);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.move_speed, MOVE_SPEED);
    }

    #[test]
    fn triggers_accept_nulls_for_unwired_steps() {
        let config = SessionConfig::from_json_str(
            r#"{
                "tutorial": {
                    "messages": ["a", "b", "c"],
                    "triggers": ["moved", null, "manual"]
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(
            config.tutorial.triggers,
            vec![Some(TutorialTrigger::Moved), None, Some(TutorialTrigger::Manual)]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SessionConfig::from_json_str(r#"{ "interaction_radius": 0.0 }"#).is_err());
        assert!(SessionConfig::from_json_str(r#"{ "repair": { "fuse_count": 0 } }"#).is_err());
        assert!(SessionConfig::from_json_str(r#"{ "tutorial": { "messages": [] } }"#).is_err());
    }

    #[test]
    fn reads_config_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{ "transformers": [ { "label": "Feeder", "position": [4.0, 0.5, 4.0] } ] }"#,
        )?;
        let config = SessionConfig::from_json_file(Some(&path))?;
        let transformers = config.build_transformers();
        assert_eq!(transformers.len(), 1);
        assert_eq!(transformers[0].id, "transformer-0");
        assert_eq!(transformers[0].label, "Feeder");
        assert!(transformers[0].repairable);
        Ok(())
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let err = SessionConfig::from_json_file(Some(&path)).expect_err("missing file");
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
