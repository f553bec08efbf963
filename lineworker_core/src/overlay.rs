use serde::Serialize;

use crate::repair::{RepairAction, RepairEncounter, RepairOutcome, RepairStage};

const PANEL_TITLE: &str = "Transformer Repair Tutorial";
const INTACT_FUSE: &str = "This fuse appears to be intact. Keep inspecting.";
const INSPECT_PROMPT: &str = "Click each fuse to inspect:";
pub const POWER_RESTORED: &str = "Power Restored!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TutorialBox {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairPanel {
    pub title: String,
    pub step_text: String,
    pub notes: Vec<String>,
    pub buttons: Vec<RepairAction>,
}

impl RepairPanel {
    /// Panel contents for the encounter's current stage. `outcome` tweaks
    /// the step text for feedback that does not change the stage.
    pub fn for_encounter(encounter: &RepairEncounter, outcome: Option<RepairOutcome>) -> Self {
        let stage = encounter.stage();
        let mut notes = Vec::new();
        if matches!(
            stage,
            RepairStage::LineDeEnergized
                | RepairStage::BlownFuseIdentified
                | RepairStage::FuseReplaced
        ) {
            notes.push(INSPECT_PROMPT.to_string());
        }

        let (title, step_text) = match stage {
            RepairStage::NotStarted => (
                PANEL_TITLE,
                "Step 1: De-energize the line by opening the cut-out switch.",
            ),
            RepairStage::LineDeEnergized => (PANEL_TITLE, "Step 2: Inspect the fuses for damage."),
            RepairStage::BlownFuseIdentified => (
                PANEL_TITLE,
                "Step 3: Blown fuse found. Click below to replace it.",
            ),
            RepairStage::FuseReplaced => (
                PANEL_TITLE,
                "Step 4: Re-energize the transformer by closing the cut-out switch.",
            ),
            RepairStage::Complete => {
                notes.push("You safely replaced the fuse and restored power.".to_string());
                ("Repair Complete!", "Power restored.")
            }
        };

        let step_text = match outcome {
            Some(RepairOutcome::FuseIntact { .. }) => INTACT_FUSE,
            _ => step_text,
        };

        Self {
            title: title.to_string(),
            step_text: step_text.to_string(),
            notes,
            buttons: encounter.available_actions(),
        }
    }

    pub fn button_labels(&self) -> Vec<String> {
        self.buttons.iter().map(|action| action.label()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Blocking warning the player has to acknowledge.
    Warning,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

/// What the host should draw on top of the 3D view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlay {
    pub tutorial: TutorialBox,
    pub repair: Option<RepairPanel>,
    alerts: Vec<Alert>,
}

impl Overlay {
    pub fn new(tutorial_text: impl Into<String>) -> Self {
        Self {
            tutorial: TutorialBox {
                text: tutorial_text.into(),
                visible: true,
            },
            repair: None,
            alerts: Vec::new(),
        }
    }

    pub fn set_tutorial_text(&mut self, text: impl Into<String>) {
        self.tutorial.text = text.into();
    }

    pub fn hide_tutorial(&mut self) {
        self.tutorial.visible = false;
    }

    pub fn show_repair(&mut self, panel: RepairPanel) {
        self.repair = Some(panel);
    }

    pub fn hide_repair(&mut self) {
        self.repair = None;
    }

    pub fn push_alert(&mut self, kind: AlertKind, message: impl Into<String>) {
        self.alerts.push(Alert {
            kind,
            message: message.into(),
        });
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::EncounterId;

    #[test]
    fn panel_tracks_stage_and_buttons() {
        let mut encounter = RepairEncounter::with_blown_fuse(EncounterId(0), 0, 3, 1);
        let panel = RepairPanel::for_encounter(&encounter, None);
        assert!(panel.step_text.starts_with("Step 1"));
        assert_eq!(panel.button_labels(), vec!["Open Cut-out Switch"]);

        encounter.apply(RepairAction::OpenCutout).expect("open");
        let panel = RepairPanel::for_encounter(&encounter, None);
        assert!(panel.step_text.starts_with("Step 2"));
        assert_eq!(
            panel.button_labels(),
            vec!["Inspect Fuse 1", "Inspect Fuse 2", "Inspect Fuse 3"]
        );
    }

    #[test]
    fn intact_feedback_overrides_step_text() {
        let mut encounter = RepairEncounter::with_blown_fuse(EncounterId(0), 0, 3, 2);
        encounter.apply(RepairAction::OpenCutout).expect("open");
        let outcome = encounter.apply(RepairAction::Inspect(0)).expect("inspect");
        let panel = RepairPanel::for_encounter(&encounter, Some(outcome));
        assert_eq!(panel.step_text, INTACT_FUSE);
    }

    #[test]
    fn alerts_drain_once() {
        let mut overlay = Overlay::new("hello");
        overlay.push_alert(AlertKind::Warning, "careful");
        assert_eq!(overlay.alerts().len(), 1);
        let drained = overlay.take_alerts();
        assert_eq!(drained[0].message, "careful");
        assert!(overlay.alerts().is_empty());
    }
}
