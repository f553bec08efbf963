use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use lineworker_core::{Key, RepairAction};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoSlug {
    Tutorial,
    SkipSteps,
    Walkthrough,
}

impl DemoSlug {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tutorial" => Ok(DemoSlug::Tutorial),
            "skip-steps" | "skip_steps" => Ok(DemoSlug::SkipSteps),
            "walkthrough" => Ok(DemoSlug::Walkthrough),
            _ => Err(anyhow!("unknown demo: {}", value)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DemoSlug::Tutorial => "tutorial",
            DemoSlug::SkipSteps => "skip-steps",
            DemoSlug::Walkthrough => "walkthrough",
        }
    }
}

/// One scripted chunk of player input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanSegment {
    /// Hold `keys` down for `frames` frames, then release them.
    Hold { keys: Vec<Key>, frames: u32 },
    /// Press `keys` and leave them held for the following segments.
    Press { keys: Vec<Key> },
    /// Let go of every key still held.
    Release,
    /// Steer towards a transformer until it is inside the interaction radius.
    DriveTo { transformer: usize },
    Interact,
    Action { action: RepairAction },
    /// Inspect fuses in slot order until the blown one turns up.
    InspectUntilFound,
    /// Let `seconds` of simulated time pass with no input.
    Wait { seconds: f32 },
    /// Advance the tutorial from the host side.
    AdvanceTutorial,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputPlan {
    pub label: String,
    pub segments: Vec<PlanSegment>,
}

impl InputPlan {
    pub fn demo(slug: DemoSlug) -> Self {
        let segments = match slug {
            DemoSlug::Tutorial => vec![
                PlanSegment::DriveTo { transformer: 0 },
                PlanSegment::Interact,
                PlanSegment::Action {
                    action: RepairAction::OpenCutout,
                },
                PlanSegment::InspectUntilFound,
                PlanSegment::Action {
                    action: RepairAction::ReplaceFuse,
                },
                PlanSegment::Action {
                    action: RepairAction::CloseCutout,
                },
                PlanSegment::Wait { seconds: 5.0 },
            ],
            DemoSlug::SkipSteps => vec![
                PlanSegment::DriveTo { transformer: 1 },
                PlanSegment::Interact,
                PlanSegment::Action {
                    action: RepairAction::OpenCutout,
                },
                PlanSegment::Action {
                    action: RepairAction::CloseCutout,
                },
                PlanSegment::Wait { seconds: 1.0 },
            ],
            DemoSlug::Walkthrough => {
                let mut segments = vec![
                    PlanSegment::DriveTo { transformer: 2 },
                    PlanSegment::Interact,
                ];
                segments.extend((0..4).map(|_| PlanSegment::Action {
                    action: RepairAction::Advance,
                }));
                segments.push(PlanSegment::Wait { seconds: 5.0 });
                segments
            }
        };
        Self {
            label: slug.label().to_string(),
            segments,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read input plan: {}", path.display()))?;
        let plan: InputPlan = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse input plan json: {}", path.display()))?;
        Ok(plan)
    }
}
