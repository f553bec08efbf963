use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EncounterId(pub u64);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress through one fuse repair. Fuse slots are inspectable from
/// `LineDeEnergized` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    NotStarted,
    LineDeEnergized,
    BlownFuseIdentified,
    FuseReplaced,
    Complete,
}

impl RepairStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RepairStage::NotStarted => "not_started",
            RepairStage::LineDeEnergized => "line_de_energized",
            RepairStage::BlownFuseIdentified => "blown_fuse_identified",
            RepairStage::FuseReplaced => "fuse_replaced",
            RepairStage::Complete => "complete",
        }
    }
}

impl fmt::Display for RepairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One button on the repair panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    OpenCutout,
    Inspect(usize),
    ReplaceFuse,
    CloseCutout,
    /// "Continue": performs whatever the current stage expects next.
    Advance,
}

impl RepairAction {
    pub fn label(self) -> String {
        match self {
            RepairAction::OpenCutout => "Open Cut-out Switch".to_string(),
            RepairAction::Inspect(index) => format!("Inspect Fuse {}", index + 1),
            RepairAction::ReplaceFuse => "Replace Blown Fuse".to_string(),
            RepairAction::CloseCutout => "Close Cut-out Switch".to_string(),
            RepairAction::Advance => "Continue".to_string(),
        }
    }
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairAction::OpenCutout => f.write_str("open_cutout"),
            RepairAction::Inspect(index) => write!(f, "inspect({index})"),
            RepairAction::ReplaceFuse => f.write_str("replace_fuse"),
            RepairAction::CloseCutout => f.write_str("close_cutout"),
            RepairAction::Advance => f.write_str("advance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error("You missed a step! Make sure you've completed all tasks in order.")]
    StepsMissed,
    #[error("fuse {index} does not exist (cut-out holds {count} fuses)")]
    FuseOutOfRange { index: usize, count: usize },
    #[error("{action} is not available while the encounter is {stage}")]
    ActionNotOffered {
        action: RepairAction,
        stage: RepairStage,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    Advanced { stage: RepairStage },
    FuseIntact { index: usize },
    Unchanged,
}

/// State of a single repair on one transformer. Created when the player
/// interacts with a transformer and dropped once the panel closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairEncounter {
    id: EncounterId,
    transformer: usize,
    fuse_count: usize,
    blown_fuse_index: usize,
    is_line_de_energized: bool,
    has_identified_blown_fuse: bool,
    has_replaced_fuse: bool,
    repair_step: u32,
    stage: RepairStage,
}

impl RepairEncounter {
    pub fn new<R: Rng>(
        id: EncounterId,
        transformer: usize,
        fuse_count: usize,
        rng: &mut R,
    ) -> Self {
        let fuse_count = fuse_count.max(1);
        let blown = rng.gen_range(0..fuse_count);
        Self::with_blown_fuse(id, transformer, fuse_count, blown)
    }

    /// Builds an encounter with a known blown fuse. `blown_fuse_index` must
    /// be below `fuse_count`.
    pub fn with_blown_fuse(
        id: EncounterId,
        transformer: usize,
        fuse_count: usize,
        blown_fuse_index: usize,
    ) -> Self {
        let fuse_count = fuse_count.max(1);
        debug_assert!(
            blown_fuse_index < fuse_count,
            "blown fuse {blown_fuse_index} outside {fuse_count} slots"
        );
        Self {
            id,
            transformer,
            fuse_count,
            blown_fuse_index: blown_fuse_index.min(fuse_count - 1),
            is_line_de_energized: false,
            has_identified_blown_fuse: false,
            has_replaced_fuse: false,
            repair_step: 0,
            stage: RepairStage::NotStarted,
        }
    }

    pub fn id(&self) -> EncounterId {
        self.id
    }

    pub fn transformer(&self) -> usize {
        self.transformer
    }

    pub fn fuse_count(&self) -> usize {
        self.fuse_count
    }

    pub fn blown_fuse_index(&self) -> usize {
        self.blown_fuse_index
    }

    pub fn stage(&self) -> RepairStage {
        self.stage
    }

    pub fn repair_step(&self) -> u32 {
        self.repair_step
    }

    pub fn is_line_de_energized(&self) -> bool {
        self.is_line_de_energized
    }

    pub fn has_identified_blown_fuse(&self) -> bool {
        self.has_identified_blown_fuse
    }

    pub fn has_replaced_fuse(&self) -> bool {
        self.has_replaced_fuse
    }

    pub fn is_complete(&self) -> bool {
        self.stage == RepairStage::Complete
    }

    /// Buttons the repair panel shows for the current stage. Earlier
    /// buttons stay on the panel as the repair proceeds.
    pub fn available_actions(&self) -> Vec<RepairAction> {
        let inspect = (0..self.fuse_count).map(RepairAction::Inspect);
        match self.stage {
            RepairStage::NotStarted => vec![RepairAction::OpenCutout],
            RepairStage::LineDeEnergized => inspect.collect(),
            RepairStage::BlownFuseIdentified => inspect
                .chain(std::iter::once(RepairAction::ReplaceFuse))
                .collect(),
            RepairStage::FuseReplaced => inspect
                .chain([RepairAction::ReplaceFuse, RepairAction::CloseCutout])
                .collect(),
            RepairStage::Complete => Vec::new(),
        }
    }

    pub fn apply(&mut self, action: RepairAction) -> Result<RepairOutcome, RepairError> {
        if self.is_complete() {
            return Err(self.not_offered(action));
        }
        match action {
            RepairAction::OpenCutout => Ok(self.open_cutout()),
            RepairAction::Inspect(index) => self.inspect(index),
            RepairAction::ReplaceFuse => self.replace_fuse(),
            RepairAction::CloseCutout => self.close_cutout(),
            RepairAction::Advance => self.advance(),
        }
    }

    fn open_cutout(&mut self) -> RepairOutcome {
        if self.stage != RepairStage::NotStarted {
            return RepairOutcome::Unchanged;
        }
        self.is_line_de_energized = true;
        self.transition(RepairStage::LineDeEnergized)
    }

    fn inspect(&mut self, index: usize) -> Result<RepairOutcome, RepairError> {
        if self.stage == RepairStage::NotStarted {
            return Err(self.not_offered(RepairAction::Inspect(index)));
        }
        if index >= self.fuse_count {
            return Err(RepairError::FuseOutOfRange {
                index,
                count: self.fuse_count,
            });
        }
        if index != self.blown_fuse_index {
            return Ok(RepairOutcome::FuseIntact { index });
        }
        if self.stage != RepairStage::LineDeEnergized {
            return Ok(RepairOutcome::Unchanged);
        }
        self.has_identified_blown_fuse = true;
        Ok(self.transition(RepairStage::BlownFuseIdentified))
    }

    fn replace_fuse(&mut self) -> Result<RepairOutcome, RepairError> {
        match self.stage {
            RepairStage::BlownFuseIdentified => {
                self.has_replaced_fuse = true;
                Ok(self.transition(RepairStage::FuseReplaced))
            }
            RepairStage::FuseReplaced => Ok(RepairOutcome::Unchanged),
            _ => Err(self.not_offered(RepairAction::ReplaceFuse)),
        }
    }

    fn close_cutout(&mut self) -> Result<RepairOutcome, RepairError> {
        let ordered = self.stage == RepairStage::FuseReplaced
            && self.is_line_de_energized
            && self.has_identified_blown_fuse
            && self.has_replaced_fuse;
        if !ordered {
            return Err(RepairError::StepsMissed);
        }
        Ok(self.transition(RepairStage::Complete))
    }

    fn advance(&mut self) -> Result<RepairOutcome, RepairError> {
        match self.stage {
            RepairStage::NotStarted => Ok(self.open_cutout()),
            RepairStage::LineDeEnergized => self.inspect(self.blown_fuse_index),
            RepairStage::BlownFuseIdentified => self.replace_fuse(),
            RepairStage::FuseReplaced => self.close_cutout(),
            RepairStage::Complete => Err(self.not_offered(RepairAction::Advance)),
        }
    }

    fn transition(&mut self, stage: RepairStage) -> RepairOutcome {
        log::debug!("repair {} {} -> {}", self.id, self.stage, stage);
        self.stage = stage;
        self.repair_step += 1;
        RepairOutcome::Advanced { stage }
    }

    fn not_offered(&self, action: RepairAction) -> RepairError {
        RepairError::ActionNotOffered {
            action,
            stage: self.stage,
        }
    }
}
