use serde::{Deserialize, Serialize};

use crate::config::TutorialConfig;

/// Player actions that can unlock the next tutorial step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorialTrigger {
    Moved,
    ReachedTransformer,
    RepairCompleted,
    /// Only advanced by the host calling [`TutorialProgress::advance`] or
    /// notifying `Manual` explicitly.
    Manual,
}

impl TutorialTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            TutorialTrigger::Moved => "moved",
            TutorialTrigger::ReachedTransformer => "reached_transformer",
            TutorialTrigger::RepairCompleted => "repair_completed",
            TutorialTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum TutorialStep {
    Active(usize),
    Complete,
}

/// Ordered onboarding messages with a forward-only cursor.
#[derive(Debug, Clone)]
pub struct TutorialProgress {
    messages: Vec<String>,
    complete_message: String,
    triggers: Vec<Option<TutorialTrigger>>,
    step: usize,
}

impl TutorialProgress {
    pub fn new(
        messages: Vec<String>,
        complete_message: impl Into<String>,
        triggers: Vec<Option<TutorialTrigger>>,
    ) -> Self {
        Self {
            messages,
            complete_message: complete_message.into(),
            triggers,
            step: 0,
        }
    }

    pub fn from_config(config: &TutorialConfig) -> Self {
        Self::new(
            config.messages.clone(),
            config.complete_message.clone(),
            config.triggers.clone(),
        )
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.messages.len()
    }

    pub fn state(&self) -> TutorialStep {
        if self.is_complete() {
            TutorialStep::Complete
        } else {
            TutorialStep::Active(self.step)
        }
    }

    /// Text the tutorial box should show right now.
    pub fn message(&self) -> &str {
        self.messages
            .get(self.step)
            .map(String::as_str)
            .unwrap_or(self.complete_message.as_str())
    }

    pub fn current_trigger(&self) -> Option<TutorialTrigger> {
        self.triggers.get(self.step).copied().flatten()
    }

    /// Moves forward exactly one step. Returns the new state, or `None` when
    /// the tutorial was already complete.
    pub fn advance(&mut self) -> Option<TutorialStep> {
        if self.is_complete() {
            return None;
        }
        self.step += 1;
        Some(self.state())
    }

    /// Advances only when `trigger` is what the current step waits for.
    pub fn notify(&mut self, trigger: TutorialTrigger) -> Option<TutorialStep> {
        if self.current_trigger() == Some(trigger) {
            self.advance()
        } else {
            None
        }
    }
}
