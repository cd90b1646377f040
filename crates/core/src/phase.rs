use serde::{Deserialize, Serialize};
use std::fmt;

/// A named stage of the lesson. Variants are declared in lesson order, so
/// the derived `Ord` matches the order the lesson moves through them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LessonPhase {
    Intro,
    Scenario,
    Discussion,
    Planning,
    Summary,
}

impl LessonPhase {
    /// Every phase in lesson order.
    pub const ALL: [LessonPhase; 5] = [
        LessonPhase::Intro,
        LessonPhase::Scenario,
        LessonPhase::Discussion,
        LessonPhase::Planning,
        LessonPhase::Summary,
    ];

    /// The phase that follows this one, or `None` for the terminal phase.
    pub fn next(self) -> Option<LessonPhase> {
        match self {
            LessonPhase::Intro => Some(LessonPhase::Scenario),
            LessonPhase::Scenario => Some(LessonPhase::Discussion),
            LessonPhase::Discussion => Some(LessonPhase::Planning),
            LessonPhase::Planning => Some(LessonPhase::Summary),
            LessonPhase::Summary => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LessonPhase::Intro => "intro",
            LessonPhase::Scenario => "scenario",
            LessonPhase::Discussion => "discussion",
            LessonPhase::Planning => "planning",
            LessonPhase::Summary => "summary",
        }
    }

    /// Short description of what the class is working on in this phase,
    /// passed to the completion service as the current topic.
    pub fn topic(self) -> &'static str {
        match self {
            LessonPhase::Intro => "Meeting the team and getting ready for the adventure",
            LessonPhase::Scenario => "Shipwrecked on a mysterious desert island",
            LessonPhase::Discussion => "What would you do first on the island?",
            LessonPhase::Planning => "Building a step-by-step team survival plan",
            LessonPhase::Summary => "Reflecting on the entrepreneurial skills we used",
        }
    }
}

impl fmt::Display for LessonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forward move from one phase to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    pub from: LessonPhase,
    pub to: LessonPhase,
    pub is_complete: bool,
}

/// Progress of a single lesson session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonState {
    pub current_phase: LessonPhase,
    /// Position in the current phase's participant rotation.
    pub participant_index: usize,
    pub is_complete: bool,
}

impl Default for LessonState {
    fn default() -> Self {
        Self {
            current_phase: LessonPhase::Intro,
            participant_index: 0,
            is_complete: false,
        }
    }
}

impl LessonState {
    /// Moves to the next phase and resets the rotation.
    ///
    /// Returns `None` without touching the state when already at the
    /// terminal phase. Entering the terminal phase marks the lesson complete.
    pub fn advance(&mut self) -> Option<PhaseChange> {
        let from = self.current_phase;
        let to = from.next()?;
        self.current_phase = to;
        self.participant_index = 0;
        self.is_complete = to.is_terminal();
        Some(PhaseChange {
            from,
            to,
            is_complete: self.is_complete,
        })
    }
}
