//! Lesson Dialogue Sequencer
//!
//! The synchronous heart of a lesson: it owns the lesson state and the
//! transcript and decides what gets said. Timing lives in
//! [`crate::session::LessonSession`], which calls into this type from a single
//! task.

use crate::llm_client::CompletionContext;
use crate::phase::{LessonPhase, LessonState, PhaseChange};
use crate::response_bank::ResponseBank;
use crate::roster::{Roster, Sender};
use crate::script::{Line, WELCOME};
use crate::transcript::{Message, Transcript};
use rand::rngs::StdRng;
use std::sync::Arc;

/// How many recent transcript lines are sent along with a completion request.
pub const CONTEXT_WINDOW: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Message text is empty")]
    Empty,
    #[error("The lesson session has ended")]
    SessionClosed,
}

pub struct LessonSequencer {
    state: LessonState,
    transcript: Transcript,
    roster: Roster,
    bank: Arc<ResponseBank>,
    rng: StdRng,
    started: bool,
}

impl LessonSequencer {
    pub fn new(roster: Roster, bank: Arc<ResponseBank>, rng: StdRng) -> Self {
        Self {
            state: LessonState::default(),
            transcript: Transcript::new(),
            roster,
            bank,
            rng,
            started: false,
        }
    }

    /// Starts the sequencer at `phase` instead of the intro. Used to resume
    /// a lesson part-way through. The lesson is never marked complete here;
    /// only advancing into the final phase does that.
    pub fn with_phase(mut self, phase: LessonPhase) -> Self {
        self.state = LessonState {
            current_phase: phase,
            participant_index: 0,
            is_complete: false,
        };
        self
    }

    pub fn state(&self) -> &LessonState {
        &self.state
    }

    pub fn phase(&self) -> LessonPhase {
        self.state.current_phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn bank(&self) -> &ResponseBank {
        &self.bank
    }

    /// Appends the facilitator's welcome. Only the first call does anything;
    /// the phase is left where it is.
    pub fn begin(&mut self) -> Option<Message> {
        if self.started {
            return None;
        }
        self.started = true;
        let facilitator = self.roster.facilitator().clone();
        Some(self.transcript.append(facilitator, WELCOME).clone())
    }

    pub fn has_begun(&self) -> bool {
        self.started
    }

    /// Moves to the next phase. No-op at the terminal phase.
    pub fn advance_phase(&mut self) -> Option<PhaseChange> {
        let change = self.state.advance();
        match &change {
            Some(c) => tracing::info!(from = %c.from, to = %c.to, is_complete = c.is_complete, "Lesson phase advanced"),
            None => tracing::debug!(phase = %self.state.current_phase, "Advance ignored at terminal phase"),
        }
        change
    }

    pub fn next_participant(&mut self) {
        self.state.participant_index += 1;
    }

    /// Appends the end-user's message.
    pub fn record_user_input(&mut self, text: &str) -> Result<Message, InputError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InputError::Empty);
        }
        let user = self.roster.end_user().clone();
        Ok(self.transcript.append(user, text).clone())
    }

    /// A random bank line for `speaker_id` in the current phase.
    pub fn scripted_line(&mut self, speaker_id: &str) -> String {
        let phase = self.state.current_phase;
        self.bank.pick(phase, speaker_id, &mut self.rng).to_string()
    }

    pub fn resolve_line(&mut self, speaker_id: &str, line: &Line) -> String {
        match line {
            Line::Fixed(text) => text.clone(),
            Line::Scripted => self.scripted_line(speaker_id),
        }
    }

    pub fn sender(&self, speaker_id: &str) -> Option<&Sender> {
        self.roster.find(speaker_id)
    }

    /// Appends a line from a roster member. Senders outside the roster are
    /// refused so every message has a known author.
    pub fn say(&mut self, speaker_id: &str, text: impl Into<String>) -> Option<Message> {
        let Some(sender) = self.roster.find(speaker_id).cloned() else {
            tracing::warn!(speaker_id, "Dropping line from a sender outside the roster");
            return None;
        };
        Some(self.transcript.append(sender, text).clone())
    }

    /// Lesson context for a completion request about the current moment.
    pub fn completion_context(&self) -> CompletionContext {
        let phase = self.state.current_phase;
        CompletionContext {
            lesson_phase: phase,
            participants: self.roster.participant_names(),
            previous_messages: self.transcript.recent_contents(CONTEXT_WINDOW),
            current_topic: phase.topic().to_string(),
        }
    }
}
