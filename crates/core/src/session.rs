//! Lesson Session
//!
//! Drives a [`LessonSequencer`] in time. Scripted steps, typing holds and
//! scripted replies are entries in one [`Agenda`]; remote replies run in a
//! `JoinSet`. Everything is consumed from a single task through
//! [`LessonSession::next_event`], so no state is shared or locked.

use crate::agenda::{Agenda, StepId};
use crate::llm_client::{CompletionClient, CompletionError};
use crate::phase::{LessonPhase, LessonState, PhaseChange};
use crate::roster::{Roster, Sender, SenderRole};
use crate::script::{Action, Step, lesson_script};
use crate::sequencer::{InputError, LessonSequencer};
use crate::transcript::{Message, Transcript};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Something the presentation layer should render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TypingStarted { sender: Sender },
    TypingStopped { sender: Sender },
    MessageAppended { message: Message },
    PhaseChanged { change: PhaseChange },
}

/// Longest wait any single step is held for, whatever the scale.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Simulated latencies. They only affect pacing, never what is said.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub facilitator_typing: Duration,
    pub participant_typing: Duration,
    /// Wait before a scripted reply to the end-user starts typing.
    pub reply_delay: Duration,
    /// Multiplier applied to every delay. `0.0` makes everything immediate.
    pub scale: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            facilitator_typing: Duration::from_millis(1500),
            participant_typing: Duration::from_millis(1000),
            reply_delay: Duration::from_millis(1500),
            scale: 1.0,
        }
    }
}

impl Pacing {
    pub fn instant() -> Self {
        Self::scaled(0.0)
    }

    pub fn scaled(scale: f64) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Scales `delay`, capped at [`MAX_DELAY`].
    pub fn apply(&self, delay: Duration) -> Duration {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.scale)
            .map_or(MAX_DELAY, |scaled| scaled.min(MAX_DELAY))
    }

    fn typing_for(&self, role: SenderRole) -> Duration {
        match role {
            SenderRole::Participant => self.apply(self.participant_typing),
            _ => self.apply(self.facilitator_typing),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Script,
    Reply,
}

#[derive(Debug)]
enum Task {
    Script(Action),
    Commit {
        speaker: String,
        text: String,
        lane: Lane,
    },
    ScriptedReply,
}

pub struct LessonSession {
    sequencer: LessonSequencer,
    client: Option<Arc<dyn CompletionClient>>,
    pacing: Pacing,
    agenda: Agenda<Task>,
    script: VecDeque<Step>,
    /// The agenda entry currently holding the script lane, if any.
    script_entry: Option<StepId>,
    replies: JoinSet<Result<String, CompletionError>>,
    outbox: VecDeque<SessionEvent>,
    typing: Vec<String>,
    closed: bool,
}

impl LessonSession {
    pub fn new(sequencer: LessonSequencer, pacing: Pacing) -> Self {
        Self {
            sequencer,
            client: None,
            pacing,
            agenda: Agenda::new(),
            script: VecDeque::new(),
            script_entry: None,
            replies: JoinSet::new(),
            outbox: VecDeque::new(),
            typing: Vec::new(),
            closed: false,
        }
    }

    pub fn with_completion_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Swaps the completion client. Replies already in flight finish with
    /// the old one.
    pub fn set_completion_client(&mut self, client: Option<Arc<dyn CompletionClient>>) {
        self.client = client;
    }

    pub fn has_completion_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn state(&self) -> &LessonState {
        self.sequencer.state()
    }

    pub fn transcript(&self) -> &Transcript {
        self.sequencer.transcript()
    }

    pub fn roster(&self) -> &Roster {
        self.sequencer.roster()
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True when `next_event` has nothing left to yield.
    pub fn is_idle(&self) -> bool {
        self.outbox.is_empty()
            && (self.closed || (self.agenda.is_empty() && self.replies.is_empty()))
    }

    /// The scheduled step currently holding the script, for cancellation.
    pub fn pending_script_step(&self) -> Option<StepId> {
        self.script_entry
    }

    /// Opens the lesson: welcome message, then the current phase's script.
    /// Only the first call does anything.
    pub fn start(&mut self) {
        if self.closed {
            return;
        }
        let Some(welcome) = self.sequencer.begin() else {
            debug!(phase = %self.sequencer.phase(), "Lesson already started; ignoring start");
            return;
        };
        self.outbox
            .push_back(SessionEvent::MessageAppended { message: welcome });
        if self.client.is_none() {
            info!("No AI credential configured; replies will be scripted");
        }
        self.queue_phase_script(self.sequencer.phase());
    }

    /// Moves the lesson on by one phase. What was left of the old phase's
    /// script is dropped and the new phase's script is queued. No-op at
    /// the terminal phase.
    pub fn advance_phase(&mut self) -> Option<PhaseChange> {
        if self.closed {
            return None;
        }
        let change = self.sequencer.advance_phase()?;
        self.script.clear();
        // A line already being typed is allowed to land.
        if let Some(id) = self.script_entry {
            if matches!(self.agenda.get(id), Some(Task::Script(_))) {
                self.agenda.cancel(id);
                self.script_entry = None;
            }
        }
        self.on_phase_changed(change);
        Some(change)
    }

    /// Appends the end-user's message right away, then arranges exactly one
    /// facilitator reply: remote if a completion client is set, scripted
    /// otherwise or if the remote call fails.
    pub fn respond_to_user_input(&mut self, text: &str) -> Result<Message, InputError> {
        if self.closed {
            return Err(InputError::SessionClosed);
        }
        let message = self.sequencer.record_user_input(text)?;
        self.outbox.push_back(SessionEvent::MessageAppended {
            message: message.clone(),
        });

        match &self.client {
            Some(client) => {
                let client = Arc::clone(client);
                let prompt = message.content.clone();
                let context = self.sequencer.completion_context();
                debug!(phase = %context.lesson_phase, "Requesting remote facilitator reply");
                self.replies
                    .spawn(async move { client.complete(&prompt, &context).await });
            }
            None => {
                let due = Instant::now() + self.pacing.apply(self.pacing.reply_delay);
                self.agenda.schedule(due, Task::ScriptedReply);
            }
        }
        Ok(message)
    }

    /// Cancels one scheduled step. Cancelling a line mid-typing clears the
    /// typing flag; cancelling the script's current step lets the next one
    /// take its place.
    pub fn cancel(&mut self, id: StepId) -> bool {
        let Some(task) = self.agenda.cancel(id) else {
            return false;
        };
        if let Task::Commit { speaker, .. } = &task {
            self.stop_typing(speaker);
        }
        if self.script_entry == Some(id) {
            self.script_entry = None;
            self.schedule_next_step();
        }
        true
    }

    /// Tears the session down: every pending step is cancelled and remote
    /// calls in flight are aborted. Nothing is appended afterwards.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let cancelled = self.agenda.len() + self.script.len();
        self.clear_script();
        self.agenda.clear();
        self.replies.abort_all();
        self.typing.clear();
        self.outbox.clear();
        info!(cancelled, "Lesson session shut down");
    }

    /// Waits for and returns the next event, or `None` once the session is
    /// idle or closed.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing,
    /// so it can sit in a `tokio::select!` beside other sources.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(event);
            }
            if self.closed {
                return None;
            }
            let next_due = self.agenda.next_due();
            if next_due.is_none() && self.replies.is_empty() {
                return None;
            }

            tokio::select! {
                _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    self.fire_due();
                }
                Some(joined) = self.replies.join_next(), if !self.replies.is_empty() => {
                    self.on_reply(joined);
                }
                else => return None,
            }
        }
    }

    fn fire_due(&mut self) {
        let Some((id, task)) = self.agenda.pop_due(Instant::now()) else {
            return;
        };
        if self.script_entry == Some(id) {
            self.script_entry = None;
        }
        match task {
            Task::Script(action) => self.run_action(action),
            Task::Commit {
                speaker,
                text,
                lane,
            } => {
                self.commit(&speaker, text);
                if lane == Lane::Script {
                    self.schedule_next_step();
                }
            }
            Task::ScriptedReply => {
                let facilitator = self.facilitator_id();
                let text = self.sequencer.scripted_line(&facilitator);
                self.begin_typing(&facilitator, text, Lane::Reply);
            }
        }
    }

    fn run_action(&mut self, action: Action) {
        debug!(?action, phase = %self.sequencer.phase(), "Running script step");
        match action {
            Action::Say { speaker, line } => {
                let text = self.sequencer.resolve_line(&speaker, &line);
                self.begin_typing(&speaker, text, Lane::Script);
            }
            Action::NextParticipant => {
                self.sequencer.next_participant();
                self.schedule_next_step();
            }
            Action::AdvancePhase => match self.sequencer.advance_phase() {
                Some(change) => self.on_phase_changed(change),
                None => self.schedule_next_step(),
            },
        }
    }

    fn on_reply(&mut self, joined: Result<Result<String, CompletionError>, JoinError>) {
        let facilitator = self.facilitator_id();
        let text = match joined {
            Ok(Ok(text)) => text,
            Ok(Err(error)) => {
                warn!(%error, "Completion failed; using a scripted reply");
                self.sequencer.scripted_line(&facilitator)
            }
            Err(error) if error.is_cancelled() => return,
            Err(error) => {
                warn!(%error, "Completion task panicked; using a scripted reply");
                self.sequencer.scripted_line(&facilitator)
            }
        };
        self.begin_typing(&facilitator, text, Lane::Reply);
    }

    fn on_phase_changed(&mut self, change: PhaseChange) {
        self.outbox
            .push_back(SessionEvent::PhaseChanged { change });
        self.queue_phase_script(change.to);
    }

    fn queue_phase_script(&mut self, phase: LessonPhase) {
        let steps = lesson_script(phase, self.sequencer.roster());
        self.script.extend(steps);
        self.schedule_next_step();
    }

    fn schedule_next_step(&mut self) {
        if self.closed || self.script_entry.is_some() {
            return;
        }
        if let Some(step) = self.script.pop_front() {
            let due = Instant::now() + self.pacing.apply(step.delay);
            self.script_entry = Some(self.agenda.schedule(due, Task::Script(step.action)));
        }
    }

    fn clear_script(&mut self) {
        self.script.clear();
        if let Some(id) = self.script_entry.take() {
            self.agenda.cancel(id);
        }
    }

    fn begin_typing(&mut self, speaker: &str, text: String, lane: Lane) {
        let Some(sender) = self.sequencer.sender(speaker).cloned() else {
            warn!(speaker, "Skipping line from a sender outside the roster");
            if lane == Lane::Script {
                self.schedule_next_step();
            }
            return;
        };
        let hold = self.pacing.typing_for(sender.role);
        if hold.is_zero() {
            self.commit(speaker, text);
            if lane == Lane::Script {
                self.schedule_next_step();
            }
            return;
        }
        let already_typing = self.typing.contains(&sender.id);
        self.typing.push(sender.id.clone());
        if !already_typing {
            self.outbox.push_back(SessionEvent::TypingStarted { sender });
        }

        let id = self.agenda.schedule(
            Instant::now() + hold,
            Task::Commit {
                speaker: speaker.to_string(),
                text,
                lane,
            },
        );
        if lane == Lane::Script {
            self.script_entry = Some(id);
        }
    }

    fn commit(&mut self, speaker: &str, text: String) {
        self.stop_typing(speaker);
        if let Some(message) = self.sequencer.say(speaker, text) {
            self.outbox
                .push_back(SessionEvent::MessageAppended { message });
        }
    }

    /// Releases one typing hold. The indicator only stops once the speaker
    /// has no line left in progress.
    fn stop_typing(&mut self, speaker: &str) {
        let Some(pos) = self.typing.iter().position(|id| id == speaker) else {
            return;
        };
        self.typing.remove(pos);
        if self.typing.iter().any(|id| id == speaker) {
            return;
        }
        if let Some(sender) = self.sequencer.sender(speaker).cloned() {
            self.outbox.push_back(SessionEvent::TypingStopped { sender });
        }
    }

    fn facilitator_id(&self) -> String {
        self.sequencer.roster().facilitator().id.clone()
    }
}

impl Drop for LessonSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
