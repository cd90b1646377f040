//! The scripted beats of each lesson phase.
//!
//! A script is an ordered list of `(delay, action)` steps. The session runs
//! them strictly one after another: a step's delay starts counting only once
//! the previous step, typing hold included, has finished.

use crate::phase::LessonPhase;
use crate::roster::{EMMA, FACILITATOR_ID, LUCAS, MAX, Roster, ZOE, join_names};
use std::time::Duration;

/// What a speaker says in a scripted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Fixed(String),
    /// A random pick from the response bank for the speaker and the phase
    /// current when the step fires.
    Scripted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Say { speaker: String, line: Line },
    /// Moves the participant rotation on by one.
    NextParticipant,
    AdvancePhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub delay: Duration,
    pub action: Action,
}

impl Step {
    fn say(delay_ms: u64, speaker: &str, text: impl Into<String>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            action: Action::Say {
                speaker: speaker.to_string(),
                line: Line::Fixed(text.into()),
            },
        }
    }

    fn scripted(delay_ms: u64, speaker: &str) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            action: Action::Say {
                speaker: speaker.to_string(),
                line: Line::Scripted,
            },
        }
    }

    fn next_participant() -> Self {
        Self {
            delay: Duration::ZERO,
            action: Action::NextParticipant,
        }
    }

    fn advance(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            action: Action::AdvancePhase,
        }
    }
}

pub const WELCOME: &str = "🌟 Welcome to our Desert Island Adventure! I'm Ms. Adventure, and I'll be guiding you through this exciting entrepreneurship lesson today!";

/// Facilitator hand-offs during the discussion rotation: who is praised and
/// who is asked next.
const DISCUSSION_ROTATION: [(&str, &str); 3] = [
    (
        LUCAS,
        "That's a great idea, Emma! Safety first is always smart thinking. Lucas, what about you?",
    ),
    (
        ZOE,
        "Excellent thinking, Lucas! Being organized will definitely help. Zoe, what's your take?",
    ),
    (
        MAX,
        "Wow, Zoe! I love that adventurous spirit! Max, how about you?",
    ),
];

/// The steps queued when `phase` is entered.
pub fn lesson_script(phase: LessonPhase, roster: &Roster) -> Vec<Step> {
    match phase {
        LessonPhase::Intro => vec![
            Step::say(
                500,
                FACILITATOR_ID,
                format!(
                    "We have an amazing group of young entrepreneurs here today! Let me see... {} are all here. Are you all ready for an adventure? 🏝️",
                    join_names(&roster.participant_names())
                ),
            ),
            Step::scripted(1000, EMMA),
            Step::scripted(500, MAX),
            Step::scripted(500, ZOE),
            Step::advance(2000),
        ],
        LessonPhase::Scenario => vec![
            Step::say(500, FACILITATOR_ID, "Alright everyone, here's our adventure scenario! 🚢"),
            Step::say(
                500,
                FACILITATOR_ID,
                "Imagine this: You're on a boat trip with your friends when suddenly, your boat gets caught in a storm! The boat breaks down and you all wash up on a mysterious desert island. You're safe, but now you need to figure out what to do!",
            ),
            Step::say(
                500,
                FACILITATOR_ID,
                "This island has trees, fresh water, some fruits, and lots of interesting things to discover. The question is: What's the FIRST thing you would do? 🤔",
            ),
            Step::advance(4000),
        ],
        LessonPhase::Discussion => {
            let mut steps = vec![
                Step::say(
                    500,
                    FACILITATOR_ID,
                    "Let's hear from everyone! Emma, what would YOU do first if you found yourself on this island? 🌴",
                ),
                Step::scripted(500, EMMA),
            ];
            for (next, handoff) in DISCUSSION_ROTATION {
                steps.push(Step::say(1000, FACILITATOR_ID, handoff));
                steps.push(Step::scripted(1500, next));
                steps.push(Step::next_participant());
            }
            steps.push(Step::advance(2000));
            steps
        }
        LessonPhase::Planning => vec![
            Step::say(
                500,
                FACILITATOR_ID,
                "Fantastic ideas, everyone! I'm hearing themes about safety, exploration, organization, and teamwork. These are all key entrepreneurial skills! 💡",
            ),
            Step::say(
                500,
                FACILITATOR_ID,
                "Now, let's work together as a team. Can you create a plan that combines all these great ideas? What would be your step-by-step survival and exploration plan?",
            ),
        ],
        LessonPhase::Summary => vec![Step::scripted(500, FACILITATOR_ID)],
    }
}
