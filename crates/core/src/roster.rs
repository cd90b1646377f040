//! The fixed cast of a lesson: the facilitator, the simulated participants,
//! and the end-user.

use serde::{Deserialize, Serialize};

pub const FACILITATOR_ID: &str = "ai-teacher";
pub const END_USER_ID: &str = "user";

pub const EMMA: &str = "kid1";
pub const LUCAS: &str = "kid2";
pub const ZOE: &str = "kid3";
pub const MAX: &str = "kid4";
pub const ARIA: &str = "kid5";
pub const SAM: &str = "kid6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Facilitator,
    Participant,
    EndUser,
}

/// Someone who can author a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub name: String,
    pub role: SenderRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
}

impl Sender {
    pub fn facilitator(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: SenderRole::Facilitator,
            avatar: None,
            personality: None,
        }
    }

    pub fn participant(id: &str, name: &str, avatar: &str, personality: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: SenderRole::Participant,
            avatar: Some(avatar.to_string()),
            personality: Some(personality.to_string()),
        }
    }

    pub fn end_user() -> Self {
        Self {
            id: END_USER_ID.to_string(),
            name: "You".to_string(),
            role: SenderRole::EndUser,
            avatar: None,
            personality: None,
        }
    }
}

/// Everyone known to a session. Message senders must come from here.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    facilitator: Sender,
    participants: Vec<Sender>,
    end_user: Sender,
}

impl Roster {
    pub fn new(facilitator: Sender, participants: Vec<Sender>, end_user: Sender) -> Self {
        Self {
            facilitator,
            participants,
            end_user,
        }
    }

    /// Ms. Adventure and the six kids of the desert island lesson.
    pub fn desert_island() -> Self {
        Self::new(
            Sender::facilitator(FACILITATOR_ID, "Ms. Adventure"),
            vec![
                Sender::participant(EMMA, "Emma", "👧", "creative and energetic"),
                Sender::participant(LUCAS, "Lucas", "👦", "logical and thoughtful"),
                Sender::participant(ZOE, "Zoe", "👧", "adventurous and bold"),
                Sender::participant(MAX, "Max", "👦", "funny and optimistic"),
                Sender::participant(ARIA, "Aria", "👧", "curious and analytical"),
                Sender::participant(SAM, "Sam", "👦", "helpful and kind"),
            ],
            Sender::end_user(),
        )
    }

    pub fn facilitator(&self) -> &Sender {
        &self.facilitator
    }

    pub fn end_user(&self) -> &Sender {
        &self.end_user
    }

    pub fn participants(&self) -> &[Sender] {
        &self.participants
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Sender> {
        std::iter::once(&self.facilitator)
            .chain(self.participants.iter())
            .chain(std::iter::once(&self.end_user))
            .find(|s| s.id == id)
    }

    /// Everyone in the session, the end-user included.
    pub fn head_count(&self) -> usize {
        self.participants.len() + 2
    }
}

/// Joins names as "A, B, and C".
pub fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}
