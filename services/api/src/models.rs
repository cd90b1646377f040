//! API Models
//!
//! Wire shapes for the REST and WebSocket surfaces, with `utoipa` schemas for
//! the OpenAPI document. They are built from the lesson engine's types and
//! never leak the API key.

use chrono::{DateTime, Utc};
use island_core::{
    phase::{LessonPhase, LessonState, PhaseChange},
    roster::{Roster, Sender, SenderRole},
    transcript::Message,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const LESSON_TITLE: &str = "Desert Island Adventure";

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SenderInfo {
    #[schema(example = "kid1")]
    pub id: String,
    #[schema(example = "Emma")]
    pub name: String,
    #[schema(example = "participant")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
}

impl From<&Sender> for SenderInfo {
    fn from(sender: &Sender) -> Self {
        let role = match sender.role {
            SenderRole::Facilitator => "facilitator",
            SenderRole::Participant => "participant",
            SenderRole::EndUser => "end_user",
        };
        Self {
            id: sender.id.clone(),
            name: sender.name.clone(),
            role: role.to_string(),
            avatar: sender.avatar.clone(),
            personality: sender.personality.clone(),
        }
    }
}

/// The lesson as shown before it starts.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct LessonInfo {
    #[schema(example = "Desert Island Adventure")]
    pub title: String,
    pub facilitator: SenderInfo,
    pub participants: Vec<SenderInfo>,
    #[schema(example = json!(["intro", "scenario", "discussion", "planning", "summary"]))]
    pub phases: Vec<String>,
}

impl From<&Roster> for LessonInfo {
    fn from(roster: &Roster) -> Self {
        Self {
            title: LESSON_TITLE.to_string(),
            facilitator: roster.facilitator().into(),
            participants: roster.participants().iter().map(SenderInfo::from).collect(),
            phases: LessonPhase::ALL
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct LessonStatus {
    #[schema(example = "intro")]
    pub phase: String,
    pub participant_index: usize,
    pub is_complete: bool,
}

impl From<&LessonState> for LessonStatus {
    fn from(state: &LessonState) -> Self {
        Self {
            phase: state.current_phase.as_str().to_string(),
            participant_index: state.participant_index,
            is_complete: state.is_complete,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub content: String,
    pub sender: SenderInfo,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            sender: (&message.sender).into(),
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PhaseTransition {
    #[schema(example = "intro")]
    pub from: String,
    #[schema(example = "scenario")]
    pub to: String,
    pub is_complete: bool,
}

impl From<PhaseChange> for PhaseTransition {
    fn from(change: PhaseChange) -> Self {
        Self {
            from: change.from.as_str().to_string(),
            to: change.to.as_str().to_string(),
            is_complete: change.is_complete,
        }
    }
}

/// Whether a credential is configured. The key itself is never returned.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CredentialStatus {
    pub configured: bool,
    #[schema(example = "openai")]
    pub provider: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCredentialPayload {
    #[schema(example = "openai")]
    pub provider: String,
    #[schema(example = "sk-...")]
    pub api_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use island_core::roster::{EMMA, END_USER_ID};
    use island_core::transcript::Transcript;

    #[test]
    fn test_lesson_info_from_roster() {
        let info = LessonInfo::from(&Roster::desert_island());
        assert_eq!(info.title, LESSON_TITLE);
        assert_eq!(info.facilitator.role, "facilitator");
        assert_eq!(info.participants.len(), 6);
        assert_eq!(info.participants[0].id, EMMA);
        assert!(info.participants[0].avatar.is_some());
        assert_eq!(info.phases.first().map(String::as_str), Some("intro"));
        assert_eq!(info.phases.last().map(String::as_str), Some("summary"));
    }

    #[test]
    fn test_chat_message_serialization() {
        let mut transcript = Transcript::new();
        let message = transcript
            .append(Roster::desert_island().end_user().clone(), "I would find shelter")
            .clone();

        let json = serde_json::to_value(ChatMessage::from(&message)).unwrap();
        assert_eq!(json["content"], "I would find shelter");
        assert_eq!(json["sender"]["id"], END_USER_ID);
        assert_eq!(json["sender"]["role"], "end_user");
        assert!(json["sender"].get("avatar").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_lesson_status_from_state() {
        let mut state = LessonState::default();
        for _ in 0..4 {
            state.advance();
        }
        let status = LessonStatus::from(&state);
        assert_eq!(status.phase, "summary");
        assert!(status.is_complete);
    }

    #[test]
    fn test_update_credential_payload_missing_field() {
        let result: Result<UpdateCredentialPayload, _> =
            serde_json::from_str(r#"{"provider": "openai"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Invalid API key format".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Invalid API key format"}"#);
    }
}
