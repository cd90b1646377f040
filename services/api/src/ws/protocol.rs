//! Defines the WebSocket message protocol between the browser client and the API server.

use crate::models::{ChatMessage, LessonInfo, LessonStatus, PhaseTransition, SenderInfo};
use island_core::session::SessionEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chat message typed by the end-user.
    UserMessage { text: String },
    /// Moves the lesson on to its next phase.
    AdvancePhase,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once the lesson has been set up, before any other message.
    Initialized {
        session_id: Uuid,
        lesson: LessonInfo,
        state: LessonStatus,
        /// True when no AI credential is configured and every reply is scripted.
        demo_mode: bool,
    },
    TypingStarted { sender: SenderInfo },
    TypingStopped { sender: SenderInfo },
    MessageAppended { message: ChatMessage },
    PhaseChanged {
        #[serde(flatten)]
        change: PhaseTransition,
    },
    /// Reports a rejected client message. The lesson keeps running.
    Error { message: String },
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::TypingStarted { sender } => ServerMessage::TypingStarted {
                sender: (&sender).into(),
            },
            SessionEvent::TypingStopped { sender } => ServerMessage::TypingStopped {
                sender: (&sender).into(),
            },
            SessionEvent::MessageAppended { message } => ServerMessage::MessageAppended {
                message: (&message).into(),
            },
            SessionEvent::PhaseChanged { change } => ServerMessage::PhaseChanged {
                change: change.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use island_core::phase::{LessonPhase, PhaseChange};
    use island_core::roster::Roster;
    use serde_json::json;

    #[test]
    fn test_client_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "user_message", "text": "I would find shelter"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::UserMessage {
                text: "I would find shelter".to_string()
            }
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "advance_phase"}"#).unwrap();
        assert_eq!(msg, ClientMessage::AdvancePhase);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "init"}"#).is_err());
    }

    #[test]
    fn test_phase_changed_is_flat() {
        let event = SessionEvent::PhaseChanged {
            change: PhaseChange {
                from: LessonPhase::Planning,
                to: LessonPhase::Summary,
                is_complete: true,
            },
        };
        let json = serde_json::to_value(ServerMessage::from(event)).unwrap();
        assert_eq!(
            json,
            json!({"type": "phase_changed", "from": "planning", "to": "summary", "is_complete": true})
        );
    }

    #[test]
    fn test_typing_event_carries_sender() {
        let roster = Roster::desert_island();
        let event = SessionEvent::TypingStarted {
            sender: roster.participants()[1].clone(),
        };
        let json = serde_json::to_value(ServerMessage::from(event)).unwrap();
        assert_eq!(json["type"], "typing_started");
        assert_eq!(json["sender"]["name"], "Lucas");
        assert_eq!(json["sender"]["role"], "participant");
    }
}
