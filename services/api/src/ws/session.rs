//! Manages the WebSocket connection lifecycle for a lesson session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{
    models::{LessonInfo, LessonStatus},
    state::AppState,
};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use island_core::session::LessonSession;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Every connection gets its own lesson, started right away. The lesson is
/// owned by this task and torn down when the socket closes.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    info!("New WebSocket connection. Starting lesson...");

    let (mut socket_tx, socket_rx) = socket.split();

    let mut session = state.new_session(state.completion_client().await);
    let initialized = ServerMessage::Initialized {
        session_id,
        lesson: LessonInfo::from(&state.roster),
        state: LessonStatus::from(session.state()),
        demo_mode: !session.has_completion_client(),
    };
    if send_msg(&mut socket_tx, initialized).await.is_err() {
        error!("Failed to send Initialized message to client.");
        return;
    }
    session.start();

    if let Err(e) = run_lesson_session(&state, &mut session, &mut socket_tx, socket_rx).await {
        error!(error = ?e, "Lesson session terminated with error.");
    }
    session.shutdown();
    info!(
        messages = session.transcript().len(),
        phase = %session.state().current_phase,
        "Lesson session finished."
    );
}

/// The main event loop for an active lesson.
///
/// Client messages and lesson events are handled as they arrive; the lesson
/// itself never blocks on the socket.
async fn run_lesson_session(
    state: &AppState,
    session: &mut LessonSession,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
) -> Result<()> {
    loop {
        tokio::select! {
            msg_result = socket_rx.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::UserMessage { text }) => {
                            session.set_completion_client(state.completion_client().await);
                            if let Err(e) = session.respond_to_user_input(&text) {
                                warn!(error = %e, "Rejected user message.");
                                send_msg(socket_tx, ServerMessage::Error { message: e.to_string() }).await?;
                            }
                        }
                        Ok(ClientMessage::AdvancePhase) => {
                            if session.advance_phase().is_none() {
                                debug!("Advance requested at the final phase; ignoring.");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Ignoring malformed client message.");
                            send_msg(socket_tx, ServerMessage::Error { message: format!("Unrecognised message: {}", e) }).await?;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the connection. Shutting down lesson.");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            Some(event) = session.next_event() => {
                send_msg(socket_tx, event.into()).await?;
            },
        }
    }
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{config::Config, router::create_router, state::AppState};
    use futures_util::{SinkExt, StreamExt};
    use island_core::{
        credential::MemoryCredentialStore, llm_client::CompletionSettings,
        response_bank::ResponseBank,
    };
    use serde_json::{Value, json};
    use std::{sync::Arc, time::Duration};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
    };

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect() -> Client {
        let state = AppState::new(
            Config::for_tests(),
            ResponseBank::desert_island(),
            CompletionSettings::default(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(Arc::new(state)))
                .await
                .unwrap();
        });

        let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        client
    }

    async fn send(client: &mut Client, msg: Value) {
        client
            .send(WsMessage::text(msg.to_string()))
            .await
            .unwrap();
    }

    /// Reads server messages until one matches `wanted`.
    async fn wait_for(client: &mut Client, wanted: impl Fn(&Value) -> bool) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = client.next().await.unwrap().unwrap();
                let WsMessage::Text(text) = frame else { continue };
                let msg: Value = serde_json::from_str(text.as_str()).unwrap();
                if wanted(&msg) {
                    return msg;
                }
            }
        })
        .await
        .expect("timed out waiting for server message")
    }

    #[tokio::test]
    async fn test_lesson_over_websocket() {
        let mut client = connect().await;

        let init = wait_for(&mut client, |_| true).await;
        assert_eq!(init["type"], "initialized");
        assert_eq!(init["demo_mode"], true);
        assert_eq!(init["state"]["phase"], "intro");

        // With pacing off the scripted phases run straight through to planning.
        wait_for(&mut client, |m| m["type"] == "phase_changed" && m["to"] == "planning").await;

        send(&mut client, json!({"type": "user_message", "text": "   "})).await;
        let error = wait_for(&mut client, |m| m["type"] == "error").await;
        assert_eq!(error["message"], "Message text is empty");

        send(&mut client, json!({"type": "user_message", "text": "Let's build a raft"})).await;
        let echoed = wait_for(&mut client, |m| {
            m["type"] == "message_appended" && m["message"]["content"] == "Let's build a raft"
        })
        .await;
        assert_eq!(echoed["message"]["sender"]["role"], "end_user");
        wait_for(&mut client, |m| {
            m["type"] == "message_appended" && m["message"]["sender"]["role"] == "facilitator"
        })
        .await;

        send(&mut client, json!({"type": "advance_phase"})).await;
        let change = wait_for(&mut client, |m| m["type"] == "phase_changed").await;
        assert_eq!(change["from"], "planning");
        assert_eq!(change["to"], "summary");
        assert_eq!(change["is_complete"], true);
    }

    #[tokio::test]
    async fn test_malformed_client_message_is_reported() {
        let mut client = connect().await;
        wait_for(&mut client, |m| m["type"] == "initialized").await;

        send(&mut client, json!({"type": "shout"})).await;
        let error = wait_for(&mut client, |m| m["type"] == "error").await;
        assert!(
            error["message"]
                .as_str()
                .unwrap()
                .starts_with("Unrecognised message")
        );
    }
}
