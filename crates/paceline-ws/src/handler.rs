use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use paceline_core::error::CoreError;
use paceline_core::events::{join_frame, system_frame};
use paceline_core::{conversation, message, AppState};
use paceline_models::realtime::ChatCommand;
use tokio::sync::mpsc;

use crate::session::Session;

pub async fn handle_connection(socket: WebSocket, state: AppState, user_id: i64) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let conn_id = state.rooms.register();
    let session = Session::new(user_id, conn_id);
    tracing::debug!(user_id, conn_id, "chat socket connected");

    // All outbound traffic for this connection funnels through one channel;
    // the broker and the command loop both write to it, a single task owns
    // the sink.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if ws_tx.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(incoming)) = ws_rx.next().await {
        let raw = match incoming {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            // Pings are answered by axum; binary and pong frames are noise.
            _ => continue,
        };

        let Some(command) = ChatCommand::decode(&raw) else {
            tracing::debug!(user_id, conn_id, "ignoring malformed chat frame");
            continue;
        };

        if let Err(err) = dispatch_command(&state, &session, &out_tx, command).await {
            let _ = out_tx.send(system_frame(&err.to_string()));
        }
    }

    state.rooms.leave(conn_id);
    writer.abort();
    tracing::debug!(user_id, conn_id, "chat socket disconnected");
}

async fn dispatch_command(
    state: &AppState,
    session: &Session,
    out_tx: &mpsc::UnboundedSender<String>,
    command: ChatCommand,
) -> Result<(), CoreError> {
    let peer_id = command.peer_id().ok_or(CoreError::InvalidId)?;

    match command {
        ChatCommand::Join { .. } => {
            let conv = conversation::resolve_conversation(
                &state.db,
                state.config.next_id(),
                session.user_id,
                peer_id,
            )
            .await?;

            state.rooms.join(session.conn_id, conv.id, out_tx.clone());
            let _ = out_tx.send(join_frame(conv.id));
            Ok(())
        }
        ChatCommand::Message { text, .. } => {
            // Empty text is dropped without an error frame; anything else
            // invalid is reported back to the sender.
            match paceline_util::validation::validate_message_text(&text) {
                Err(paceline_util::validation::ValidationError::Empty) => {
                    tracing::debug!(user_id = session.user_id, "dropping empty chat message");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
                Ok(_) => {}
            }

            let conv = conversation::resolve_conversation(
                &state.db,
                state.config.next_id(),
                session.user_id,
                peer_id,
            )
            .await?;

            let event = message::append_message(
                &state.db,
                state.config.next_id(),
                conv.id,
                session.user_id,
                &text,
            )
            .await?;

            // The sender hears the message back through the room like
            // everyone else; a sender not joined anywhere still succeeds.
            state.rooms.broadcast(conv.id, &event.to_frame());
            Ok(())
        }
    }
}
