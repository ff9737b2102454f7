use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{protocol::message::ServerMessage, state::AppState};

/// Upgrade to the streaming protocol
///
/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One session per socket: a writer task drains the session's outbound queue
/// in order while this task reads commands.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.explorer.channel_capacity);

    let session = state.sessions.create(tx).await;
    let session_id = session.id().to_string();
    let dispatcher = state.dispatcher();

    let writer_id = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            tracing::trace!(session_id = %writer_id, kind = message.kind(), "Sending message");
            if let Err(e) = sink.send(Message::Text(message.to_json())).await {
                tracing::debug!(session_id = %writer_id, error = %e, "Socket write failed");
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatcher.handle_text(&session, &text).await,
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; binary frames carry no commands
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "Socket read failed");
                break;
            }
        }
    }

    state.sessions.remove(&session_id).await;
    writer.abort();
}
