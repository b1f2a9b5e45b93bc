//! WebSocket endpoint for live download progress.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Keepalive probe sent by clients.
pub const PING: &str = "ping";
/// Reply to [`PING`].
pub const PONG: &str = "pong";

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Serve one session until either side goes away.
///
/// Relayed progress and client probes are handled in one loop, so a pong is
/// never stuck behind a burst of progress messages and vice versa.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (session_id, mut outbound) = state.sessions().register().await;
    info!(session_id, "WebSocket client connected");

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    debug!(session_id, "Session channel closed");
                    break;
                };
                if sender.send(Message::Text(msg.to_json().into())).await.is_err() {
                    debug!(session_id, "WebSocket send failed, client disconnected");
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str() == PING {
                        if sender.send(Message::Text(PONG.into())).await.is_err() {
                            break;
                        }
                    } else {
                        debug!(session_id, text = %text.as_str(), "Ignoring client message");
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(session_id, "WebSocket client requested close");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    }

    state.sessions().unregister(session_id).await;
    info!(session_id, "WebSocket client disconnected");
}
