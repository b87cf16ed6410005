//! WebSocket transport
//!
//! One task pair per connection: the writer drains the connection's outbound
//! queue into the socket, the reader feeds binary frames to the broker.
//! Whichever ends first ends the connection, and the broker hears about it
//! exactly once.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket},
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, warn};

use crate::AppState;
use crate::connection::{ConnectionHandle, Outbound};

/// `GET /` and `GET /ws`: upgrade to the broker protocol.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max_message_bytes = state.config.websocket.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    let (conn, mut rx) = ConnectionHandle::channel(
        connection_id.clone(),
        state.config.websocket.send_channel_capacity,
    );
    let broker = state.broker.clone();
    broker.connect(&conn).await;

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let writer = async move {
        while let Some(item) = rx.recv().await {
            match item {
                Outbound::Frame(bytes) => {
                    if ws_sender.send(Message::Binary(bytes)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: Utf8Bytes::from_static(reason),
                    };
                    let _ = ws_sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    };

    let reader = async {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Binary(bytes)) => {
                    // Failures are logged and counted by the broker.
                    let _ = broker.handle_frame(&conn, &bytes).await;
                }
                Ok(Message::Text(_)) => {
                    warn!(conn_id = %conn.id(), "ignoring text frame, protocol is binary");
                }
                Ok(Message::Close(frame)) => {
                    debug!(conn_id = %conn.id(), ?frame, "peer closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(conn_id = %conn.id(), error = %e, "websocket read error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    broker.disconnect(&connection_id).await;
}
