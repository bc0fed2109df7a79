//! WebSocket handler
//!
//! One upgraded socket runs three tasks: a reader that decodes and dispatches
//! client events, a writer that drains the connection's outbound queue, and a
//! heartbeat monitor.

use crate::connection::Connection;
use crate::handlers::{error_context, HandlerError, MessageDispatcher, PresenceHandler};
use crate::protocol::{decode_frame, CloseCode, FrameError};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chat_core::protocol::{HelloPayload, ServerEvent};
use chat_core::Snowflake;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// How long the writer may keep flushing after the reader has stopped
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lower bound for the heartbeat check period
const MIN_HEARTBEAT_CHECK: Duration = Duration::from_millis(10);

type WsSink = SplitSink<WebSocket, Message>;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let relay = state.config().relay.clone();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(relay.outbound_buffer);
    let connection = state.connections().add_connection(tx);
    let connection_id = connection.id();

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = ServerEvent::Hello(HelloPayload {
        heartbeat_interval: relay.heartbeat_interval_ms,
    });
    if !write_event(&mut ws_sink, &hello).await {
        tracing::warn!(connection_id = %connection_id, "Failed to send hello");
        cleanup_connection(&state, &connection).await;
        return;
    }

    // Reader
    let recv_state = state.clone();
    let recv_connection = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            let close_code = match msg {
                Ok(Message::Text(text)) => {
                    handle_text_message(&recv_state, &recv_connection, &text).await
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %recv_connection.id(),
                        "Binary frames not supported"
                    );
                    Some(CloseCode::DecodeError)
                }
                // Pong is handled automatically by axum
                Ok(Message::Ping(_) | Message::Pong(_)) => None,
                Ok(Message::Close(_)) => {
                    tracing::debug!(
                        connection_id = %recv_connection.id(),
                        "Client closed connection"
                    );
                    return;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %recv_connection.id(),
                        error = %e,
                        "WebSocket read error"
                    );
                    return;
                }
            };

            if let Some(code) = close_code {
                recv_connection.close(code);
                return;
            }
        }
    });

    // Writer
    let send_connection = Arc::clone(&connection);
    let mut closing = connection.closing();
    let mut send_task = tokio::spawn(async move {
        loop {
            if *closing.borrow_and_update() {
                break;
            }
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if !write_event(&mut ws_sink, &event).await {
                        return;
                    }
                }
                changed = closing.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        // Events queued before the close request still go out, ahead of the close frame
        while let Ok(event) = rx.try_recv() {
            if !write_event(&mut ws_sink, &event).await {
                return;
            }
        }

        if let Some(code) = send_connection.close_code() {
            let (code, reason) = code.close_frame();
            let frame = CloseFrame {
                code,
                reason: reason.into(),
            };
            let _ = ws_sink.send(Message::Close(Some(frame))).await;
        }
        let _ = ws_sink.close().await;
    });

    // Heartbeat monitor
    let hb_connection = Arc::clone(&connection);
    let timeout = relay.heartbeat_timeout();
    let check_every = (relay.heartbeat_interval() / 2).max(MIN_HEARTBEAT_CHECK);
    let heartbeat_task = tokio::spawn(async move {
        let mut ticker = interval(check_every);
        loop {
            ticker.tick().await;

            let time_since = hb_connection.time_since_heartbeat();
            if time_since > timeout {
                tracing::warn!(
                    connection_id = %hb_connection.id(),
                    time_since_ms = time_since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                hb_connection.close(CloseCode::SessionTimeout);
                break;
            }
        }
    });

    let send_finished = tokio::select! {
        _ = &mut recv_task => false,
        _ = &mut send_task => true,
    };

    heartbeat_task.abort();

    if send_finished {
        stop_task(recv_task).await;
    } else {
        connection.shutdown();
        if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
            tracing::debug!(connection_id = %connection_id, "Writer did not finish in time");
            send_task.abort();
        }
    }

    cleanup_connection(&state, &connection).await;
}

/// Abort `task` and wait until it is no longer running
///
/// An abort only lands at the task's next yield point; a dispatch in the
/// middle of a poll still finishes, so cleanup must wait for it.
async fn stop_task(task: JoinHandle<()>) {
    task.abort();
    let _ = task.await;
}

/// Decode and dispatch one text frame; returns the close code when the
/// connection cannot continue
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Option<CloseCode> {
    let event = match decode_frame(text) {
        Ok(event) => event,
        Err(FrameError::InvalidPayload {
            event,
            message,
            chat_id,
            nonce,
        }) => {
            let error = HandlerError::InvalidPayload(format!("{event}: {message}"));
            report_error(connection, &error, chat_id, nonce).await;
            return None;
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Failed to decode frame"
            );
            return e.to_close_code();
        }
    };

    tracing::trace!(
        connection_id = %connection.id(),
        event = event.name(),
        "Received event"
    );

    let (chat_id, nonce) = error_context(&event);
    match MessageDispatcher::dispatch(state, connection, event).await {
        Ok(close_code) => close_code,
        Err(e) => {
            if let Some(code) = e.to_close_code() {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Handler error"
                );
                return Some(code);
            }
            report_error(connection, &e, chat_id, nonce).await;
            None
        }
    }
}

/// Send an `error` event to the connection that made the failed request
async fn report_error(
    connection: &Connection,
    error: &HandlerError,
    chat_id: Option<Snowflake>,
    nonce: Option<String>,
) {
    tracing::debug!(
        connection_id = %connection.id(),
        code = error.code(),
        error = %error,
        "Request rejected"
    );
    connection
        .send(ServerEvent::Error(error.to_payload(chat_id, nonce)))
        .await;
}

/// Serialize and write one event; false when the socket is gone
async fn write_event(sink: &mut WsSink, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
            return true;
        }
    };
    sink.send(Message::Text(json)).await.is_ok()
}

/// Release everything the connection held
///
/// Typing indicators are cleared in the rooms it left before presence is
/// updated, so peers never see an offline user still typing.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    state.connections().remove_connection(connection.id());
    let rooms_left = state.rooms().leave_all(connection.id());

    if let Some(user_id) = connection.user_id() {
        state.typing().connection_closed(user_id, &rooms_left);
    }
    PresenceHandler::disconnect(state, connection).await;

    tracing::info!(
        connection_id = %connection.id(),
        user_id = ?connection.user_id(),
        close_code = ?connection.close_code(),
        rooms = rooms_left.len(),
        age_ms = connection.age().as_millis(),
        "Connection closed"
    );
}
