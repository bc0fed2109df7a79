//! Relay connection over tokio-tungstenite
//!
//! One background task owns the socket: it writes queued client events,
//! forwards decoded server events, and sends heartbeats at the interval the
//! relay announces in `hello`.

use std::time::Duration;

use async_trait::async_trait;
use chat_core::protocol::{ClientEvent, ServerEvent, UserOnlinePayload};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::RelayLink;
use crate::error::{ClientError, ClientResult};

const OUTBOUND_BUFFER: usize = 64;
const INBOUND_BUFFER: usize = 256;

/// Handle to a live relay connection
#[derive(Debug)]
pub struct WsRelayLink {
    outbound: mpsc::Sender<ClientEvent>,
    task: JoinHandle<()>,
}

impl WsRelayLink {
    /// Connect to `url` (e.g. `ws://127.0.0.1:5000/gateway`) and announce the
    /// user; returns the link and the stream of server events
    pub async fn connect(
        url: &str,
        announce: UserOnlinePayload,
    ) -> ClientResult<(Self, mpsc::Receiver<ServerEvent>)> {
        let (stream, _) = connect_async(url).await?;
        let (mut sink, mut source) = stream.split();

        write_event(&mut sink, &ClientEvent::UserOnline(announce)).await?;

        let (outbound, mut outbound_rx) = mpsc::channel::<ClientEvent>(OUTBOUND_BUFFER);
        let (inbound_tx, inbound) = mpsc::channel::<ServerEvent>(INBOUND_BUFFER);

        let task = tokio::spawn(async move {
            let mut heartbeat: Option<Interval> = None;

            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => {
                        let Some(event) = outgoing else {
                            let _ = sink.close().await;
                            break;
                        };
                        if let Err(e) = write_event(&mut sink, &event).await {
                            tracing::warn!(error = %e, "Relay write failed");
                            break;
                        }
                    }
                    incoming = source.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let event = match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => event,
                                Err(e) => {
                                    tracing::warn!(error = %e, "Invalid server event");
                                    continue;
                                }
                            };
                            if let ServerEvent::Hello(hello) = &event {
                                let period = Duration::from_millis(hello.heartbeat_interval.max(1));
                                heartbeat = Some(interval_at(Instant::now() + period, period));
                            }
                            if inbound_tx.send(event).await.is_err() {
                                let _ = sink.close().await;
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::debug!(frame = ?frame, "Relay closed connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Relay read failed");
                            break;
                        }
                        None => break,
                    },
                    () = next_heartbeat(&mut heartbeat) => {
                        if let Err(e) = write_event(&mut sink, &ClientEvent::Heartbeat).await {
                            tracing::warn!(error = %e, "Heartbeat failed");
                            break;
                        }
                    }
                }
            }
        });

        Ok((Self { outbound, task }, inbound))
    }

    /// Whether the background task has stopped
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the socket and wait for the background task
    pub async fn close(self) {
        drop(self.outbound);
        let _ = self.task.await;
    }
}

#[async_trait]
impl RelayLink for WsRelayLink {
    async fn send(&self, event: ClientEvent) -> ClientResult<()> {
        self.outbound
            .send(event)
            .await
            .map_err(|_| ClientError::Disconnected)
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn write_event<S>(sink: &mut S, event: &ClientEvent) -> ClientResult<()>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(event)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
