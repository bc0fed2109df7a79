//! Test helpers for integration tests
//!
//! Provides an in-process gateway bound to an ephemeral port, a raw relay
//! client, and response assertions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chat_common::AppConfig;
use chat_core::protocol::{ClientEvent, PresenceStatus, ServerEvent};
use chat_core::{Snowflake, SnowflakeGenerator};
use chat_db::MemoryStore;
use chat_gateway::{serve_with_shutdown, GatewayState};
use chat_service::ServiceContext;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{seeded_store, user_online};

/// How long to wait for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: MemoryStore,
    pub state: GatewayState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a gateway over the seeded store
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()?).await
    }

    /// Start a gateway over the seeded store with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let store = seeded_store();
        let ctx = ServiceContext::memory(&store, Arc::new(SnowflakeGenerator::new(1)));
        let state = GatewayState::new(ctx, config);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let served = state.clone();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = serve_with_shutdown(listener, served, shutdown).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            store,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request as a user
    pub async fn get_as(&self, path: &str, user_id: Snowflake) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .get(&url)
            .header("X-User-Id", user_id.to_string())
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request with JSON body as a user
    pub async fn post_as<T: Serialize>(
        &self,
        path: &str,
        user_id: Snowflake,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header("X-User-Id", user_id.to_string())
            .json(body)
            .send()
            .await?)
    }

    /// Open a relay connection and consume its `hello`
    pub async fn connect(&self) -> Result<WsClient> {
        let mut client = WsClient::connect(&self.gateway_url()).await?;
        client
            .expect(|e| matches!(e, ServerEvent::Hello(_)))
            .await
            .context("no hello")?;
        Ok(client)
    }

    /// Wait until `members` connections have joined the chat's room
    pub async fn wait_for_room(&self, chat_id: Snowflake, members: usize) -> Result<()> {
        eventually(|| async move { Ok(self.state.rooms().members_of(chat_id).len() >= members) })
            .await
            .with_context(|| format!("room {chat_id} never reached {members} members"))
    }

    /// Begin graceful shutdown: stop accepting and close open sockets
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// What ended a relay connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    Code(u16),
    NoFrame,
}

/// A raw relay client speaking the JSON event protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        self.send_text(&serde_json::to_string(event)?).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next server event
    pub async fn recv(&mut self) -> Result<ServerEvent> {
        loop {
            let frame = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for event")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(frame))) => bail!("connection closed: {frame:?}"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("connection ended"),
            }
        }
    }

    /// Skip events until one matches
    pub async fn expect(&mut self, matches: impl Fn(&ServerEvent) -> bool) -> Result<ServerEvent> {
        loop {
            let event = self.recv().await?;
            if matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Identify as `user_id` and wait for the online snapshot
    pub async fn go_online(
        &mut self,
        user_id: Snowflake,
        name: &str,
    ) -> Result<Vec<PresenceStatus>> {
        self.send(&user_online(user_id, name)).await?;
        match self.expect(|e| matches!(e, ServerEvent::OnlineUsersList(_))).await? {
            ServerEvent::OnlineUsersList(list) => Ok(list),
            other => bail!("unexpected event: {other:?}"),
        }
    }

    /// Wait until the relay has handled everything sent so far
    ///
    /// Events from one connection are handled in order, so the heartbeat ack
    /// arrives after every earlier request took effect.
    pub async fn sync(&mut self) -> Result<()> {
        self.send(&ClientEvent::Heartbeat).await?;
        self.expect(|e| *e == ServerEvent::HeartbeatAck).await?;
        Ok(())
    }

    /// Assert that no matching event arrives within `window`
    pub async fn expect_none(
        &mut self,
        matches: impl Fn(&ServerEvent) -> bool,
        window: Duration,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(frame) => frame,
                Err(_) => return Ok(()),
            };
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let event: ServerEvent = serde_json::from_str(&text)?;
                    if matches(&event) {
                        bail!("unexpected event: {event:?}");
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(()),
            }
        }
    }

    /// Read until the relay closes the connection
    pub async fn closed(&mut self) -> Result<Closed> {
        loop {
            let frame = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for close")?;
            match frame {
                Some(Ok(Message::Close(Some(frame)))) => {
                    return Ok(Closed::Code(u16::from(frame.code)));
                }
                Some(Ok(Message::Close(None))) | None => return Ok(Closed::NoFrame),
                Some(Ok(_)) => {}
                Some(Err(_)) => return Ok(Closed::NoFrame),
            }
        }
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream
            .close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: WsCloseCode::Normal,
                reason: "bye".into(),
            }))
            .await?;
        Ok(())
    }
}

/// Test configuration: defaults with no database
pub fn test_config() -> Result<AppConfig> {
    config_from(&[])
}

/// Test configuration with a few variables set
pub fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    AppConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    })
    .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Poll until `check` holds or the event timeout passes
pub async fn eventually<F, Fut>(mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await? {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("condition not met in time")
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status and return the error code of the body
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: serde_json::Value = assert_json(response, expected_status).await?;
    body["error"]["code"]
        .as_str()
        .map(str::to_string)
        .context("missing error code")
}
