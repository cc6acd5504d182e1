use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::frame::Frame;
use super::{PushSource, Subscription};
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

enum Command {
    Subscribe { id: String, destination: String, sink: mpsc::UnboundedSender<String> },
    Unsubscribe { id: String },
}

struct ActiveSub {
    destination: String,
    sink: mpsc::UnboundedSender<String>,
}

/// STOMP client on one WebSocket connection.
///
/// The connection lives until [`PushClient::close`] or drop. When it breaks,
/// the client reconnects after a fixed delay and re-sends every active
/// subscription, so subscribers never see the reconnect.
pub struct PushClient {
    commands: mpsc::UnboundedSender<Command>,
    next_id: AtomicU64,
    connected: watch::Receiver<bool>,
    shutdown: CancellationToken,
}

impl PushClient {
    /// Starts the connection task. `url` is the raw WebSocket endpoint; the
    /// access token is appended as a query parameter on every connect.
    pub fn connect(url: Url, session: SessionStore, reconnect_delay: Duration) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected) = watch::channel(false);
        let shutdown = CancellationToken::new();
        let conn = Connection {
            url,
            session,
            reconnect_delay,
            subs: HashMap::new(),
            connected: connected_tx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(conn.run(command_rx));
        Self { commands, next_id: AtomicU64::new(0), connected, shutdown }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Resolves once the broker acknowledged the connection.
    pub async fn wait_connected(&self) -> ClientResult<()> {
        let mut rx = self.connected.clone();
        rx.wait_for(|c| *c)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Push("push connection closed".into()))
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl PushSource for PushClient {
    async fn subscribe(&self, destination: &str) -> ClientResult<Subscription> {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::Push("push client is closed".into()));
        }
        let id = format!("sub-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sink, rx) = mpsc::unbounded_channel();
        self.commands
            .send(Command::Subscribe { id: id.clone(), destination: destination.to_string(), sink })
            .map_err(|_| ClientError::Push("push connection task is gone".into()))?;
        let commands = self.commands.clone();
        Ok(Subscription::new(destination, rx, move || {
            let _ = commands.send(Command::Unsubscribe { id });
        }))
    }
}

struct Connection {
    url: Url,
    session: SessionStore,
    reconnect_delay: Duration,
    subs: HashMap<String, ActiveSub>,
    connected: watch::Sender<bool>,
    shutdown: CancellationToken,
}

enum Ended {
    Shutdown,
    Lost(String),
}

impl Connection {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            match self.open().await {
                Ok(ws) => {
                    tracing::info!(url = %self.url, "push channel connected");
                    match self.serve(ws, &mut commands).await {
                        Ended::Shutdown => break,
                        Ended::Lost(reason) => tracing::warn!("push channel lost: {}", reason),
                    }
                    self.connected.send_replace(false);
                }
                Err(e) => tracing::warn!("push connect failed: {}", e),
            }
            if !self.wait_reconnect(&mut commands).await {
                break;
            }
        }
        self.connected.send_replace(false);
        tracing::debug!("push connection task stopped");
    }

    async fn open(&self) -> ClientResult<WsStream> {
        let mut url = self.url.clone();
        let token = self.session.bearer()?;
        url.query_pairs_mut().append_pair("access_token", &token);
        let (mut ws, _) = connect_async(url.as_str()).await?;

        let host = self.url.host_str().unwrap_or("localhost").to_string();
        let connect = Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
            .header("Authorization", format!("Bearer {}", token));
        ws.send(Message::text(connect.encode())).await?;
        // The broker processes frames in order, so subscriptions can follow
        // CONNECT without waiting for CONNECTED.
        for (id, sub) in &self.subs {
            ws.send(Message::text(subscribe_frame(id, &sub.destination).encode())).await?;
        }
        Ok(ws)
    }

    /// Keeps the subscription table current while disconnected. Returns
    /// `false` when the client shut down.
    async fn wait_reconnect(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> bool {
        let sleep = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                _ = &mut sleep => return true,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.apply_offline(cmd),
                    None => return false,
                },
            }
        }
    }

    fn apply_offline(&mut self, cmd: Command) {
        match cmd {
            Command::Subscribe { id, destination, sink } => {
                self.subs.insert(id, ActiveSub { destination, sink });
            }
            Command::Unsubscribe { id } => {
                self.subs.remove(&id);
            }
        }
    }

    async fn serve(&mut self, ws: WsStream, commands: &mut mpsc::UnboundedReceiver<Command>) -> Ended {
        let (mut write, mut read) = ws.split();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = write.send(Message::text(Frame::new("DISCONNECT").encode())).await;
                    let _ = write.close().await;
                    return Ended::Shutdown;
                }
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        let _ = write.close().await;
                        return Ended::Shutdown;
                    };
                    let frame = match &cmd {
                        Command::Subscribe { id, destination, .. } => subscribe_frame(id, destination),
                        Command::Unsubscribe { id } => Frame::new("UNSUBSCRIBE").header("id", id.as_str()),
                    };
                    self.apply_offline(cmd);
                    if let Err(e) = write.send(Message::text(frame.encode())).await {
                        return Ended::Lost(e.to_string());
                    }
                }
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => return Ended::Lost("closed by server".into()),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Ended::Lost(e.to_string()),
                    };
                    let frames = match Frame::parse_all(text.as_str()) {
                        Ok(frames) => frames,
                        Err(e) => {
                            tracing::warn!("ignoring undecodable push message: {}", e);
                            continue;
                        }
                    };
                    for frame in frames {
                        if let Err(reason) = self.dispatch(frame) {
                            return Ended::Lost(reason);
                        }
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), String> {
        match frame.command.as_str() {
            "CONNECTED" => {
                tracing::debug!(version = frame.get("version").unwrap_or("?"), "STOMP session established");
                self.connected.send_replace(true);
            }
            "MESSAGE" => {
                let Some(id) = frame.get("subscription") else {
                    tracing::warn!("MESSAGE frame without subscription header");
                    return Ok(());
                };
                if let Some(sub) = self.subs.get(id) {
                    if sub.sink.send(frame.body.clone()).is_err() {
                        // Receiver dropped without its unsubscribe arriving yet.
                        tracing::debug!(id, "subscriber gone");
                    }
                }
            }
            "RECEIPT" => {}
            "ERROR" => {
                let message = frame.get("message").unwrap_or("unknown error").to_string();
                tracing::error!(body = %frame.body, "broker error: {}", message);
                return Err(message);
            }
            other => tracing::debug!(command = other, "ignoring STOMP frame"),
        }
        Ok(())
    }
}

fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new("SUBSCRIBE").header("id", id).header("destination", destination).header("ack", "auto")
}
