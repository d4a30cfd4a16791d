//! Websocket event stream.
//!
//! `WebSocketEventSource::open` spawns one reader task per session. The task
//! owns the socket, reconnects with exponential backoff, normalizes every
//! text frame into a `WorkflowEvent`, and forwards `ChannelSignal`s over an
//! mpsc channel. Malformed frames are logged and skipped.
//!
//! The stream carries no sequence numbers: events sent while disconnected are
//! lost. Consumers re-sync from a snapshot after each `Connected` that
//! follows a `Disconnected`.

use crate::config::{ClientConfig, ReconnectConfig};
use crate::dto::parse_event;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use stagewatch_core::credential::CredentialProvider;
use stagewatch_core::error::NetworkErrorKind;
use stagewatch_core::session::{ChannelSignal, EventChannel, EventSource};
use stagewatch_core::{Result, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

const SIGNAL_BUFFER: usize = 256;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens websocket event channels at `<ws_base>/ws/{session_id}`.
#[derive(Clone)]
pub struct WebSocketEventSource {
    ws_base: String,
    credentials: Arc<dyn CredentialProvider>,
    reconnect: ReconnectConfig,
}

impl WebSocketEventSource {
    pub fn new(
        ws_base: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            ws_base: ws_base.into().trim_end_matches('/').to_string(),
            credentials,
            reconnect,
        }
    }

    pub fn from_config(config: &ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::new(config.ws_base(), credentials, config.reconnect.clone())
    }

    fn url_for(&self, session_id: &str) -> String {
        format!("{}/ws/{}", self.ws_base, session_id)
    }
}

#[async_trait]
impl EventSource for WebSocketEventSource {
    async fn open(&self, session_id: &str) -> Result<Box<dyn EventChannel>> {
        let channel = WebSocketEventChannel::connect(
            session_id,
            self.url_for(session_id),
            Arc::clone(&self.credentials),
            self.reconnect.clone(),
        );
        Ok(Box::new(channel))
    }
}

/// Consumer side of one session's event stream.
pub struct WebSocketEventChannel {
    session_id: String,
    signals: mpsc::Receiver<ChannelSignal>,
    cancel: CancellationToken,
    closed: bool,
}

impl WebSocketEventChannel {
    /// Spawns the reader task. Connection happens in the background; the
    /// first signal is `Connected` or `Disconnected`.
    pub fn connect(
        session_id: impl Into<String>,
        url: String,
        credentials: Arc<dyn CredentialProvider>,
        reconnect: ReconnectConfig,
    ) -> Self {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let cancel = CancellationToken::new();

        let reader = Reader {
            session_id: session_id.clone(),
            url,
            credentials,
            reconnect,
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(reader.run());

        Self {
            session_id,
            signals: rx,
            cancel,
            closed: false,
        }
    }
}

#[async_trait]
impl EventChannel for WebSocketEventChannel {
    async fn next_signal(&mut self) -> Option<ChannelSignal> {
        if self.closed {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            signal = self.signals.recv() => signal,
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!("[EventChannel] Closing stream for {}", self.session_id);
        self.closed = true;
        self.cancel.cancel();
        self.signals.close();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for WebSocketEventChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Why one connection ended.
enum ConnectionEnd {
    /// Cancelled, or nobody is listening any more
    Stopped,
    Dropped(String),
}

struct Reader {
    session_id: String,
    url: String,
    credentials: Arc<dyn CredentialProvider>,
    reconnect: ReconnectConfig,
    tx: mpsc::Sender<ChannelSignal>,
    cancel: CancellationToken,
}

impl Reader {
    async fn run(self) {
        let mut delay = self.reconnect.initial_delay();
        // Only the first failure of a streak is reported.
        let mut reported_down = false;

        loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.open_socket() => result,
            };

            match connected {
                Ok(socket) => {
                    tracing::info!("[EventChannel] Connected to {}", self.url);
                    delay = self.reconnect.initial_delay();
                    reported_down = false;
                    if !self.emit(ChannelSignal::Connected).await {
                        break;
                    }
                    match self.pump(socket).await {
                        ConnectionEnd::Stopped => break,
                        ConnectionEnd::Dropped(reason) => {
                            tracing::warn!(
                                "[EventChannel] Stream for {} dropped: {}",
                                self.session_id,
                                reason
                            );
                            reported_down = true;
                            if !self.emit(ChannelSignal::Disconnected { reason }).await {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "[EventChannel] Connect to {} failed: {}; retrying in {:?}",
                        self.url,
                        e,
                        delay
                    );
                    if !reported_down {
                        reported_down = true;
                        let reason = e.to_string();
                        if !self.emit(ChannelSignal::Disconnected { reason }).await {
                            break;
                        }
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, self.reconnect.max_delay());
        }

        tracing::debug!("[EventChannel] Reader for {} stopped", self.session_id);
    }

    async fn open_socket(&self) -> Result<Socket> {
        let token = self.credentials.bearer_token().await?;
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SyncError::config(format!("invalid event stream URL: {}", e)))?;
        let header = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SyncError::config("bearer token is not a valid header value"))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| SyncError::network(NetworkErrorKind::Offline, e.to_string()))?;
        Ok(socket)
    }

    async fn pump(&self, socket: Socket) -> ConnectionEnd {
        let (mut write, mut read) = socket.split();
        loop {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return ConnectionEnd::Stopped;
                }
                message = read.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => match parse_event(&text) {
                    Ok(event) => {
                        if !self.emit(ChannelSignal::Event(event)).await {
                            return ConnectionEnd::Stopped;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[EventChannel] Skipping malformed frame for {}: {}",
                            self.session_id,
                            e
                        );
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        return ConnectionEnd::Dropped(e.to_string());
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return ConnectionEnd::Dropped(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return ConnectionEnd::Dropped(e.to_string()),
                None => return ConnectionEnd::Dropped("stream ended".to_string()),
            }
        }
    }

    /// Forwards a signal. Returns false once the consumer is gone.
    async fn emit(&self, signal: ChannelSignal) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(signal).await.is_ok()
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredential;
    use stagewatch_core::session::WorkflowEvent;
    use tokio::net::TcpListener;

    fn fast_reconnect() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_ms: 10,
            max_delay_ms: 40,
        }
    }

    /// Accepts one websocket client, sends `frames`, then closes.
    async fn serve_once(frames: Vec<&'static str>) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame.into())).await.unwrap();
            }
            let _ = ws.close(None).await;
        });
        (format!("ws://{}", addr), handle)
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let max = Duration::from_secs(30);
        let mut delay = Duration::from_secs(1);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(delay.as_secs());
            delay = next_delay(delay, max);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[tokio::test]
    async fn test_delivers_events_in_order_and_skips_malformed() {
        let (base, server) = serve_once(vec![
            r#"{"type":"initial_status","status":"running","progress":0.1}"#,
            "garbage",
            r#"{"type":"node_update","node_name":"a","detail":"one"}"#,
            r#"{"type":"node_update","current_node":"b","detail":"two"}"#,
        ])
        .await;

        let source = WebSocketEventSource::new(
            base,
            Arc::new(StaticCredential::new("t")),
            fast_reconnect(),
        );
        let mut channel = source.open("s-1").await.unwrap();

        assert_eq!(channel.next_signal().await, Some(ChannelSignal::Connected));
        assert!(matches!(
            channel.next_signal().await,
            Some(ChannelSignal::Event(WorkflowEvent::InitialStatus { .. }))
        ));
        assert_eq!(
            channel.next_signal().await,
            Some(ChannelSignal::Event(WorkflowEvent::node_update("a", "one")))
        );
        assert_eq!(
            channel.next_signal().await,
            Some(ChannelSignal::Event(WorkflowEvent::node_update("b", "two")))
        );
        assert!(matches!(
            channel.next_signal().await,
            Some(ChannelSignal::Disconnected { .. })
        ));

        channel.close();
        channel.close();
        assert!(channel.is_closed());
        assert_eq!(channel.next_signal().await, None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_reports_disconnected_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut channel = WebSocketEventChannel::connect(
            "s-1",
            format!("ws://{}/ws/s-1", addr),
            Arc::new(StaticCredential::new("t")),
            fast_reconnect(),
        );

        assert!(matches!(
            channel.next_signal().await,
            Some(ChannelSignal::Disconnected { .. })
        ));
        // Further failed attempts stay silent.
        let next = tokio::time::timeout(Duration::from_millis(150), channel.next_signal()).await;
        assert!(next.is_err());
        channel.close();
    }
}
