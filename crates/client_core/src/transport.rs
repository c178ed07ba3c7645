//! Duplex frame transport under the transport session.
//!
//! A [`TransportConnector`] opens one connection in the background and
//! reports its lifecycle plus every inbound text frame as [`TransportEvent`]s
//! on the page's event channel. The returned [`Transport`] handle only queues
//! outbound frames; it never blocks the caller.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

pub const WEBSOCKET_PATH: &str = "ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Frame(String),
    Disconnected { reason: Option<String> },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server_url must start with http:// or https://, got {0}")]
    UnsupportedScheme(String),
    #[error("invalid websocket url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("transport is closed")]
    Closed,
    #[error(transparent)]
    Protocol(#[from] shared::error::ProtocolError),
}

pub trait Transport: Send + Sync {
    fn send_text(&self, frame: String) -> Result<(), TransportError>;
    fn close(&self) -> Result<(), TransportError>;
}

pub trait TransportConnector: Send + Sync {
    fn open(
        &self,
        server_url: &Url,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

pub fn websocket_url(server_url: &Url) -> Result<Url, TransportError> {
    let scheme = match server_url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(TransportError::UnsupportedScheme(other.to_string())),
    };
    let mut ws_url = server_url.join(WEBSOCKET_PATH)?;
    ws_url
        .set_scheme(scheme)
        .map_err(|()| TransportError::UnsupportedScheme(scheme.to_string()))?;
    Ok(ws_url)
}

enum Outbound {
    Text(String),
    Close,
}

/// WebSocket connector speaking JSON text frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl TransportConnector for WsConnector {
    fn open(
        &self,
        server_url: &Url,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let ws_url = websocket_url(server_url)?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(ws_url, outbound_rx, events));
        Ok(Box::new(WsTransport { outbound }))
    }
}

struct WsTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WsTransport {
    fn send_text(&self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Text(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Close)
            .map_err(|_| TransportError::Closed)
    }
}

async fn run_socket(
    ws_url: Url,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
) {
    let ws_stream = match connect_async(ws_url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            warn!(url = %ws_url, "websocket connect failed: {err}");
            let _ = events
                .send(TransportEvent::Disconnected {
                    reason: Some(format!("failed to connect websocket: {err}")),
                })
                .await;
            return;
        }
    };
    info!(url = %ws_url, "websocket handshake complete");
    if events.send(TransportEvent::Connected).await.is_err() {
        return;
    }

    let (mut writer, mut reader) = ws_stream.split();
    let reason = loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Text(frame)) => {
                    if let Err(err) = writer.send(Message::Text(frame)).await {
                        break Some(format!("websocket send failed: {err}"));
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = writer.send(Message::Close(None)).await;
                    break Some("client closed connection".to_string());
                }
            },
            inbound = reader.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Frame(text)).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break Some(format!("websocket receive failed: {err}")),
                None => break None,
            },
        }
    };

    debug!(url = %ws_url, ?reason, "websocket task finished");
    let _ = events.send(TransportEvent::Disconnected { reason }).await;
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
