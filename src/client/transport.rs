//! Transport seam for the client channel.
//!
//! The connection manager drives a [`Transport`] — a pair of frame
//! channels — obtained from a [`Connector`]. The real implementation,
//! [`WsConnector`], speaks WebSocket via tokio-tungstenite; tests script
//! the seam with in-memory channel pairs.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Bytes, Message as WsMessage};

/// Transport-level failures, absorbed by the reconnection state machine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    #[error("connection timed out")]
    Timeout,
    #[error("channel closed: {0}")]
    Closed(String),
}

/// The frames the manager exchanges with a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    Text(String),
    Ping,
    Pong,
    Close { code: u16, reason: String },
}

/// A live transport session: frames out, frames in.
///
/// The session is over when `incoming` yields `None`.
pub struct Transport {
    pub outgoing: mpsc::Sender<TransportFrame>,
    pub incoming: mpsc::Receiver<TransportFrame>,
}

/// Opens transport sessions. The seam exists so the state machine can be
/// exercised against a scripted transport.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (mut sink, mut stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<TransportFrame>(64);
        let (in_tx, in_rx) = mpsc::channel::<TransportFrame>(64);

        // Outbound pump: frame -> WebSocket message.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let message = match frame {
                    TransportFrame::Text(text) => WsMessage::Text(text.into()),
                    TransportFrame::Ping => WsMessage::Ping(Bytes::new()),
                    TransportFrame::Pong => WsMessage::Pong(Bytes::new()),
                    TransportFrame::Close { code, reason } => {
                        let _ = sink
                            .send(WsMessage::Close(Some(CloseFrame {
                                code: CloseCode::from(code),
                                reason: reason.into(),
                            })))
                            .await;
                        break;
                    }
                };
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        });

        // Inbound pump: WebSocket message -> frame.
        tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                let frame = match result {
                    Ok(WsMessage::Text(text)) => TransportFrame::Text(text.as_str().to_string()),
                    Ok(WsMessage::Ping(_)) => TransportFrame::Ping,
                    Ok(WsMessage::Pong(_)) => TransportFrame::Pong,
                    Ok(WsMessage::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                            .unwrap_or((1005, String::new()));
                        let _ = in_tx.send(TransportFrame::Close { code, reason }).await;
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!("[Client] Transport read error: {}", e);
                        break;
                    }
                };
                if in_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        Ok(Transport {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}
