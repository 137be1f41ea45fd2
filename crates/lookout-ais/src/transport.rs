//! Feed connection seam.
//!
//! The ingester only needs "open a connection, send one text frame, read
//! frames". [`FeedTransport`] captures exactly that so the state machine can
//! be driven by a scripted transport in tests and by `tokio-tungstenite` in
//! production.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::errors::{IngestError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A frame read from the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedFrame {
    /// UTF-8 text payload.
    Text(String),
    /// Binary payload (the feed may send JSON as UTF-8 bytes).
    Binary(Vec<u8>),
    /// Remote close, with the reason when one was given.
    Close(Option<String>),
    /// A data frame that could not be decoded. The connection is still usable.
    Malformed(String),
    /// Ping/pong and other control traffic.
    Control,
}

/// An open feed connection.
#[async_trait]
pub trait FeedSession: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Read the next frame. `None` once the stream is exhausted.
    async fn next_frame(&mut self) -> Option<Result<FeedFrame>>;
}

/// Opens feed connections.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open one connection to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn FeedSession>>;
}

/// `tokio-tungstenite` transport (supports `ws://` and `wss://`).
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn FeedSession>> {
        let (ws, _) = connect_async(endpoint)
            .await
            .map_err(|e| IngestError::Connect(e.to_string()))?;
        Ok(Box::new(WebSocketSession { ws }))
    }
}

struct WebSocketSession {
    ws: WsStream,
}

#[async_trait]
impl FeedSession for WebSocketSession {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| IngestError::Subscribe(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<FeedFrame>> {
        let frame = match self.ws.next().await? {
            Ok(Message::Text(text)) => FeedFrame::Text(text.to_string()),
            Ok(Message::Binary(data)) => FeedFrame::Binary(data.to_vec()),
            Ok(Message::Close(frame)) => FeedFrame::Close(frame.map(|f| f.reason.to_string())),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => FeedFrame::Control,
            // The frame was fully read before decoding failed.
            Err(e @ WsError::Utf8 { .. }) => FeedFrame::Malformed(e.to_string()),
            Err(e) => return Some(Err(IngestError::Transport(e.to_string()))),
        };
        Some(Ok(frame))
    }
}
