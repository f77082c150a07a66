mod policy;

pub use policy::ReconnectPolicy;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use guru_protocol::close_code;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What an open channel yields to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A text frame, not yet parsed
    Frame(String),
    /// The channel is gone; carries the close code
    Closed(u16),
}

/// Opens channels to the chat backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Channel: Channel;

    async fn open(&self, url: &str) -> Result<Self::Channel>;
}

/// One open duplex channel.
///
/// After `recv` returns [`ChannelEvent::Closed`] the channel is dropped.
#[async_trait]
pub trait Channel: Send + 'static {
    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn recv(&mut self) -> ChannelEvent;

    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

/// Transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    type Channel = WsChannel;

    async fn open(&self, url: &str) -> Result<WsChannel> {
        let (ws, _response) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        Ok(WsChannel { ws })
    }
}

/// Low-level WebSocket connection
pub struct WsChannel {
    ws: WsStream,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text))
            .await
            .context("Failed to send message")
    }

    async fn recv(&mut self) -> ChannelEvent {
        while let Some(message) = self.ws.next().await {
            match message {
                Ok(Message::Text(text)) => return ChannelEvent::Frame(text),
                Ok(Message::Close(frame)) => {
                    let code = frame.map_or(close_code::NO_STATUS, |f| u16::from(f.code));
                    return ChannelEvent::Closed(code);
                }
                // tungstenite queues pongs itself
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "WebSocket error");
                    return ChannelEvent::Closed(close_code::ABNORMAL);
                }
            }
        }

        ChannelEvent::Closed(close_code::ABNORMAL)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };

        self.ws
            .close(Some(frame))
            .await
            .context("Failed to close websocket")
    }
}
