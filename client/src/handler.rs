use async_trait::async_trait;
use guru_protocol::ChatMessage;
use guru_protocol::server::{ConnectionInfo, PresenceChange, RoomJoined, TypingIndicator};

/// Trait for handling inbound chat events.
///
/// Only `on_message` is required; every other method defaults to a no-op.
/// The driver calls one method at a time, in frame order.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// #[async_trait]
/// impl Handler for Printer {
///     async fn on_message(&mut self, message: ChatMessage) {
///         println!("[{}] {}: {}", message.room_id, message.sender_name, message.content);
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + 'static {
    /// Called for every inbound `message` frame.
    async fn on_message(&mut self, message: ChatMessage);

    /// Called when the backend acknowledges the socket.
    async fn on_connection_established(&mut self, info: &ConnectionInfo) {
        let _ = info;
    }

    /// Called when our own join is confirmed.
    async fn on_room_joined(&mut self, room: &RoomJoined) {
        let _ = room;
    }

    async fn on_user_joined(&mut self, change: &PresenceChange) {
        let _ = change;
    }

    async fn on_user_left(&mut self, change: &PresenceChange) {
        let _ = change;
    }

    async fn on_typing(&mut self, indicator: &TypingIndicator) {
        let _ = indicator;
    }
}

/// Installed until the caller registers a handler. Drops everything.
pub struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    async fn on_message(&mut self, message: ChatMessage) {
        tracing::trace!(room_id = %message.room_id, "No handler registered, dropping message");
    }
}

/// Adapts a plain closure into a [`Handler`] that only sees messages.
pub struct CallbackHandler<F>(pub F);

#[async_trait]
impl<F> Handler for CallbackHandler<F>
where
    F: FnMut(ChatMessage) + Send + 'static,
{
    async fn on_message(&mut self, message: ChatMessage) {
        (self.0)(message);
    }
}
