
use guru_protocol::{ClientCommand, MessageType};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::connection::{Transport, WsTransport};
use crate::driver::{Command, Driver};
use crate::endpoint::Endpoints;
use crate::handler::Handler;
use crate::state::ConnectionState;
use crate::ClientError;

/// Handle to one reconnecting chat channel for a single user.
///
/// Every operation is a non-blocking enqueue to a background task that owns
/// the socket; commands run in the order they were issued. Sends while the
/// channel is not open are dropped, never queued. Failures are logged, never
/// returned.
///
/// Dropping the handle disconnects. Use [`ConnectionManager::dispose`] to
/// also wait for the socket to be closed.
pub struct ConnectionManager {
    user_id: String,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Create a manager dialing the configured websocket endpoints.
    ///
    /// Must be called from within a tokio runtime. The manager starts
    /// [`ConnectionState::Idle`]; call [`connect`](Self::connect) to dial.
    pub fn new(user_id: &str, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_transport(user_id, config, WsTransport)
    }

    pub fn with_transport<T: Transport>(
        user_id: &str,
        config: ClientConfig,
        transport: T,
    ) -> Result<Self, ClientError> {
        if user_id.is_empty() {
            return Err(ClientError::MissingUserId);
        }

        let endpoints = Endpoints::resolve(&config.endpoints, user_id)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);

        let driver = Driver::new(
            user_id.to_string(),
            transport,
            endpoints,
            &config,
            command_rx,
            state_tx,
        );
        let task = tokio::spawn(driver.run());

        tracing::debug!(user_id = %user_id, "Connection manager created");

        Ok(Self {
            user_id: user_id.to_string(),
            commands,
            state,
            task,
        })
    }

    /// Dial unless an attempt is in flight, the channel is open, or the
    /// reconnect budget is spent (reset it with `disconnect` first).
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Send a text message to a room.
    pub fn send_message(&self, room_id: &str, content: &str, sender_name: &str) {
        self.command(Command::Send(ClientCommand::text(room_id, content, sender_name)));
    }

    pub fn send_message_with_type(
        &self,
        room_id: &str,
        content: &str,
        sender_name: &str,
        message_type: MessageType,
    ) {
        self.command(Command::Send(ClientCommand::Message {
            room_id: room_id.to_string(),
            content: content.to_string(),
            sender_name: sender_name.to_string(),
            message_type,
        }));
    }

    /// Join a room. The room is remembered and rejoined after every reconnect,
    /// even if the channel is not open right now.
    pub fn join_room(&self, room_id: &str) {
        self.command(Command::Send(ClientCommand::join(room_id)));
    }

    /// Leave a room, forgetting it if it is the remembered one.
    pub fn leave_room(&self, room_id: &str) {
        self.command(Command::Send(ClientCommand::leave(room_id)));
    }

    pub fn send_typing(&self, room_id: &str, is_typing: bool) {
        self.command(Command::Send(ClientCommand::Typing {
            room_id: room_id.to_string(),
            is_typing,
        }));
    }

    /// Close the channel and suppress every automatic reconnect until the
    /// next `connect`. Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Replace the handler without touching the connection.
    pub fn set_handler<H: Handler>(&self, handler: H) {
        self.command(Command::SetHandler(Box::new(handler)));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Disconnect and wait for the background task to finish.
    pub async fn dispose(self) {
        let Self { commands, task, .. } = self;
        drop(commands);

        if let Err(e) = task.await {
            tracing::error!(error = %e, "Connection driver task failed");
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!(user_id = %self.user_id, "Connection driver has stopped, ignoring command");
        }
    }
}
