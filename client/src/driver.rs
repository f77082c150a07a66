use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures_util::future::BoxFuture;
use guru_protocol::{ClientCommand, ServerFrame, close_code, parse_server_frame};
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep, timeout};

use crate::connection::{Channel, ChannelEvent, Transport};
use crate::config::ClientConfig;
use crate::endpoint::Endpoints;
use crate::handler::{Handler, NoopHandler};
use crate::state::{CloseOutcome, ConnectionState, Lifecycle};

type PendingAttempt<C> = BoxFuture<'static, Result<C>>;

/// Requests from the public handle, processed in order.
pub(crate) enum Command {
    Connect,
    Send(ClientCommand),
    Disconnect,
    SetHandler(Box<dyn Handler>),
}

/// Background task owning the channel and every piece of mutable state.
///
/// Runs until the handle drops its command sender, then disconnects.
pub(crate) struct Driver<T: Transport> {
    user_id: String,
    transport: Arc<T>,
    endpoints: Endpoints,
    connect_timeout: Duration,
    lifecycle: Lifecycle,
    channel: Option<T::Channel>,
    pending: Option<PendingAttempt<T::Channel>>,
    retry: Option<Pin<Box<Sleep>>>,
    handler: Box<dyn Handler>,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<T: Transport> Driver<T> {
    pub fn new(
        user_id: String,
        transport: T,
        endpoints: Endpoints,
        config: &ClientConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            user_id,
            transport: Arc::new(transport),
            endpoints,
            connect_timeout: config.connect_timeout,
            lifecycle: Lifecycle::new(config.reconnect.clone()),
            channel: None,
            pending: None,
            retry: None,
            handler: Box::new(NoopHandler),
            commands,
            state_tx,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },

                result = await_attempt(&mut self.pending), if self.pending.is_some() => {
                    self.pending = None;
                    self.on_attempt_finished(result).await;
                }

                event = recv_event(&mut self.channel), if self.channel.is_some() => {
                    self.on_channel_event(event).await;
                }

                () = await_retry(&mut self.retry), if self.retry.is_some() => {
                    self.retry = None;
                    if self.lifecycle.retry_due() {
                        self.start_attempt();
                    }
                }
            }
        }

        self.disconnect().await;
        tracing::debug!(user_id = %self.user_id, "Connection driver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connect(),
            Command::Send(frame) => self.send(frame).await,
            Command::Disconnect => self.disconnect().await,
            Command::SetHandler(handler) => {
                self.handler = handler;
                tracing::debug!(user_id = %self.user_id, "Message handler replaced");
            }
        }
    }

    fn connect(&mut self) {
        if !self.lifecycle.request_connect() {
            tracing::debug!(
                state = %self.lifecycle.state(),
                exhausted = self.lifecycle.is_exhausted(),
                "Connect ignored"
            );
            return;
        }

        // supersedes a scheduled retry
        self.retry = None;
        self.start_attempt();
    }

    fn start_attempt(&mut self) {
        let attempt = self.lifecycle.attempts();
        let url = self.endpoints.for_attempt(attempt).to_string();
        tracing::info!(user_id = %self.user_id, url = %url, attempt, "Connecting");

        let transport = Arc::clone(&self.transport);
        let limit = self.connect_timeout;
        let future: PendingAttempt<T::Channel> = Box::pin(async move {
            match timeout(limit, transport.open(&url)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("Connection attempt timed out after {:?}", limit)),
            }
        });

        self.pending = Some(future);
        self.publish();
    }

    async fn on_attempt_finished(&mut self, result: Result<T::Channel>) {
        match result {
            Ok(channel) => {
                self.channel = Some(channel);
                self.lifecycle.on_open();
                tracing::info!(user_id = %self.user_id, "Connected");
                self.publish();

                if let Some(room) = self.lifecycle.room().map(str::to_string) {
                    tracing::debug!(room_id = %room, "Rejoining room");
                    self.write(ClientCommand::join(&room)).await;
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "Connection attempt failed");
                self.on_closed(close_code::ABNORMAL);
            }
        }
    }

    async fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Frame(text) => self.dispatch(&text).await,
            ChannelEvent::Closed(code) => {
                self.channel = None;
                self.on_closed(code);
            }
        }
    }

    fn on_closed(&mut self, code: u16) {
        match self.lifecycle.on_close(code) {
            CloseOutcome::Stay => {
                tracing::info!(user_id = %self.user_id, code, "Connection closed");
            }
            CloseOutcome::Retry { attempt, delay } => {
                tracing::info!(
                    user_id = %self.user_id,
                    code,
                    attempt,
                    delay = ?delay,
                    "Connection lost, scheduling reconnect"
                );
                self.retry = Some(Box::pin(sleep(delay)));
            }
            CloseOutcome::GiveUp => {
                tracing::warn!(user_id = %self.user_id, code, "Reconnect attempts exhausted");
            }
        }

        self.publish();
    }

    /// Parse one inbound frame and hand it to the matching handler method
    async fn dispatch(&mut self, text: &str) {
        let frame = match parse_server_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        match frame {
            ServerFrame::Message(message) => self.handler.on_message(message).await,
            ServerFrame::ConnectionEstablished(info) => {
                self.handler.on_connection_established(&info).await;
            }
            ServerFrame::RoomJoined(room) => self.handler.on_room_joined(&room).await,
            ServerFrame::UserJoined(change) => self.handler.on_user_joined(&change).await,
            ServerFrame::UserLeft(change) => self.handler.on_user_left(&change).await,
            ServerFrame::Typing(indicator) => self.handler.on_typing(&indicator).await,
            ServerFrame::Unknown(kind) => {
                tracing::debug!(kind = %kind, "Ignoring unrecognized frame");
            }
        }
    }

    async fn send(&mut self, frame: ClientCommand) {
        match &frame {
            ClientCommand::JoinRoom { room_id } => self.lifecycle.remember_room(room_id),
            ClientCommand::LeaveRoom { room_id } => self.lifecycle.forget_room(room_id),
            _ => {}
        }

        self.write(frame).await;
    }

    /// Write a frame if the channel is open; otherwise drop it.
    async fn write(&mut self, frame: ClientCommand) {
        let Some(channel) = self.channel.as_mut() else {
            tracing::debug!(
                room_id = %frame.room_id(),
                state = %self.lifecycle.state(),
                "Channel not open, dropping frame"
            );
            return;
        };

        let text = match frame.to_wire_format() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode frame");
                return;
            }
        };

        if let Err(e) = channel.send_text(text).await {
            tracing::warn!(error = %e, "Failed to write frame");
        }
    }

    async fn disconnect(&mut self) {
        self.retry = None;
        if self.pending.take().is_some() {
            tracing::debug!(user_id = %self.user_id, "Cancelled in-flight connection attempt");
        }

        self.lifecycle.disconnect();

        if let Some(mut channel) = self.channel.take() {
            tracing::info!(user_id = %self.user_id, "Disconnecting");
            if let Err(e) = channel.close(close_code::NORMAL, "User disconnected").await {
                tracing::warn!(error = %e, "Failed to close channel cleanly");
            }
        }

        self.publish();
    }

    fn publish(&self) {
        let state = self.lifecycle.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

async fn await_attempt<C>(attempt: &mut Option<PendingAttempt<C>>) -> Result<C> {
    match attempt {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn recv_event<C: Channel>(channel: &mut Option<C>) -> ChannelEvent {
    match channel {
        Some(channel) => channel.recv().await,
        None => pending().await,
    }
}

async fn await_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(timer) => timer.await,
        None => pending().await,
    }
}
