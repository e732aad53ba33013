//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-connection protocol state machine
//!
//! A [`Reader`] owns the read half of one transport. It walks the client
//! through the menu, registration or log in, and then the message loop,
//! replying through its [`Connection`] and fanning chat out through the
//! [`ConnectionRegistry`]. An [`IdleSupervisor`] runs beside it for the
//! whole session.

use crate::validation::{
    ValidationError, hash_password, validate_channel_description, validate_channel_name,
    validate_email, validate_name, validate_password, validate_password_hash,
};
use crate::{
    Connection, ConnectionRegistry, ConnectionState, IdleSupervisor, MenuOption, ReaderState,
    ReaderSubstate, Result, ServerConfig, ServerMetrics, SupervisorExit, SupervisorHandle,
    format_participant_message,
};
use chatline_backend::{
    Backend, GENERAL_CHANNEL, Participant, ParticipantMessage, SystemMessage,
};
use chatline_commands::{CommandKind, CommandTable, ParseError, ParseErrorKind};
use futures_util::StreamExt;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, instrument, trace, warn};

const NAME_PROMPT: &str = "name: ";
const PASSWORD_PROMPT: &str = "password: ";
const EMAIL_PROMPT: &str = "email: ";
const CHANNEL_NAME_PROMPT: &str = "channel name: ";
const CHANNEL_DESC_PROMPT: &str = "channel description: ";
const SELECT_CHANNEL_PROMPT: &str = "channel (empty for general): ";

/// Shared services every session needs
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub backend: Arc<dyn Backend>,
    pub commands: Arc<CommandTable>,
    pub metrics: Arc<ServerMetrics>,
    pub idle_timeout: Duration,
    pub max_line_length: usize,
}

impl SessionContext {
    /// Build a context with a fresh registry, command table and metrics
    pub fn new(config: &ServerConfig, backend: Arc<dyn Backend>) -> Self {
        let metrics = Arc::new(ServerMetrics::new());
        Self {
            registry: Arc::new(ConnectionRegistry::new(metrics.clone())),
            backend,
            commands: Arc::new(CommandTable::new()),
            metrics,
            idle_timeout: config.idle_timeout,
            max_line_length: config.max_line_length,
        }
    }
}

/// How a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client picked Exit from the menu
    Exit,
    /// The idle supervisor closed the connection
    IdleTimeout,
    /// The client closed its side
    PeerClosed,
}

/// Protocol state machine for one connection
pub struct Reader<R> {
    lines: FramedRead<R, LinesCodec>,
    connection: Connection,
    ctx: SessionContext,
    state: ReaderState,
    substate: ReaderSubstate,

    name: String,
    password_hash: String,
    email: String,
    channel_name: String,
    channel_desc: String,

    authenticated: bool,
    participant: Option<Arc<Participant>>,
    selected_channel: Option<String>,
}

impl<R> Reader<R>
where
    R: AsyncRead + Send + Unpin,
{
    /// Create a reader over `input` that answers through `connection`
    pub fn new(input: R, connection: Connection, ctx: SessionContext) -> Self {
        let codec = LinesCodec::new_with_max_length(ctx.max_line_length);
        Self {
            lines: FramedRead::new(input, codec),
            connection,
            ctx,
            state: ReaderState::ProcessingMenu,
            substate: ReaderSubstate::NotSet,
            name: String::new(),
            password_hash: String::new(),
            email: String::new(),
            channel_name: String::new(),
            channel_desc: String::new(),
            authenticated: false,
            participant: None,
            selected_channel: None,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Run the session to completion
    ///
    /// Registers the connection, starts the idle supervisor and processes
    /// lines until the client exits, goes idle, hangs up or fails. Cleanup
    /// runs on every path before this returns.
    #[instrument(skip_all, fields(peer_addr = %self.connection.addr()))]
    pub async fn run(mut self) -> Result<DisconnectReason> {
        self.ctx.registry.add(self.connection.clone()).await;
        let (supervisor, mut handle) =
            IdleSupervisor::new(self.connection.clone(), self.ctx.idle_timeout);
        let supervisor_task = tokio::spawn(supervisor.run());
        info!("Session started");

        let outcome = match self.send_menu().await {
            Ok(()) => self.event_loop(&mut handle).await,
            Err(e) => Err(e),
        };

        self.disconnect(handle, supervisor_task).await;
        match &outcome {
            Ok(reason) => info!(?reason, "Session ended"),
            Err(e) if e.is_connection_error() => info!(error = %e, "Session ended by transport"),
            Err(e) => warn!(error = %e, "Session ended with error"),
        }
        outcome
    }

    async fn event_loop(&mut self, handle: &mut SupervisorHandle) -> Result<DisconnectReason> {
        while self.state != ReaderState::Disconnecting {
            let next = select! {
                biased;

                () = handle.idle_expired() => None,
                next = self.lines.next() => Some(next),
            };

            let line = match next {
                None => {
                    self.ctx.metrics.idle_timeout();
                    return Ok(DisconnectReason::IdleTimeout);
                }
                Some(None) => return Ok(DisconnectReason::PeerClosed),
                Some(Some(Err(e))) => return Err(e.into()),
                Some(Some(Ok(line))) => line,
            };

            handle.abort_idle();
            self.ctx.metrics.line_received();
            trace!(state = ?self.state, substate = ?self.substate, len = line.len(), "Line received");
            self.handle_line(line.trim()).await?;
        }
        Ok(DisconnectReason::Exit)
    }

    async fn disconnect(
        &mut self,
        mut handle: SupervisorHandle,
        supervisor: JoinHandle<SupervisorExit>,
    ) {
        self.state = ReaderState::Disconnecting;
        handle.quit();
        self.ctx.registry.remove(self.connection.addr()).await;
        if let Err(e) = self.connection.close().await {
            debug!(error = %e, "Failed to close connection");
        }

        match supervisor.await {
            Ok(exit) => debug!(?exit, "Supervisor finished"),
            Err(e) => warn!(error = %e, "Supervisor task failed"),
        }

        if let Some(participant) = self.participant.take() {
            let notice = SystemMessage::new(format!("{} left the chat", participant.name));
            self.ctx.registry.broadcast_system_message(&notice).await;
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        match self.state {
            ReaderState::ProcessingMenu => self.process_menu(line).await,
            ReaderState::RegisteringNewParticipant => self.register(line).await,
            ReaderState::AuthenticatingParticipant => self.authenticate(line).await,
            ReaderState::AcceptingMessages => self.accept_message(line).await,
            ReaderState::CreatingNewChannel => self.create_channel(line).await,
            ReaderState::SelectingChannel => self.select_channel(line).await,
            ReaderState::Disconnecting => Ok(()),
        }
    }

    async fn process_menu(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }

        let Some(option) = MenuOption::parse(line) else {
            self.reply(&format!("error: unknown menu option {line}")).await?;
            return self.send_menu().await;
        };
        debug!(option = option.label(), "Menu selection");

        match option {
            MenuOption::Register | MenuOption::LogIn if self.authenticated => {
                self.state = ReaderState::AcceptingMessages;
                self.reply("error: already logged in").await
            }
            MenuOption::Register => {
                self.begin(
                    ReaderState::RegisteringNewParticipant,
                    ReaderSubstate::ProcessingName,
                );
                self.prompt(NAME_PROMPT).await
            }
            MenuOption::LogIn => {
                self.begin(
                    ReaderState::AuthenticatingParticipant,
                    ReaderSubstate::ProcessingName,
                );
                self.prompt(NAME_PROMPT).await
            }
            MenuOption::Exit => {
                self.state = ReaderState::Disconnecting;
                self.reply("bye").await
            }
            MenuOption::CreateChannel if !self.authenticated => {
                self.reply("error: log in to create a channel").await
            }
            MenuOption::CreateChannel => {
                self.begin(ReaderState::CreatingNewChannel, ReaderSubstate::ProcessingName);
                self.prompt(CHANNEL_NAME_PROMPT).await
            }
            MenuOption::ListChannels => {
                self.send_channels().await?;
                if self.authenticated {
                    self.state = ReaderState::SelectingChannel;
                    self.prompt(SELECT_CHANNEL_PROMPT).await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn register(&mut self, line: &str) -> Result<()> {
        match self.substate {
            ReaderSubstate::ProcessingName => {
                if let Err(e) = validate_name(line) {
                    return self.reject(e).await;
                }
                if self.ctx.backend.has_participant(line).await {
                    return self
                        .fail_to_menu(&format!("error: name {line} is already taken"))
                        .await;
                }
                self.name = line.to_string();
                self.substate = ReaderSubstate::ProcessingPassword;
                self.prompt(PASSWORD_PROMPT).await
            }
            ReaderSubstate::ProcessingPassword => {
                if let Err(e) = validate_password(line) {
                    return self.reject(e).await;
                }
                let hash = hash_password(line);
                if let Err(e) = validate_password_hash(&hash) {
                    return self.reject(e).await;
                }
                self.password_hash = hash;
                self.substate = ReaderSubstate::ProcessingEmailAddress;
                self.prompt(EMAIL_PROMPT).await
            }
            ReaderSubstate::ProcessingEmailAddress => {
                if let Err(e) = validate_email(line) {
                    return self.reject(e).await;
                }
                self.email = line.to_string();

                let registered = self
                    .ctx
                    .backend
                    .register_participant(&self.name, &self.password_hash, &self.email)
                    .await;
                match registered {
                    Ok(participant) => {
                        self.ctx.metrics.participant_registered();
                        info!(participant = %participant.name, "Participant registered");
                        self.admit(participant).await
                    }
                    Err(e) => self.fail_to_menu(&format!("error: {e}")).await,
                }
            }
            _ => self.fail_to_menu("error: unexpected input").await,
        }
    }

    async fn authenticate(&mut self, line: &str) -> Result<()> {
        match self.substate {
            ReaderSubstate::ProcessingName => {
                if let Err(e) = validate_name(line) {
                    return self.reject(e).await;
                }
                self.name = line.to_string();
                self.substate = ReaderSubstate::ProcessingPassword;
                self.prompt(PASSWORD_PROMPT).await
            }
            ReaderSubstate::ProcessingPassword => {
                self.password_hash = hash_password(line);
                let verified = self
                    .ctx
                    .backend
                    .authenticate_participant(&self.name, &self.password_hash)
                    .await;
                match verified {
                    Some(participant) => {
                        self.ctx.metrics.participant_logged_in();
                        info!(participant = %participant.name, "Participant logged in");
                        self.admit(participant).await
                    }
                    None => {
                        self.ctx.metrics.login_failed();
                        warn!(participant = %self.name, "Failed log in attempt");
                        self.fail_to_menu("error: invalid name or password").await
                    }
                }
            }
            _ => self.fail_to_menu("error: unexpected input").await,
        }
    }

    /// Bind a verified participant to this session
    async fn admit(&mut self, participant: Arc<Participant>) -> Result<()> {
        self.ctx
            .registry
            .assign_participant(self.connection.addr(), participant.clone())
            .await;

        self.authenticated = true;
        self.state = ReaderState::AcceptingMessages;
        self.substate = ReaderSubstate::NotSet;
        self.clear_accumulators();

        let name = participant.name.clone();
        self.participant = Some(participant);
        self.reply(&format!("welcome {name}, type :commands for help"))
            .await?;

        let notice = SystemMessage::new(format!("{name} joined the chat"));
        self.ctx.registry.broadcast_system_message(&notice).await;
        Ok(())
    }

    async fn accept_message(&mut self, line: &str) -> Result<()> {
        let parsed = self.ctx.commands.parse(line);
        if let Some(error) = parsed.error {
            self.ctx.metrics.command_error();
            return self.reply(&error.to_string()).await;
        }
        if let (true, Some(command)) = (parsed.matched, parsed.command) {
            return self.execute(command, parsed.channel, parsed.period).await;
        }
        if line.is_empty() {
            return Ok(());
        }

        let Some(participant) = self.participant.clone() else {
            return self.fail_to_menu("error: log in to send messages").await;
        };
        let message =
            ParticipantMessage::new(&participant.name, line, self.selected_channel.as_deref());
        let live = match &message.channel {
            Some(channel) => ParticipantMessage {
                contents: format!("#{channel} {}", message.contents),
                ..message.clone()
            },
            None => message.clone(),
        };
        self.ctx.backend.store_message(message).await;
        let result = self.ctx.registry.broadcast_participant_message(&live).await;
        self.ctx.metrics.message_posted();
        trace!(sent = result.sent, dropped = result.dropped, "Message posted");
        Ok(())
    }

    async fn execute(
        &mut self,
        command: CommandKind,
        channel: Option<String>,
        period: Option<u64>,
    ) -> Result<()> {
        debug!(?command, "Executing command");
        match command {
            CommandKind::DisplayMenu => {
                self.state = ReaderState::ProcessingMenu;
                self.send_menu().await
            }
            // Declared options are mandatory, so a parsed directive carries them.
            CommandKind::DisplayHistory => match (channel, period) {
                (Some(channel), Some(period)) => self.send_history(&channel, period).await,
                _ => self.reply_missing_argument().await,
            },
            CommandKind::ListMembers => match channel {
                Some(channel) => self.send_members(&channel).await,
                None => self.reply_missing_argument().await,
            },
            CommandKind::ListChannels => self.send_channels().await,
            CommandKind::ListCommands => self.connection.send_text(self.ctx.commands.catalog()).await,
        }
    }

    async fn create_channel(&mut self, line: &str) -> Result<()> {
        match self.substate {
            ReaderSubstate::ProcessingName => {
                if let Err(e) = validate_channel_name(line) {
                    return self.reject(e).await;
                }
                if self.ctx.backend.has_channel(line).await {
                    return self
                        .fail_to_menu(&format!("error: channel {line} already exists"))
                        .await;
                }
                self.channel_name = line.to_string();
                self.substate = ReaderSubstate::ProcessingChannelDesc;
                self.prompt(CHANNEL_DESC_PROMPT).await
            }
            ReaderSubstate::ProcessingChannelDesc => {
                if let Err(e) = validate_channel_description(line) {
                    return self.reject(e).await;
                }
                self.channel_desc = line.to_string();

                let Some(creator) = self.participant.as_ref().map(|p| p.name.clone()) else {
                    return self.fail_to_menu("error: log in to create a channel").await;
                };
                let registered = self
                    .ctx
                    .backend
                    .register_channel(&self.channel_name, &self.channel_desc, &creator)
                    .await;
                match registered {
                    Ok(channel) => {
                        info!(channel = %channel.name, creator = %creator, "Channel created");
                        self.state = ReaderState::AcceptingMessages;
                        self.substate = ReaderSubstate::NotSet;
                        self.clear_accumulators();
                        self.reply(&format!("channel {} created", channel.name))
                            .await?;

                        let notice = SystemMessage::new(format!(
                            "{creator} created channel {}",
                            channel.name
                        ));
                        self.ctx.registry.broadcast_system_message(&notice).await;
                        Ok(())
                    }
                    Err(e) => self.fail_to_menu(&format!("error: {e}")).await,
                }
            }
            _ => self.fail_to_menu("error: unexpected input").await,
        }
    }

    async fn select_channel(&mut self, line: &str) -> Result<()> {
        self.state = ReaderState::AcceptingMessages;

        if line.is_empty() || line.eq_ignore_ascii_case(GENERAL_CHANNEL) {
            self.selected_channel = None;
            return self.reply(&format!("messages go to {GENERAL_CHANNEL}")).await;
        }
        if !self.ctx.backend.has_channel(line).await {
            return self.reply(&format!("error: unknown channel {line}")).await;
        }

        if let Some(participant) = &self.participant
            && let Err(e) = self.ctx.backend.join_channel(line, &participant.name).await
        {
            return self.reply(&format!("error: {e}")).await;
        }
        self.selected_channel = Some(line.to_string());
        self.reply(&format!("messages go to {line}")).await
    }

    async fn send_menu(&self) -> Result<()> {
        self.connection.send_text(&MenuOption::render_menu()).await
    }

    async fn send_channels(&self) -> Result<()> {
        let channels = self.ctx.backend.list_channels().await;
        let mut out = String::from("channels:\r\n");
        let _ = write!(out, "{GENERAL_CHANNEL:<20}\tOpen to every participant\r\n");
        for channel in channels {
            let _ = write!(out, "{:<20}\t{}\r\n", channel.name, channel.description);
        }
        self.connection.send_text(&out).await
    }

    async fn send_history(&self, channel: &str, period: u64) -> Result<()> {
        if !self.ctx.backend.has_channel(channel).await {
            return self.reply(&format!("error: unknown channel {channel}")).await;
        }

        let messages = self.ctx.backend.get_history(Some(channel), period).await;
        let mut out = String::from("history:\r\n");
        if messages.is_empty() {
            out.push_str("no messages\r\n");
        }
        for message in &messages {
            out.push_str(&format_participant_message(message));
        }
        self.connection.send_text(&out).await
    }

    async fn send_members(&self, channel: &str) -> Result<()> {
        let members = match self.ctx.backend.list_channel_members(channel).await {
            Ok(members) => members,
            Err(e) => return self.reply(&format!("error: {e}")).await,
        };

        let online = self.ctx.registry.online_participants().await;
        let mut out = format!("members of {channel}:\r\n");
        for member in members {
            let state = if online.iter().any(|name| name.eq_ignore_ascii_case(&member)) {
                ConnectionState::Connected
            } else {
                ConnectionState::Pending
            };
            let _ = write!(out, "{member:<32}\t{state}\r\n");
        }
        self.connection.send_text(&out).await
    }

    async fn reply_missing_argument(&self) -> Result<()> {
        let error = ParseError::new(ParseErrorKind::ArgumentNotSpecified);
        self.reply(&error.to_string()).await
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.connection.send_line(text).await
    }

    async fn prompt(&self, text: &str) -> Result<()> {
        self.connection.send_text(text).await
    }

    fn begin(&mut self, state: ReaderState, substate: ReaderSubstate) {
        self.clear_accumulators();
        self.state = state;
        self.substate = substate;
    }

    async fn reject(&mut self, error: ValidationError) -> Result<()> {
        self.fail_to_menu(&format!("error: {error}")).await
    }

    /// Abandon the current flow and return to the menu
    async fn fail_to_menu(&mut self, diagnostic: &str) -> Result<()> {
        debug!(state = ?self.state, substate = ?self.substate, diagnostic, "Input rejected");
        self.state = ReaderState::ProcessingMenu;
        self.substate = ReaderSubstate::NotSet;
        self.clear_accumulators();
        self.reply(diagnostic).await?;
        self.send_menu().await
    }

    fn clear_accumulators(&mut self) {
        self.name.clear();
        self.password_hash.clear();
        self.email.clear();
        self.channel_name.clear();
        self.channel_desc.clear();
    }
}
