//! Per-connection chat sessions.
//!
//! A session owns one TCP connection. Outgoing lines are queued on an
//! unbounded channel drained by a writer task, so the chat core never waits
//! on a socket.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{
    command_syntax, format_channel_list, format_help, format_who, parse_input, protocol,
    validate_nickname, BroadcastReport, Channel, ChatCommand, ChatInput, ClientHandle, ClientId,
    SendError, ServiceRegistry,
};
use crate::config::ChatConfig;
use crate::{CamixError, Result};

/// Settings applied to every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Nickname given to a client until it picks its own.
    pub default_nickname: String,
    /// Maximum length of a chat line, in characters.
    pub max_message_length: usize,
}

impl From<&ChatConfig> for SessionSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            default_nickname: config.default_nickname.clone(),
            max_message_length: config.max_message_length,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

/// Client handle backed by a connection's outgoing queue.
///
/// Its contacts are the other members of its current channel.
pub struct SessionHandle {
    id: ClientId,
    nickname: RwLock<String>,
    outbox: mpsc::UnboundedSender<String>,
    channel: RwLock<Option<Arc<Channel>>>,
}

impl SessionHandle {
    /// Create a handle that queues lines on `outbox`.
    pub fn new(
        id: ClientId,
        nickname: impl Into<String>,
        outbox: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            id,
            nickname: RwLock::new(nickname.into()),
            outbox,
            channel: RwLock::new(None),
        }
    }

    /// Change the nickname, returning the previous one.
    pub fn set_nickname(&self, nickname: impl Into<String>) -> String {
        let mut current = self.nickname.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, nickname.into())
    }

    /// Get the channel the client currently talks in.
    pub fn current_channel(&self) -> Option<Arc<Channel>> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set the channel the client currently talks in.
    pub fn set_current_channel(&self, channel: &Arc<Channel>) {
        *self.channel.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(channel));
    }

    /// Forget the current channel.
    ///
    /// Channels hold their members, so this releases the reference cycle
    /// once the client has left every channel.
    pub fn clear_current_channel(&self) {
        *self.channel.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ClientHandle for SessionHandle {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn nickname(&self) -> String {
        self.nickname
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn send_direct(&self, text: &str) -> std::result::Result<(), SendError> {
        self.outbox
            .send(text.to_string())
            .map_err(|_| SendError::Closed)
    }

    fn send_to_contacts(&self, text: &str) -> BroadcastReport {
        match self.current_channel() {
            Some(channel) => channel.broadcast_except(text, &self.id),
            None => BroadcastReport::default(),
        }
    }
}

/// A chat session driving one client connection.
pub struct ChatSession {
    handle: Arc<SessionHandle>,
    registry: Arc<ServiceRegistry>,
    settings: SessionSettings,
}

impl ChatSession {
    /// Create a session around an existing handle.
    pub fn new(
        handle: Arc<SessionHandle>,
        registry: Arc<ServiceRegistry>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            handle,
            registry,
            settings,
        }
    }

    /// Serve one TCP connection until the client quits or disconnects.
    pub async fn run(
        stream: TcpStream,
        peer: SocketAddr,
        registry: Arc<ServiceRegistry>,
        settings: SessionSettings,
    ) -> Result<()> {
        let (reader, writer) = stream.into_split();
        let (outbox, inbox) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_lines(writer, inbox));

        let handle = Arc::new(SessionHandle::new(
            ClientId::from(peer),
            settings.default_nickname.clone(),
            outbox,
        ));
        info!("Session opened for {}", peer);

        let session = ChatSession::new(handle, registry, settings);
        session.arrive().await;
        let result = session.read_loop(BufReader::new(reader)).await;
        session.depart().await;
        drop(session);

        if let Err(e) = writer_task.await {
            warn!("Writer task for {} failed: {}", peer, e);
        }
        info!("Session closed for {}", peer);
        result
    }

    /// Get the session's client handle.
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Register the client and place it in the default channel.
    pub async fn arrive(&self) {
        let channel = self.registry.inform_arrival(self.handle.clone()).await;
        self.handle.set_current_channel(&channel);
    }

    /// Announce the departure, then remove the client from every channel.
    pub async fn depart(&self) {
        self.registry.inform_departure(&*self.handle);
        self.registry
            .remove_from_all_channels(self.handle.id())
            .await;
        self.handle.clear_current_channel();
    }

    async fn read_loop<R>(&self, mut reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = line_limit(self.settings.max_message_length);
        while let Some(input) = read_line(&mut reader, limit).await? {
            match input {
                InputLine::Text(line) => {
                    if !self.handle_line(&line).await {
                        break;
                    }
                }
                InputLine::TooLong => {
                    debug!("Oversized line from {} discarded", self.handle.id());
                    self.reply_too_long();
                }
            }
        }
        Ok(())
    }

    /// Handle one input line.
    ///
    /// Returns false when the client asked to quit.
    pub async fn handle_line(&self, line: &str) -> bool {
        match parse_input(line) {
            ChatInput::Message(text) => {
                self.send_message(&text);
                true
            }
            ChatInput::Command(command) => self.handle_command(command).await,
        }
    }

    fn send_message(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if text.chars().count() > self.settings.max_message_length {
            self.reply_too_long();
            return;
        }

        let nickname = self.handle.nickname();
        let report = self
            .current_channel()
            .broadcast(&protocol::CHAT_MESSAGE.render(&[nickname.as_str(), text]));
        if !report.is_complete() {
            debug!("Message from {} missed {} members", self.handle.id(), report.failed.len());
        }
    }

    /// Run one command. Returns false for `/quit`.
    async fn handle_command(&self, command: ChatCommand) -> bool {
        if let Some("") = command.argument() {
            let syntax = command_syntax(command.name()).unwrap_or_default();
            self.reply(&protocol::MISSING_ARGUMENT.render(&[syntax]));
            return true;
        }

        match command {
            ChatCommand::Nick(nickname) => self.change_nickname(&nickname),
            ChatCommand::Create(name) => {
                self.registry.add_channel(&*self.handle, &name).await;
            }
            ChatCommand::Join(name) => self.join(&name).await,
            ChatCommand::List => {
                let channels = self.registry.snapshot().await;
                let current = self.current_channel();
                self.reply_lines(&format_channel_list(&channels, current.name()));
            }
            ChatCommand::Who => {
                let channel = self.current_channel();
                self.reply_lines(&format_who(&channel.member_nicknames(), channel.name()));
            }
            ChatCommand::Delete(name) => match self.registry.remove_channel(&name).await {
                Ok(_) => self.reply(&protocol::CHANNEL_REMOVED.render(&[name.as_str()])),
                Err(e) => self.reply(
                    &protocol::CHANNEL_REMOVAL_IMPOSSIBLE.render(&[name.as_str(), e.reason()]),
                ),
            },
            ChatCommand::Help => self.reply_lines(&format_help()),
            ChatCommand::Unknown(name) => {
                self.reply(&protocol::UNKNOWN_COMMAND.render(&[name.as_str()]))
            }
            ChatCommand::Quit => return false,
        }
        true
    }

    fn change_nickname(&self, nickname: &str) {
        if validate_nickname(nickname).is_err() {
            self.reply(&protocol::INVALID_NICKNAME.render(&[nickname]));
            return;
        }

        let previous = self.handle.set_nickname(nickname);
        info!("{} renamed {} -> {}", self.handle.id(), previous, nickname);
        self.current_channel()
            .broadcast(&protocol::NICKNAME_CHANGED.render(&[previous.as_str(), nickname]));
    }

    async fn join(&self, name: &str) {
        let current = self.current_channel();
        match self
            .registry
            .join_channel(self.handle.clone(), Some(&current), name)
            .await
        {
            Ok(channel) => self.handle.set_current_channel(&channel),
            Err(CamixError::UnknownChannel(name)) => {
                self.reply(&protocol::UNKNOWN_CHANNEL.render(&[name.as_str()]))
            }
            Err(e) => warn!("Join of '{}' by {} failed: {}", name, self.handle.id(), e),
        }
    }

    /// The client's channel, falling back to the default channel.
    fn current_channel(&self) -> Arc<Channel> {
        self.handle
            .current_channel()
            .unwrap_or_else(|| Arc::clone(self.registry.default_channel()))
    }

    fn reply_too_long(&self) {
        let max = self.settings.max_message_length.to_string();
        self.reply(&protocol::MESSAGE_TOO_LONG.render(&[max.as_str()]));
    }

    fn reply(&self, text: &str) {
        if let Err(e) = self.handle.send_direct(text) {
            debug!("Reply to {} dropped: {}", self.handle.id(), e);
        }
    }

    fn reply_lines(&self, text: &str) {
        for line in text.lines() {
            self.reply(line);
        }
    }
}

/// One line read from a client.
#[derive(Debug, PartialEq, Eq)]
enum InputLine {
    /// A complete line without its terminator, decoded lossily.
    Text(String),
    /// A line longer than the read limit; its bytes were discarded.
    TooLong,
}

/// Byte limit for one input line.
///
/// A character takes at most four bytes in UTF-8, plus room for `\r\n`.
fn line_limit(max_message_length: usize) -> usize {
    max_message_length.saturating_mul(4).saturating_add(2)
}

/// Read one `\n`-terminated line holding at most `limit` bytes in memory.
///
/// Invalid UTF-8 is replaced rather than rejected. Returns None at end of
/// input.
async fn read_line<R>(reader: &mut R, limit: usize) -> std::io::Result<Option<InputLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut overflow = false;
    let mut saw_input = false;

    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                if !saw_input {
                    return Ok(None);
                }
                break;
            }
            saw_input = true;

            let (used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            };
            if !overflow {
                if line.len() + used > limit {
                    overflow = true;
                    line = Vec::new();
                } else {
                    line.extend_from_slice(&available[..used]);
                }
            }
            (used, done)
        };
        reader.consume(used);
        if done {
            break;
        }
    }

    if overflow {
        return Ok(Some(InputLine::TooLong));
    }
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(Some(InputLine::Text(String::from_utf8_lossy(&line).into_owned())))
}

/// Drain queued lines to the socket, CRLF-terminated.
async fn write_lines<W>(mut writer: W, mut inbox: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = inbox.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            debug!("Write failed, closing outbox: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
