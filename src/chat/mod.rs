//! Chat module for Camix.
//!
//! This module provides the channel/session core:
//! - Protocol catalog of notification templates
//! - Client handle contract implemented by the connection layer
//! - Channels with identity-keyed membership and broadcast
//! - The service registry owning all channels
//! - Chat command parsing (/nick, /create, /join, /list, ...)

mod channel;
mod client;
mod command;
pub mod protocol;
mod registry;

pub use channel::{validate_channel_name, BroadcastReport, Channel, JoinResult};
pub use client::{validate_nickname, ClientHandle, ClientId, SendError, MAX_NICKNAME_LENGTH};
pub use command::{
    command_syntax, format_channel_list, format_help, format_who, get_command_help, parse_input,
    ChatCommand, ChatInput, CommandInfo,
};
pub use protocol::Template;
pub use registry::{ChannelCreation, ChannelInfo, RemoveChannelError, ServiceRegistry};
