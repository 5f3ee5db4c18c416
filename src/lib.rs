//! Camix - a multi-channel line-oriented chat server.
//!
//! Clients connect over TCP, land in the default channel, and talk to the
//! members of their current channel. Channels are created and joined with
//! slash commands.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use chat::{Channel, ClientHandle, ClientId, ServiceRegistry};
pub use config::Config;
pub use error::{CamixError, Result};
pub use server::{ChatServer, ChatSession, SessionHandle, SessionSettings};
