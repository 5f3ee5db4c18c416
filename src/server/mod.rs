//! Chat server module.
//!
//! This module provides the TCP listener and the per-connection sessions
//! that bridge sockets to the channel registry.

mod listener;
mod session;

pub use listener::ChatServer;
pub use session::{ChatSession, SessionHandle, SessionSettings};
