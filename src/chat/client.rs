//! Client handle contract for Camix.
//!
//! The chat core never touches sockets. It addresses connected clients
//! through [`ClientHandle`], which the connection layer implements.

use std::net::SocketAddr;

use thiserror::Error;

use super::channel::BroadcastReport;
use crate::{CamixError, Result};

/// Maximum nickname length, in characters.
pub const MAX_NICKNAME_LENGTH: usize = 24;

/// Stable identity of a connected client.
///
/// Two handles are the same client iff their identities are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// Create an identity from an arbitrary key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for ClientId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error delivering a line to a single client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The client's connection is gone.
    #[error("connection closed")]
    Closed,
}

/// The chat core's view of one connected client.
///
/// Implementations must not block on network I/O: a send only queues the
/// text for the connection's writer.
pub trait ClientHandle: Send + Sync {
    /// Identity of the client, fixed for the connection's lifetime.
    fn id(&self) -> &ClientId;

    /// Current display nickname.
    fn nickname(&self) -> String;

    /// Send a line to this client only.
    fn send_direct(&self, text: &str) -> std::result::Result<(), SendError>;

    /// Send a line to every peer this client is in contact with.
    ///
    /// The contact set belongs to the implementation.
    fn send_to_contacts(&self, text: &str) -> BroadcastReport;
}

/// Validate a nickname.
///
/// A nickname is 1 to [`MAX_NICKNAME_LENGTH`] characters with no whitespace
/// or control characters.
pub fn validate_nickname(nickname: &str) -> Result<()> {
    if nickname.is_empty() {
        return Err(CamixError::Validation("nickname cannot be empty".to_string()));
    }
    if nickname.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(CamixError::Validation(format!(
            "nickname longer than {MAX_NICKNAME_LENGTH} characters"
        )));
    }
    if nickname.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CamixError::Validation(
            "nickname cannot contain whitespace".to_string(),
        ));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_client_id_from_socket_addr() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
        let id = ClientId::from(addr);
        assert_eq!(id.as_str(), "127.0.0.1:40000");
        assert_eq!(id, ClientId::new("127.0.0.1:40000"));
    }

    #[test]
    fn test_client_id_equality_is_by_value() {
        assert_eq!(ClientId::new("a1"), ClientId::new("a1"));
        assert_ne!(ClientId::new("a1"), ClientId::new("a2"));
    }

    #[test]
    fn test_validate_nickname_ok() {
        assert!(validate_nickname("toto").is_ok());
        assert!(validate_nickname("élodie_42").is_ok());
    }

    #[test]
    fn test_validate_nickname_rejects_empty() {
        assert!(validate_nickname("").is_err());
    }

    #[test]
    fn test_validate_nickname_rejects_whitespace() {
        assert!(validate_nickname("to to").is_err());
        assert!(validate_nickname("toto\t").is_err());
    }

    #[test]
    fn test_validate_nickname_rejects_too_long() {
        let name = "a".repeat(MAX_NICKNAME_LENGTH + 1);
        assert!(validate_nickname(&name).is_err());
        let name = "a".repeat(MAX_NICKNAME_LENGTH);
        assert!(validate_nickname(&name).is_ok());
    }

    #[test]
    fn test_send_error_display() {
        assert_eq!(SendError::Closed.to_string(), "connection closed");
    }
}
