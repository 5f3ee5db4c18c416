//! Chat channel implementation for Camix.
//!
//! A channel is a named set of client handles keyed by [`ClientId`].
//! Membership is guarded by a lock that is never held while sending.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::client::{ClientHandle, ClientId};
use crate::{CamixError, Result};

/// Result of adding a member to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// The client was inserted.
    Added,
    /// A member with the same identity was already present.
    AlreadyPresent,
}

/// Outcome of delivering one line to a set of members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of members the line was handed to.
    pub delivered: usize,
    /// Members whose send failed.
    pub failed: Vec<ClientId>,
}

impl BroadcastReport {
    /// Check if every send succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of send attempts.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// A named group of clients.
pub struct Channel {
    /// Channel name.
    name: String,
    /// Creation timestamp.
    created_at: DateTime<Utc>,
    /// Members in insertion order.
    members: RwLock<Vec<Arc<dyn ClientHandle>>>,
}

impl Channel {
    /// Create an empty channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            members: RwLock::new(Vec::new()),
        }
    }

    /// Get the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add a client.
    ///
    /// Adding an identity that is already present is a no-op.
    pub fn add_member(&self, client: Arc<dyn ClientHandle>) -> JoinResult {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if members.iter().any(|m| m.id() == client.id()) {
            return JoinResult::AlreadyPresent;
        }

        debug!("{} joined channel {}", client.id(), self.name);
        members.push(client);
        JoinResult::Added
    }

    /// Remove the member with the given identity.
    ///
    /// Returns true if a member was removed.
    pub fn remove_member(&self, id: &ClientId) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let before = members.len();
        members.retain(|m| m.id() != id);

        let removed = members.len() != before;
        if removed {
            debug!("{} left channel {}", id, self.name);
        }
        removed
    }

    /// Check if a client with the given identity is a member.
    pub fn is_member(&self, id: &ClientId) -> bool {
        self.read_members().iter().any(|m| m.id() == id)
    }

    /// Get the number of distinct members.
    pub fn member_count(&self) -> usize {
        self.read_members().len()
    }

    /// Get the member identities in join order.
    pub fn member_ids(&self) -> Vec<ClientId> {
        self.read_members().iter().map(|m| m.id().clone()).collect()
    }

    /// Get the member nicknames in join order.
    pub fn member_nicknames(&self) -> Vec<String> {
        self.snapshot().iter().map(|m| m.nickname()).collect()
    }

    /// Send a line to every member.
    pub fn broadcast(&self, text: &str) -> BroadcastReport {
        self.deliver(text, None)
    }

    /// Send a line to every member except one.
    pub fn broadcast_except(&self, text: &str, excluded: &ClientId) -> BroadcastReport {
        self.deliver(text, Some(excluded))
    }

    fn deliver(&self, text: &str, excluded: Option<&ClientId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for member in self.snapshot() {
            if excluded == Some(member.id()) {
                continue;
            }
            match member.send_direct(text) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!("Send to {} in {} failed: {}", member.id(), self.name, e);
                    report.failed.push(member.id().clone());
                }
            }
        }

        report
    }

    /// Copy the member list so no lock is held while sending.
    fn snapshot(&self) -> Vec<Arc<dyn ClientHandle>> {
        self.read_members().clone()
    }

    fn read_members(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn ClientHandle>>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("members", &self.member_count())
            .finish()
    }
}

/// Validate a channel name.
///
/// Any non-empty name is a valid channel name.
pub fn validate_channel_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CamixError::Validation(
            "channel name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
