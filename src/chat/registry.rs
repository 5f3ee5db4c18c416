//! Channel registry for Camix.
//!
//! The registry owns every channel, including the protected default
//! channel, and is shared by all connections behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::channel::{validate_channel_name, BroadcastReport, Channel, JoinResult};
use super::client::{ClientHandle, ClientId};
use super::protocol::{self, Template};
use crate::{CamixError, Result};

/// Outcome of a channel creation request.
#[derive(Debug, Clone)]
pub enum ChannelCreation {
    /// A new channel was registered.
    Created(Arc<Channel>),
    /// The name was taken; the registered channel is returned untouched.
    AlreadyExists(Arc<Channel>),
    /// The name is not a valid channel name.
    InvalidName,
}

impl ChannelCreation {
    /// Check if a new channel was registered.
    pub fn is_created(&self) -> bool {
        matches!(self, ChannelCreation::Created(_))
    }

    /// Get the channel registered under the requested name, if any.
    pub fn channel(&self) -> Option<&Arc<Channel>> {
        match self {
            ChannelCreation::Created(c) | ChannelCreation::AlreadyExists(c) => Some(c),
            ChannelCreation::InvalidName => None,
        }
    }
}

/// Error when removing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveChannelError {
    /// Channel not found.
    NotFound,
    /// The default channel cannot be removed.
    Protected,
    /// Channel still has members.
    NotEmpty,
}

impl RemoveChannelError {
    /// Short reason shown to users.
    pub fn reason(&self) -> &'static str {
        match self {
            RemoveChannelError::NotFound => "it does not exist",
            RemoveChannelError::Protected => "it is the default channel",
            RemoveChannelError::NotEmpty => "it still has members",
        }
    }
}

/// Read-only information about a registered channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name.
    pub name: String,
    /// Number of members.
    pub member_count: usize,
    /// Whether this is the protected default channel.
    pub is_default: bool,
}

/// Registry of chat channels.
pub struct ServiceRegistry {
    /// The protected default channel.
    default_channel: Arc<Channel>,
    /// Channels indexed by name, default channel included.
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl ServiceRegistry {
    /// Create a registry and its default channel.
    ///
    /// Fails if `default_channel` is empty.
    pub fn new(default_channel: impl Into<String>) -> Result<Self> {
        let name = default_channel.into();
        validate_channel_name(&name)
            .map_err(|e| CamixError::Config(format!("cannot create default channel: {e}")))?;

        let default_channel = Arc::new(Channel::new(&name));
        let mut channels = HashMap::new();
        channels.insert(name, Arc::clone(&default_channel));

        info!("Default channel '{}' created", default_channel.name());
        Ok(Self {
            default_channel,
            channels: RwLock::new(channels),
        })
    }

    /// Get the default channel.
    pub fn default_channel(&self) -> &Arc<Channel> {
        &self.default_channel
    }

    /// Get the default channel name.
    pub fn default_channel_name(&self) -> &str {
        self.default_channel.name()
    }

    /// Place a newly connected client into the default channel.
    ///
    /// The client receives the welcome notice and the other members of the
    /// default channel receive the arrival notice. A client already in the
    /// default channel is left as is and nothing is sent.
    pub async fn inform_arrival(&self, client: Arc<dyn ClientHandle>) -> Arc<Channel> {
        let channel = Arc::clone(&self.default_channel);
        let nickname = client.nickname();
        let id = client.id().clone();

        if channel.add_member(Arc::clone(&client)) == JoinResult::AlreadyPresent {
            debug!("{} already in '{}'", id, channel.name());
            return channel;
        }

        Self::notify(&*client, &protocol::WELCOME, &[nickname.as_str(), channel.name()]);
        channel.broadcast_except(&protocol::ARRIVAL.render(&[nickname.as_str()]), &id);

        info!("{} ({}) arrived in '{}'", nickname, id, channel.name());
        channel
    }

    /// Announce a client's departure to its contacts.
    ///
    /// The client stays in its channels; call
    /// [`ServiceRegistry::remove_from_all_channels`] afterwards.
    pub fn inform_departure(&self, client: &dyn ClientHandle) -> BroadcastReport {
        let nickname = client.nickname();
        let report = client.send_to_contacts(&protocol::DEPARTURE.render(&[nickname.as_str()]));

        info!("{} ({}) departed", nickname, client.id());
        if !report.is_complete() {
            debug!(
                "Departure of {} not delivered to {} contacts",
                client.id(),
                report.failed.len()
            );
        }
        report
    }

    /// Create a channel on behalf of a client.
    ///
    /// The client is told whether the channel was created. An existing
    /// channel, the default one included, is never replaced. Any non-empty
    /// name is accepted.
    pub async fn add_channel(&self, client: &dyn ClientHandle, name: &str) -> ChannelCreation {
        if validate_channel_name(name).is_err() {
            Self::notify(client, &protocol::INVALID_CHANNEL_NAME, &[name]);
            return ChannelCreation::InvalidName;
        }

        let creation = {
            let mut channels = self.channels.write().await;
            match channels.get(name) {
                Some(existing) => ChannelCreation::AlreadyExists(Arc::clone(existing)),
                None => {
                    let channel = Arc::new(Channel::new(name));
                    channels.insert(name.to_string(), Arc::clone(&channel));
                    ChannelCreation::Created(channel)
                }
            }
        };

        match &creation {
            ChannelCreation::Created(_) => {
                info!("Channel '{}' created by {}", name, client.id());
                Self::notify(client, &protocol::CHANNEL_CREATED, &[name]);
            }
            _ => {
                debug!("Channel '{}' already exists, request by {}", name, client.id());
                Self::notify(client, &protocol::CHANNEL_CREATION_IMPOSSIBLE, &[name]);
            }
        }

        creation
    }

    /// Get a channel by name.
    pub async fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(name).cloned()
    }

    /// Move a client into the named channel.
    ///
    /// The client joins the target and leaves `from` (if given and
    /// different); its old peers are told, the new peers are told of the
    /// arrival and the client gets the channel-entered notice. Fails with
    /// [`CamixError::UnknownChannel`] if no such channel exists.
    ///
    /// The lookup and the insertion happen under the registry lock, so a
    /// concurrent [`ServiceRegistry::remove_channel`] either removes the
    /// channel first or sees the new member.
    pub async fn join_channel(
        &self,
        client: Arc<dyn ClientHandle>,
        from: Option<&Arc<Channel>>,
        name: &str,
    ) -> Result<Arc<Channel>> {
        let (target, joined) = {
            let channels = self.channels.read().await;
            let target = channels
                .get(name)
                .cloned()
                .ok_or_else(|| CamixError::UnknownChannel(name.to_string()))?;
            let joined = target.add_member(Arc::clone(&client));
            (target, joined)
        };

        let id = client.id().clone();
        let nickname = client.nickname();

        if let Some(previous) = from.filter(|c| !Arc::ptr_eq(c, &target)) {
            if previous.remove_member(&id) {
                let notice = protocol::CHANNEL_LEFT.render(&[nickname.as_str(), previous.name()]);
                previous.broadcast(&notice);
            }
        }

        if joined == JoinResult::Added {
            target.broadcast_except(
                &protocol::CHANNEL_JOINED.render(&[nickname.as_str(), target.name()]),
                &id,
            );
        }
        Self::notify(&*client, &protocol::CHANNEL_ENTERED, &[target.name()]);

        debug!("{} switched to '{}'", id, target.name());
        Ok(target)
    }

    /// Remove a channel from the registry.
    ///
    /// Only empty, non-default channels can be removed.
    pub async fn remove_channel(
        &self,
        name: &str,
    ) -> std::result::Result<Arc<Channel>, RemoveChannelError> {
        if name == self.default_channel.name() {
            return Err(RemoveChannelError::Protected);
        }

        let mut channels = self.channels.write().await;
        let channel = channels.get(name).ok_or(RemoveChannelError::NotFound)?;
        if channel.member_count() > 0 {
            return Err(RemoveChannelError::NotEmpty);
        }

        let channel = channels.remove(name).ok_or(RemoveChannelError::NotFound)?;
        info!("Channel '{}' removed", name);
        Ok(channel)
    }

    /// Remove a client from every channel.
    ///
    /// Returns the number of channels it was removed from.
    pub async fn remove_from_all_channels(&self, id: &ClientId) -> usize {
        let channels = self.channels.read().await;
        let removed = channels
            .values()
            .filter(|channel| channel.remove_member(id))
            .count();

        debug!("{} removed from {} channels", id, removed);
        removed
    }

    /// Snapshot of all channels, sorted by name.
    pub async fn snapshot(&self) -> Vec<ChannelInfo> {
        let channels = self.channels.read().await;
        let mut result: Vec<ChannelInfo> = channels
            .values()
            .map(|channel| ChannelInfo {
                name: channel.name().to_string(),
                member_count: channel.member_count(),
                is_default: Arc::ptr_eq(channel, &self.default_channel),
            })
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// Get the number of channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    fn notify(client: &dyn ClientHandle, template: &Template, values: &[&str]) {
        if let Err(e) = client.send_direct(&template.render(values)) {
            warn!("{} notice to {} not delivered: {}", template.name(), client.id(), e);
        }
    }
}
