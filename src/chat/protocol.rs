//! Protocol catalog for Camix.
//!
//! Every notification the service sends is rendered from one of the
//! templates below. Slots are written `{}` and filled positionally, so the
//! text on the wire is fully determined by the template and its values.

/// A named message template with positional `{}` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    name: &'static str,
    pattern: &'static str,
}

impl Template {
    /// Create a template.
    pub const fn new(name: &'static str, pattern: &'static str) -> Self {
        Self { name, pattern }
    }

    /// Get the template name, used to label log lines.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Render the template, filling slots in order.
    ///
    /// Slots without a matching value render empty; surplus values are
    /// ignored. Values are inserted verbatim and never re-expanded.
    pub fn render(&self, values: &[&str]) -> String {
        let extra: usize = values.iter().map(|v| v.len()).sum();
        let mut out = String::with_capacity(self.pattern.len() + extra);
        let mut values = values.iter();
        let mut rest = self.pattern;

        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            if let Some(value) = values.next() {
                out.push_str(value);
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Sent to a client right after it connects. Slots: nickname, channel.
pub const WELCOME: Template = Template::new(
    "welcome",
    "* Welcome to Camix, {}. You are in channel '{}'. Type /help for the list of commands.",
);

/// Announced to the default channel when a client connects. Slot: nickname.
pub const ARRIVAL: Template = Template::new("arrival", "* {} has joined the chat.");

/// Delivered to a client's contacts when it disconnects. Slot: nickname.
pub const DEPARTURE: Template = Template::new("departure", "* {} has left the chat.");

/// Channel creation succeeded. Slot: channel.
pub const CHANNEL_CREATED: Template =
    Template::new("channel_created", "* Channel '{}' created.");

/// Channel creation refused because the name is taken. Slot: channel.
pub const CHANNEL_CREATION_IMPOSSIBLE: Template = Template::new(
    "channel_creation_impossible",
    "* Channel '{}' cannot be created: the name is already taken.",
);

/// Channel creation refused because the name is malformed. Slot: channel.
pub const INVALID_CHANNEL_NAME: Template =
    Template::new("invalid_channel_name", "* '{}' is not a valid channel name.");

/// Sent to a client that switched channel. Slot: channel.
pub const CHANNEL_ENTERED: Template =
    Template::new("channel_entered", "* You are now in channel '{}'.");

/// Announced to a channel a client switched into. Slots: nickname, channel.
pub const CHANNEL_JOINED: Template =
    Template::new("channel_joined", "* {} has joined channel '{}'.");

/// Announced to a channel a client switched out of. Slots: nickname, channel.
pub const CHANNEL_LEFT: Template = Template::new("channel_left", "* {} has left channel '{}'.");

/// Slot: channel.
pub const UNKNOWN_CHANNEL: Template =
    Template::new("unknown_channel", "* Channel '{}' does not exist.");

/// Slot: channel.
pub const CHANNEL_REMOVED: Template =
    Template::new("channel_removed", "* Channel '{}' removed.");

/// Slots: channel, reason.
pub const CHANNEL_REMOVAL_IMPOSSIBLE: Template = Template::new(
    "channel_removal_impossible",
    "* Channel '{}' cannot be removed: {}.",
);

/// Slots: old nickname, new nickname.
pub const NICKNAME_CHANGED: Template =
    Template::new("nickname_changed", "* {} is now known as {}.");

/// Slot: rejected nickname.
pub const INVALID_NICKNAME: Template =
    Template::new("invalid_nickname", "* '{}' is not a valid nickname.");

/// An ordinary chat line. Slots: nickname, text.
pub const CHAT_MESSAGE: Template = Template::new("chat_message", "<{}> {}");

/// Slot: maximum length.
pub const MESSAGE_TOO_LONG: Template = Template::new(
    "message_too_long",
    "* Message too long (maximum {} characters).",
);

/// Slot: command name.
pub const UNKNOWN_COMMAND: Template = Template::new(
    "unknown_command",
    "* Unknown command: /{}. Type /help for the list of commands.",
);

/// Slot: command syntax.
pub const MISSING_ARGUMENT: Template = Template::new("missing_argument", "* Usage: {}");
