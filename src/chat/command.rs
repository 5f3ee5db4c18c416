//! Chat command parser for Camix.
//!
//! Lines starting with `/` are commands; everything else is a message for
//! the client's current channel.

use super::registry::ChannelInfo;

/// Result of parsing a chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Regular chat message.
    Message(String),
    /// Parsed command.
    Command(ChatCommand),
}

/// A parsed chat command.
///
/// Commands taking an argument carry it trimmed, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Change nickname.
    Nick(String),
    /// Create a channel.
    Create(String),
    /// Switch to another channel.
    Join(String),
    /// List channels.
    List,
    /// List members of the current channel.
    Who,
    /// Remove an empty channel.
    Delete(String),
    /// Show help message.
    Help,
    /// Disconnect.
    Quit,
    /// Unknown command.
    Unknown(String),
}

impl ChatCommand {
    /// Get the command name.
    pub fn name(&self) -> &str {
        match self {
            ChatCommand::Nick(_) => "nick",
            ChatCommand::Create(_) => "create",
            ChatCommand::Join(_) => "join",
            ChatCommand::List => "list",
            ChatCommand::Who => "who",
            ChatCommand::Delete(_) => "delete",
            ChatCommand::Help => "help",
            ChatCommand::Quit => "quit",
            ChatCommand::Unknown(cmd) => cmd,
        }
    }

    /// Get the argument of commands that take one.
    pub fn argument(&self) -> Option<&str> {
        match self {
            ChatCommand::Nick(arg)
            | ChatCommand::Create(arg)
            | ChatCommand::Join(arg)
            | ChatCommand::Delete(arg) => Some(arg),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.argument() {
            Some(arg) if !arg.is_empty() => write!(f, "/{} {}", self.name(), arg),
            _ => write!(f, "/{}", self.name()),
        }
    }
}

/// Parse a chat input line into a message or command.
pub fn parse_input(input: &str) -> ChatInput {
    let trimmed = input.trim();

    let Some(without_slash) = trimmed.strip_prefix('/') else {
        return ChatInput::Message(trimmed.to_string());
    };

    let (cmd, args) = match without_slash.find(char::is_whitespace) {
        Some(pos) => (&without_slash[..pos], without_slash[pos..].trim()),
        None => (without_slash, ""),
    };

    let command = match cmd.to_lowercase().as_str() {
        "nick" | "n" => ChatCommand::Nick(args.to_string()),
        "create" | "c" => ChatCommand::Create(args.to_string()),
        "join" | "j" => ChatCommand::Join(args.to_string()),
        "list" | "l" => ChatCommand::List,
        "who" | "w" => ChatCommand::Who,
        "delete" | "d" => ChatCommand::Delete(args.to_string()),
        "help" | "h" | "?" => ChatCommand::Help,
        "quit" | "q" | "exit" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(cmd.to_string()),
    };

    ChatInput::Command(command)
}

/// Chat command information for help display.
pub struct CommandInfo {
    /// Command name.
    pub name: &'static str,
    /// Command aliases.
    pub aliases: &'static [&'static str],
    /// Command syntax.
    pub syntax: &'static str,
    /// Command description.
    pub description: &'static str,
}

/// Get all available command information.
pub fn get_command_help() -> Vec<CommandInfo> {
    vec![
        CommandInfo {
            name: "nick",
            aliases: &["n"],
            syntax: "/nick <nickname>",
            description: "Change your nickname",
        },
        CommandInfo {
            name: "create",
            aliases: &["c"],
            syntax: "/create <channel>",
            description: "Create a new channel",
        },
        CommandInfo {
            name: "join",
            aliases: &["j"],
            syntax: "/join <channel>",
            description: "Switch to another channel",
        },
        CommandInfo {
            name: "list",
            aliases: &["l"],
            syntax: "/list",
            description: "List the channels",
        },
        CommandInfo {
            name: "who",
            aliases: &["w"],
            syntax: "/who",
            description: "List the members of your channel",
        },
        CommandInfo {
            name: "delete",
            aliases: &["d"],
            syntax: "/delete <channel>",
            description: "Remove an empty channel",
        },
        CommandInfo {
            name: "help",
            aliases: &["h", "?"],
            syntax: "/help",
            description: "Show this help",
        },
        CommandInfo {
            name: "quit",
            aliases: &["q", "exit"],
            syntax: "/quit",
            description: "Leave the chat",
        },
    ]
}

/// Get the syntax line of a command, by name.
pub fn command_syntax(name: &str) -> Option<&'static str> {
    get_command_help()
        .into_iter()
        .find(|info| info.name == name)
        .map(|info| info.syntax)
}

/// Format the help message for display.
pub fn format_help() -> String {
    let mut lines = vec!["* Commands:".to_string()];

    for info in get_command_help() {
        let aliases = info
            .aliases
            .iter()
            .map(|a| format!("/{a}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "  {:<20} {} ({})",
            info.syntax, info.description, aliases
        ));
    }
    lines.push("  Any other line is sent to your current channel.".to_string());

    lines.join("\n")
}

/// Format the member list of a channel for display.
pub fn format_who(members: &[String], channel_name: &str) -> String {
    let mut lines = vec![format!(
        "* Members of '{}' ({}):",
        channel_name,
        members.len()
    )];

    if members.is_empty() {
        lines.push("  (nobody)".to_string());
    } else {
        for name in members {
            lines.push(format!("  {name}"));
        }
    }

    lines.join("\n")
}

/// Format the channel list for display.
///
/// `current` marks the caller's channel.
pub fn format_channel_list(channels: &[ChannelInfo], current: &str) -> String {
    let mut lines = vec![format!("* Channels ({}):", channels.len())];

    for info in channels {
        let mut line = format!(
            "  {} ({} member{})",
            info.name,
            info.member_count,
            if info.member_count == 1 { "" } else { "s" }
        );
        if info.is_default {
            line.push_str(" [default]");
        }
        if info.name == current {
            line.push_str(" <- you are here");
        }
        lines.push(line);
    }

    lines.join("\n")
}
