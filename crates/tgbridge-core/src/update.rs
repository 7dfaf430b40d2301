//! Platform-agnostic inbound update model.
//!
//! Telegram-specific decoding lives in the adapter crate; the dispatch loop
//! only sees these types.

use serde::Serialize;

use crate::domain::{Chat, MessageId, User};

/// Marker that turns a text message into a command.
pub const COMMAND_MARKER: char = '/';

#[derive(Clone, Debug, Serialize)]
pub struct Update {
    /// Platform-assigned, monotonically increasing. Also the resume offset.
    pub id: i32,
    pub kind: UpdateKind,
}

#[derive(Clone, Debug, Serialize)]
pub enum UpdateKind {
    CallbackQuery(CallbackQuery),
    Message(IncomingMessage),
    /// Anything the bridge does not handle (edits, polls, member updates...).
    Other,
}

#[derive(Clone, Debug, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Interaction token attached to the pressed button.
    pub data: Option<String>,
    /// Message carrying the keyboard. Absent for inline-mode messages.
    pub message: Option<IncomingMessage>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub chat: Chat,
    /// Absent for channel posts.
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl IncomingMessage {
    /// Text if present, otherwise the media caption.
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }

    pub fn command(&self) -> Option<ParsedCommand> {
        self.text.as_deref().and_then(parse_command)
    }
}

/// Parse `/name[@bot] arg1 arg2`.
///
/// Arguments are whitespace separated; a bare `/name` has no arguments.
/// A lone marker (`/`) is not a command.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let rest = text.strip_prefix(COMMAND_MARKER)?;
    let (head, arg_str) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let name = head.split_once('@').map_or(head, |(name, _bot)| name);
    if name.is_empty() {
        return None;
    }

    Some(ParsedCommand {
        name: name.to_string(),
        args: arg_str.split_whitespace().map(str::to_string).collect(),
    })
}
