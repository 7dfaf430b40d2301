//! Events emitted to the host runtime.

use serde::Serialize;

use crate::{
    domain::{format_chat_id, Chat, User},
    update::{IncomingMessage, ParsedCommand},
};

/// One inbound message yields exactly one event: commands are not also
/// reported as plain messages.
#[derive(Clone, Debug, Serialize)]
pub enum Event {
    Message(MessageEvent),
    Command(CommandEvent),
}

impl Event {
    /// Channel the event originated from, in the form outbound sends accept.
    pub fn channel(&self) -> String {
        match self {
            Event::Message(m) => m.channel.clone(),
            Event::Command(c) => c.channel(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageEvent {
    pub text: String,
    pub channel: String,
    /// Decimal sender id; empty when the message has no sender.
    pub author_id: String,
    pub raw: IncomingMessage,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommandEvent {
    pub arg0: String,
    pub args: Vec<String>,
    pub sender: Option<User>,
    pub chat: Chat,
    pub raw: IncomingMessage,
}

impl CommandEvent {
    pub fn from_command(cmd: ParsedCommand, msg: IncomingMessage) -> Self {
        Self {
            arg0: cmd.name,
            args: cmd.args,
            sender: msg.from.clone(),
            chat: msg.chat.clone(),
            raw: msg,
        }
    }

    pub fn channel(&self) -> String {
        format_chat_id(self.chat.id)
    }
}

impl MessageEvent {
    pub fn from_message(msg: IncomingMessage) -> Self {
        Self {
            text: msg.body().trim().to_string(),
            channel: format_chat_id(msg.chat.id),
            author_id: msg
                .from
                .as_ref()
                .map(|u| u.id.0.to_string())
                .unwrap_or_default(),
            raw: msg,
        }
    }
}
