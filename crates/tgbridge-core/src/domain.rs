use serde::Serialize;

use crate::{errors::Error, Result};

/// Telegram user id. Unsigned, matching the Bot API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub u64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// Channel identifier as seen by the host runtime: the chat id in decimal.
pub fn format_chat_id(chat_id: ChatId) -> String {
    chat_id.0.to_string()
}

/// Inverse of [`format_chat_id`]. Anything that is not a plain decimal `i64`
/// (surrounding whitespace included) is rejected.
pub fn parse_chat_id(channel: &str) -> Result<ChatId> {
    channel
        .parse::<i64>()
        .map(ChatId)
        .map_err(|source| Error::ChannelIdentifierInvalid {
            channel: channel.to_string(),
            source,
        })
}
