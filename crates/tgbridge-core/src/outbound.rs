//! Host-facing send operations.
//!
//! Every operation takes the channel as the host runtime knows it (decimal
//! chat id) and fails with [`crate::Error::ChannelIdentifierInvalid`] before touching
//! the platform when it does not parse.

use std::{fmt, sync::Arc};

use tracing::{debug, info};

use crate::{
    callbacks::{Callback, CallbackRegistry},
    domain::{parse_chat_id, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{Asset, InlineButton, InlineKeyboard, ParseMode},
    },
    Result,
};

pub const BUTTON_TOKEN_PREFIX: &str = "_button_";

/// An inline button and the handler run when it is pressed.
#[derive(Clone)]
pub struct Button {
    token: String,
    label: String,
    handler: Callback,
}

impl Button {
    /// The interaction token is derived from the label, so two buttons with
    /// the same label (case-insensitively) share a registry slot.
    pub fn new(label: impl Into<String>, handler: Callback) -> Self {
        let label = label.into();
        Self {
            token: format!("{BUTTON_TOKEN_PREFIX}{}", label.to_lowercase()),
            label,
            handler,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("token", &self.token)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct OutboundSender {
    messenger: Arc<dyn MessagingPort>,
    callbacks: Arc<CallbackRegistry>,
    parse_mode: ParseMode,
}

impl OutboundSender {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        callbacks: Arc<CallbackRegistry>,
        parse_mode: ParseMode,
    ) -> Self {
        Self {
            messenger,
            callbacks,
            parse_mode,
        }
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// Send `text` formatted with the configured parse mode.
    pub async fn send(&self, text: &str, channel: &str) -> Result<MessageRef> {
        let chat_id = parse_chat_id(channel)?;
        info!(chat_id = chat_id.0, "Sending message to chat");
        self.messenger
            .send_text(chat_id, text, self.parse_mode)
            .await
    }

    pub async fn send_photo(
        &self,
        channel: &str,
        photo: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let chat_id = parse_chat_id(channel)?;
        debug!(chat_id = chat_id.0, "Sending photo to chat");
        self.messenger
            .send_photo(chat_id, photo, non_empty(caption))
            .await
    }

    /// GIFs go out as Telegram animations.
    pub async fn send_gif(
        &self,
        channel: &str,
        gif: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let chat_id = parse_chat_id(channel)?;
        debug!(chat_id = chat_id.0, "Sending animation to chat");
        self.messenger
            .send_animation(chat_id, gif, non_empty(caption))
            .await
    }

    pub async fn send_sticker(&self, channel: &str, sticker: Asset) -> Result<MessageRef> {
        let chat_id = parse_chat_id(channel)?;
        debug!(chat_id = chat_id.0, "Sending sticker to chat");
        self.messenger.send_sticker(chat_id, sticker).await
    }

    /// Send `text` with one row of inline buttons and register each button's
    /// handler under its token.
    pub async fn send_buttons(
        &self,
        channel: &str,
        text: &str,
        buttons: Vec<Button>,
    ) -> Result<MessageRef> {
        let chat_id = parse_chat_id(channel)?;

        let mut row = Vec::with_capacity(buttons.len());
        for button in buttons {
            debug!(chat_id = chat_id.0, token = %button.token, "Registering button callback");
            self.callbacks.register(button.token.clone(), button.handler);
            row.push(InlineButton {
                label: button.label,
                callback_data: button.token,
            });
        }

        self.messenger
            .send_inline_keyboard(
                chat_id,
                text,
                InlineKeyboard::single_row(row),
                self.parse_mode,
            )
            .await
    }
}

fn non_empty(caption: Option<&str>) -> Option<&str> {
    caption.filter(|c| !c.is_empty())
}
