use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile},
};

use tokio::time::sleep;
use tracing::warn;

use tgbridge_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Asset, InlineKeyboard, ParseMode},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(e.to_string())
    }

    fn sent(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    /// Retries once when Telegram asks us to back off; everything else is
    /// returned to the caller as is.
    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        warn!(retry_after_secs = d.as_secs(), "Rate limited by telegram");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[allow(deprecated)]
pub(crate) fn tg_parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Plain => None,
        ParseMode::Html => Some(teloxide::types::ParseMode::Html),
        ParseMode::MarkdownV2 => Some(teloxide::types::ParseMode::MarkdownV2),
        ParseMode::Markdown => Some(teloxide::types::ParseMode::Markdown),
    }
}

pub(crate) fn input_file(asset: Asset) -> InputFile {
    match asset {
        Asset::ByReference(file_id) => InputFile::file_id(file_id),
        Asset::ByContent { bytes, file_name } => InputFile::memory(bytes.into_owned()).file_name(file_name),
    }
}

pub(crate) fn inline_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef> {
        let mode = tg_parse_mode(mode);
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                req
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let file = input_file(photo);
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_photo(Self::tg_chat(chat_id), file.clone());
                if let Some(caption) = caption {
                    req = req.caption(caption.to_string());
                }
                req
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_animation(
        &self,
        chat_id: ChatId,
        animation: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let file = input_file(animation);
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_animation(Self::tg_chat(chat_id), file.clone());
                if let Some(caption) = caption {
                    req = req.caption(caption.to_string());
                }
                req
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_sticker(&self, chat_id: ChatId, sticker: Asset) -> Result<MessageRef> {
        let file = input_file(sticker);
        let msg = self
            .with_retry(|| self.bot.send_sticker(Self::tg_chat(chat_id), file.clone()))
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
        mode: ParseMode,
    ) -> Result<MessageRef> {
        let markup = inline_markup(keyboard);
        let mode = tg_parse_mode(mode);

        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .reply_markup(markup.clone());
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                req
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    /// Single attempt: acknowledgements are best effort and never retried.
    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(callback_id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
