use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatId, MessageRef},
    events::Event,
    messaging::types::{Asset, InlineKeyboard, ParseMode},
    Result,
};

/// Outbound side of the messaging platform.
///
/// Telegram is the implementation today; tests use in-memory fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef>;

    async fn send_animation(
        &self,
        chat_id: ChatId,
        animation: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef>;

    async fn send_sticker(&self, chat_id: ChatId, sticker: Asset) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
        mode: ParseMode,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()>;
}

/// Where the dispatch loop delivers events: the host runtime.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

#[async_trait]
impl EventSink for mpsc::Sender<Event> {
    async fn emit(&self, event: Event) {
        if self.send(event).await.is_err() {
            tracing::warn!("event receiver dropped; discarding event");
        }
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<Event> {
    async fn emit(&self, event: Event) {
        if self.send(event).is_err() {
            tracing::warn!("event receiver dropped; discarding event");
        }
    }
}
