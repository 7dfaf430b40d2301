//! In-memory [`MessagingPort`] used by the core tests.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Asset, InlineKeyboard, ParseMode},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Text {
        chat_id: ChatId,
        text: String,
        mode: ParseMode,
    },
    Photo {
        chat_id: ChatId,
        asset: Asset,
        caption: Option<String>,
    },
    Animation {
        chat_id: ChatId,
        asset: Asset,
        caption: Option<String>,
    },
    Sticker {
        chat_id: ChatId,
        asset: Asset,
    },
    Keyboard {
        chat_id: ChatId,
        text: String,
        keyboard: InlineKeyboard,
        mode: ParseMode,
    },
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    calls: Mutex<Vec<Call>>,
    answers: Mutex<Vec<String>>,
    fail_sends: bool,
    fail_answers: bool,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            fail_answers: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().unwrap().clone()
    }

    /// Wait until at least `n` callback answers were attempted.
    pub async fn wait_for_answers(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.answers.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for callback answers");
    }

    fn record(&self, chat_id: ChatId, call: Call) -> Result<MessageRef> {
        if self.fail_sends {
            return Err(Error::Transport("Bad Request: chat not found".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        })
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef> {
        self.record(
            chat_id,
            Call::Text {
                chat_id,
                text: text.to_string(),
                mode,
            },
        )
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            Call::Photo {
                chat_id,
                asset: photo,
                caption: caption.map(str::to_string),
            },
        )
    }

    async fn send_animation(
        &self,
        chat_id: ChatId,
        animation: Asset,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            Call::Animation {
                chat_id,
                asset: animation,
                caption: caption.map(str::to_string),
            },
        )
    }

    async fn send_sticker(&self, chat_id: ChatId, sticker: Asset) -> Result<MessageRef> {
        self.record(
            chat_id,
            Call::Sticker {
                chat_id,
                asset: sticker,
            },
        )
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
        mode: ParseMode,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            Call::Keyboard {
                chat_id,
                text: text.to_string(),
                keyboard,
                mode,
            },
        )
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.answers.lock().unwrap().push(callback_id.to_string());
        if self.fail_answers {
            return Err(Error::Transport("query is too old".to_string()));
        }
        Ok(())
    }
}
