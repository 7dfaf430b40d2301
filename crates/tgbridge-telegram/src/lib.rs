//! Telegram adapter (teloxide).
//!
//! Implements the `tgbridge-core` ports over the Telegram Bot API and owns the
//! adapter lifecycle: long polling, the dispatch loop, and shutdown.

pub mod adapter;
pub mod convert;
pub mod messenger;
pub mod poller;

pub use adapter::TelegramAdapter;
pub use messenger::TelegramMessenger;
