//! Long-polling update source.
//!
//! Feeds decoded updates into the dispatch loop's channel in the order
//! Telegram delivers them.

use std::time::Duration;

use teloxide::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tgbridge_core::update::Update;

use crate::convert;

/// Pause after a failed `getUpdates` before asking again.
pub const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);

pub struct Poller {
    bot: Bot,
    offset: i32,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(bot: Bot, resume_from: i32, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            bot,
            offset: resume_from,
            timeout,
            cancel,
        }
    }

    /// Next update id that will be requested.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Poll until cancelled or until the receiving side goes away.
    pub async fn run(mut self, tx: mpsc::Sender<Update>) {
        info!(offset = self.offset, "Polling telegram for updates");
        let timeout_secs = u32::try_from(self.timeout.as_secs()).unwrap_or(u32::MAX);

        loop {
            let req = self
                .bot
                .get_updates()
                .offset(self.offset)
                .timeout(timeout_secs);

            let res = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                res = req.send() => res,
            };

            let updates = match res {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "Failed to get updates, retrying");
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => continue,
                    }
                }
            };

            for raw in updates {
                self.offset = self.offset.max(raw.id.saturating_add(1));
                let update = convert::update(raw);
                debug!(update_id = update.id, "Queueing update");

                let delivered = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => false,
                    sent = tx.send(update) => sent.is_ok(),
                };
                if !delivered {
                    info!(offset = self.offset, "Update polling stopped");
                    return;
                }
            }
        }

        info!(offset = self.offset, "Update polling stopped");
    }
}
