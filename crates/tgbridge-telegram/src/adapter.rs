use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use teloxide::prelude::*;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tgbridge_core::{
    callbacks::CallbackRegistry,
    config::Config,
    dispatch::{DispatchLoop, DispatchStats},
    domain::User,
    errors::Error,
    messaging::port::{EventSink, MessagingPort},
    outbound::OutboundSender,
    Result,
};

use crate::{convert, poller::Poller, TelegramMessenger};

struct Tasks {
    poller: JoinHandle<()>,
    dispatch: JoinHandle<DispatchStats>,
}

/// Bridges one bot account to the host runtime.
///
/// `connect` verifies the token, `start` launches polling and dispatch,
/// `stop` cancels both. Sends through [`TelegramAdapter::sender`] work
/// independently of the lifecycle.
pub struct TelegramAdapter {
    bot: Bot,
    cfg: Config,
    me: User,
    messenger: Arc<dyn MessagingPort>,
    callbacks: Arc<CallbackRegistry>,
    cancel: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Option<Tasks>>,
}

impl TelegramAdapter {
    /// Authenticate against the Bot API. Fails if the token is rejected or
    /// Telegram is unreachable.
    pub async fn connect(cfg: Config) -> Result<Self> {
        let bot = Bot::new(cfg.telegram_bot_token.clone());
        let me = bot
            .get_me()
            .await
            .map_err(|e| Error::Initialization(format!("failed to get bot user: {e}")))?;

        let me = convert::user(&me.user);
        info!(
            user = me.username.as_deref().unwrap_or_default(),
            user_id = me.id.0,
            "Connected to telegram API"
        );
        Ok(Self::from_parts(bot, cfg, me))
    }

    fn from_parts(bot: Bot, cfg: Config, me: User) -> Self {
        Self {
            messenger: Arc::new(TelegramMessenger::new(bot.clone())),
            callbacks: Arc::new(CallbackRegistry::new(cfg.callback_ttl)),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(None),
            bot,
            cfg,
            me,
        }
    }

    pub fn bot_user(&self) -> &User {
        &self.me
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn sender(&self) -> OutboundSender {
        OutboundSender::new(
            self.messenger.clone(),
            self.callbacks.clone(),
            self.cfg.parse_mode,
        )
    }

    /// Launch polling and the dispatch loop; events go to `sink`.
    ///
    /// An adapter runs once: starting it again, even after `stop`, fails.
    pub fn start(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Lifecycle("adapter already started".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.cfg.update_buffer.max(1));

        let poller = Poller::new(
            self.bot.clone(),
            self.cfg.update_resume_from,
            self.cfg.update_timeout,
            self.cancel.child_token(),
        );
        let dispatch = DispatchLoop::new(
            self.messenger.clone(),
            self.callbacks.clone(),
            sink,
            self.cancel.child_token(),
        );

        let tasks = Tasks {
            poller: tokio::spawn(poller.run(tx)),
            dispatch: tokio::spawn(dispatch.run(rx)),
        };
        *self.tasks.lock().unwrap_or_else(|p| p.into_inner()) = Some(tasks);
        debug!("Adapter started");
        Ok(())
    }

    /// Signal both tasks to finish. In-flight callback handlers keep running.
    pub fn stop(&self) {
        debug!("Stopping adapter");
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for polling and dispatch to end (after `stop`, or once the update
    /// stream is exhausted). Returns the dispatch counters.
    pub async fn join(&self) -> Result<DispatchStats> {
        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let Some(Tasks { poller, dispatch }) = tasks else {
            return Err(Error::Lifecycle("adapter is not running".to_string()));
        };

        poller
            .await
            .map_err(|e| Error::Lifecycle(format!("poller task failed: {e}")))?;
        dispatch
            .await
            .map_err(|e| Error::Lifecycle(format!("dispatch task failed: {e}")))
    }
}
