//! The update dispatch loop.
//!
//! A single task consumes decoded updates in delivery order and turns each one
//! into at most one host-runtime event. Button presses are routed to the
//! callback registry and handled on their own task so a slow handler never
//! holds up the next update.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::{
    callbacks::CallbackRegistry,
    domain::format_chat_id,
    events::{CommandEvent, Event, MessageEvent},
    messaging::port::{EventSink, MessagingPort},
    update::{CallbackQuery, IncomingMessage, Update, UpdateKind},
};

/// Counters reported when the loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub processed: u64,
    pub commands: u64,
    pub messages: u64,
    pub callbacks: u64,
    pub skipped: u64,
}

pub struct DispatchLoop {
    messenger: Arc<dyn MessagingPort>,
    callbacks: Arc<CallbackRegistry>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl DispatchLoop {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        callbacks: Arc<CallbackRegistry>,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            messenger,
            callbacks,
            sink,
            cancel,
        }
    }

    /// Run until cancelled or until the update source closes.
    ///
    /// Cancellation wins over a ready update, so nothing already buffered is
    /// processed once it fires. An iteration in progress always completes.
    pub async fn run(self, mut updates: mpsc::Receiver<Update>) -> DispatchStats {
        let mut stats = DispatchStats::default();

        loop {
            let update = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Cancelling event loop");
                    break;
                }
                next = updates.recv() => match next {
                    Some(update) => update,
                    None => {
                        debug!("Update source closed");
                        break;
                    }
                },
            };

            stats.processed += 1;
            self.handle(update, &mut stats).await;
        }

        info!(
            processed = stats.processed,
            commands = stats.commands,
            messages = stats.messages,
            callbacks = stats.callbacks,
            skipped = stats.skipped,
            "Event loop stopped"
        );
        stats
    }

    async fn handle(&self, update: Update, stats: &mut DispatchStats) {
        let update_id = update.id;
        match update.kind {
            UpdateKind::CallbackQuery(q) => {
                if self.handle_callback_query(update_id, q) {
                    stats.callbacks += 1;
                } else {
                    stats.skipped += 1;
                }
            }
            UpdateKind::Message(m) => {
                if let Some(cmd) = m.command() {
                    debug!(
                        update_id,
                        command = %cmd.name,
                        args = ?cmd.args,
                        "Received command"
                    );
                    stats.commands += 1;
                    self.emit(Event::Command(CommandEvent::from_command(cmd, m)))
                        .await;
                } else {
                    self.handle_message(update_id, m).await;
                    stats.messages += 1;
                }
            }
            UpdateKind::Other => {
                debug!(update_id, "Skipping unsupported update");
                stats.skipped += 1;
            }
        }
    }

    async fn handle_message(&self, update_id: i32, m: IncomingMessage) {
        debug!(update_id, message_id = m.id.0, "Received message");
        self.emit(Event::Message(MessageEvent::from_message(m)))
            .await;
    }

    /// Hand `event` to the sink unless cancellation fires first. A sink that
    /// stopped reading must not keep the loop alive after `stop`.
    async fn emit(&self, event: Event) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Dropping event on cancellation");
            }
            _ = self.sink.emit(event) => {}
        }
    }

    /// Returns whether a handler was scheduled.
    fn handle_callback_query(&self, update_id: i32, q: CallbackQuery) -> bool {
        let data = q.data.unwrap_or_default();
        let span = tracing::info_span!(
            "callback_query",
            update_id,
            callback_query_id = %q.id,
            callback_data = %data
        );
        let _entered = span.enter();
        debug!("Received callback query");

        let Some(handler) = self.callbacks.lookup(&data) else {
            warn!("No registered callback");
            return false;
        };
        let Some(origin) = q.message else {
            warn!("Callback query has no originating message");
            return false;
        };

        let channel = format_chat_id(origin.chat.id);
        let messenger = self.messenger.clone();
        let query_id = q.id;
        tokio::spawn(
            async move {
                debug!("Processing callback query");
                if let Err(e) = handler(channel).await {
                    error!(error = %e, "Failed processing callback query");
                }
                debug!("Answering callback query");
                if let Err(e) = messenger.answer_callback_query(&query_id).await {
                    error!(error = %e, "Failed answering callback query");
                }
            }
            .instrument(span.clone()),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;
    use crate::{
        callbacks::{callback, Callback},
        domain::{Chat, ChatId, ChatKind, MessageId, User, UserId},
        errors::Error,
        messaging::fake::FakeMessenger,
    };

    struct Harness {
        messenger: Arc<FakeMessenger>,
        callbacks: Arc<CallbackRegistry>,
        cancel: CancellationToken,
        events_rx: mpsc::UnboundedReceiver<Event>,
        dispatch: DispatchLoop,
    }

    fn harness(messenger: FakeMessenger) -> Harness {
        let messenger = Arc::new(messenger);
        let callbacks = Arc::new(CallbackRegistry::new(Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let dispatch = DispatchLoop::new(
            messenger.clone(),
            callbacks.clone(),
            Arc::new(events_tx),
            cancel.clone(),
        );
        Harness {
            messenger,
            callbacks,
            cancel,
            events_rx,
            dispatch,
        }
    }

    fn user(id: u64) -> User {
        User {
            id: UserId(id),
            is_bot: false,
            first_name: "Ada".to_string(),
            username: Some("ada".to_string()),
        }
    }

    fn message(chat: i64, from: Option<u64>, text: &str) -> IncomingMessage {
        IncomingMessage {
            id: MessageId(10),
            chat: Chat {
                id: ChatId(chat),
                kind: ChatKind::Private,
                title: None,
                username: None,
            },
            from: from.map(user),
            text: Some(text.to_string()),
            caption: None,
        }
    }

    fn msg_update(id: i32, chat: i64, from: u64, text: &str) -> Update {
        Update {
            id,
            kind: UpdateKind::Message(message(chat, Some(from), text)),
        }
    }

    fn callback_update(id: i32, query_id: &str, data: &str, chat: i64) -> Update {
        Update {
            id,
            kind: UpdateKind::CallbackQuery(CallbackQuery {
                id: query_id.to_string(),
                from: user(7),
                data: Some(data.to_string()),
                message: Some(message(chat, None, "Continue?")),
            }),
        }
    }

    /// Feed `updates` through a fresh loop and wait for it to drain.
    async fn run_all(dispatch: DispatchLoop, updates: Vec<Update>) -> DispatchStats {
        let (tx, rx) = mpsc::channel(16);
        for u in updates {
            tx.send(u).await.unwrap();
        }
        drop(tx);
        dispatch.run(rx).await
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    fn recording_callback(result: fn() -> crate::Result<()>) -> (Callback, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb = callback(move |channel| {
            sink.lock().unwrap().push(channel);
            async move { result() }
        });
        (cb, seen)
    }

    #[tokio::test]
    async fn plain_message_emits_message_event() {
        let mut h = harness(FakeMessenger::new());
        let stats = run_all(h.dispatch, vec![msg_update(1, 42, 7, "  hello \n")]).await;

        let events = drain(&mut h.events_rx);
        assert_eq!(events.len(), 1);
        let Event::Message(m) = &events[0] else {
            panic!("expected message event, got {events:?}");
        };
        assert_eq!(m.text, "hello");
        assert_eq!(m.channel, "42");
        assert_eq!(m.author_id, "7");
        assert_eq!(m.raw.id, MessageId(10));
        assert_eq!(stats.messages, 1);
    }

    #[tokio::test]
    async fn message_without_sender_has_empty_author() {
        let mut h = harness(FakeMessenger::new());
        let update = Update {
            id: 1,
            kind: UpdateKind::Message(message(-1001, None, "news")),
        };
        run_all(h.dispatch, vec![update]).await;

        let events = drain(&mut h.events_rx);
        let Event::Message(m) = &events[0] else {
            panic!("expected message event");
        };
        assert_eq!(m.channel, "-1001");
        assert_eq!(m.author_id, "");
    }

    #[tokio::test]
    async fn command_emits_only_command_event() {
        let mut h = harness(FakeMessenger::new());
        let stats = run_all(
            h.dispatch,
            vec![msg_update(1, 42, 7, "/ping foo bar"), msg_update(2, 42, 7, "/ping")],
        )
        .await;

        let events = drain(&mut h.events_rx);
        assert_eq!(events.len(), 2);
        let Event::Command(first) = &events[0] else {
            panic!("expected command event, got {events:?}");
        };
        assert_eq!(first.arg0, "ping");
        assert_eq!(first.args, vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(first.channel(), "42");
        assert_eq!(first.sender.as_ref().map(|u| u.id), Some(UserId(7)));

        let Event::Command(bare) = &events[1] else {
            panic!("expected command event");
        };
        assert!(bare.args.is_empty());
        assert_eq!(stats.commands, 2);
        assert_eq!(stats.messages, 0);
    }

    #[tokio::test]
    async fn other_updates_emit_nothing() {
        let mut h = harness(FakeMessenger::new());
        let stats = run_all(
            h.dispatch,
            vec![Update {
                id: 3,
                kind: UpdateKind::Other,
            }],
        )
        .await;

        assert!(drain(&mut h.events_rx).is_empty());
        assert_eq!(stats.skipped, 1);
        assert!(h.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_callback_token_is_dropped_without_answer() {
        let mut h = harness(FakeMessenger::new());
        let stats = run_all(h.dispatch, vec![callback_update(1, "q1", "_button_gone", 42)]).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(drain(&mut h.events_rx).is_empty());
        assert!(h.messenger.answers().is_empty());
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.callbacks, 0);
    }

    #[tokio::test]
    async fn registered_callback_runs_once_and_is_answered() {
        let mut h = harness(FakeMessenger::new());
        let (cb, seen) = recording_callback(|| Ok(()));
        h.callbacks.register("_button_yes", cb);

        let stats = run_all(h.dispatch, vec![callback_update(1, "q1", "_button_yes", 42)]).await;
        h.messenger.wait_for_answers(1).await;

        assert_eq!(*seen.lock().unwrap(), vec!["42".to_string()]);
        assert_eq!(h.messenger.answers(), vec!["q1".to_string()]);
        assert!(drain(&mut h.events_rx).is_empty());
        assert_eq!(stats.callbacks, 1);
    }

    #[tokio::test]
    async fn failing_callback_is_still_answered() {
        let h = harness(FakeMessenger::new());
        let (cb, seen) = recording_callback(|| Err(Error::Callback("boom".to_string())));
        h.callbacks.register("_button_no", cb);

        run_all(h.dispatch, vec![callback_update(1, "q2", "_button_no", -5)]).await;
        h.messenger.wait_for_answers(1).await;

        assert_eq!(*seen.lock().unwrap(), vec!["-5".to_string()]);
        assert_eq!(h.messenger.answers(), vec!["q2".to_string()]);
    }

    #[tokio::test]
    async fn answer_failure_does_not_stop_the_loop() {
        let mut h = harness(FakeMessenger::failing());
        let (cb, _seen) = recording_callback(|| Ok(()));
        h.callbacks.register("_button_ok", cb);

        let stats = run_all(
            h.dispatch,
            vec![
                callback_update(1, "q3", "_button_ok", 42),
                msg_update(2, 42, 7, "after"),
            ],
        )
        .await;
        h.messenger.wait_for_answers(1).await;

        assert_eq!(stats.processed, 2);
        assert_eq!(drain(&mut h.events_rx).len(), 1);
    }

    #[tokio::test]
    async fn callback_without_origin_message_is_skipped() {
        let h = harness(FakeMessenger::new());
        let (cb, seen) = recording_callback(|| Ok(()));
        h.callbacks.register("_button_inline", cb);

        let update = Update {
            id: 1,
            kind: UpdateKind::CallbackQuery(CallbackQuery {
                id: "q4".to_string(),
                from: user(7),
                data: Some("_button_inline".to_string()),
                message: None,
            }),
        };
        run_all(h.dispatch, vec![update]).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
        assert!(h.messenger.answers().is_empty());
    }

    #[tokio::test]
    async fn cancelled_loop_ignores_buffered_updates() {
        let mut h = harness(FakeMessenger::new());
        h.cancel.cancel();

        let stats = run_all(
            h.dispatch,
            vec![msg_update(1, 42, 7, "hello"), msg_update(2, 42, 7, "/ping")],
        )
        .await;

        assert_eq!(stats.processed, 0);
        assert!(drain(&mut h.events_rx).is_empty());
    }

    #[tokio::test]
    async fn no_events_after_cancellation() {
        let mut h = harness(FakeMessenger::new());
        let cancel = h.cancel.clone();
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(h.dispatch.run(rx));

        tx.send(msg_update(1, 42, 7, "first")).await.unwrap();
        let first = h.events_rx.recv().await.unwrap();
        assert_eq!(first.channel(), "42");

        cancel.cancel();
        tx.send(msg_update(2, 42, 7, "second")).await.unwrap();
        tx.send(msg_update(3, 42, 7, "third")).await.unwrap();

        let stats = task.await.unwrap();
        assert_eq!(stats.processed, 1);
        assert!(drain(&mut h.events_rx).is_empty());
    }

    #[tokio::test]
    async fn cancel_unblocks_a_full_sink() {
        let h = harness(FakeMessenger::new());
        let (events_tx, mut events_rx) = mpsc::channel::<Event>(1);
        let fill_tx = events_tx.clone();
        let dispatch = DispatchLoop::new(
            h.messenger.clone(),
            h.callbacks.clone(),
            Arc::new(events_tx),
            h.cancel.clone(),
        );

        let (tx, rx) = mpsc::channel(16);
        for i in 1..=3 {
            tx.send(msg_update(i, 42, 7, "queued")).await.unwrap();
        }
        let task = tokio::spawn(dispatch.run(rx));

        tokio::time::timeout(Duration::from_secs(2), async {
            while fill_tx.capacity() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sink never filled up");
        tokio::time::sleep(Duration::from_millis(20)).await;

        h.cancel.cancel();
        let stats = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("dispatch loop kept waiting on the sink after cancellation")
            .unwrap();

        assert_eq!(stats.processed, 2);
        assert!(events_rx.try_recv().is_ok());
        assert!(events_rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn updates_are_handled_in_delivery_order() {
        let mut h = harness(FakeMessenger::new());
        let updates = (1..=5)
            .map(|i| msg_update(i, 42, 7, &format!("m{i}")))
            .collect();
        run_all(h.dispatch, updates).await;

        let texts: Vec<_> = drain(&mut h.events_rx)
            .into_iter()
            .map(|e| match e {
                Event::Message(m) => m.text,
                Event::Command(c) => c.arg0,
            })
            .collect();
        assert_eq!(texts, vec!["m1", "m2", "m3", "m4", "m5"]);
    }
}
