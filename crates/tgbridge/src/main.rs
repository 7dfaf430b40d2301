use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tgbridge_core::{
    callbacks::callback,
    config::Config,
    events::Event,
    outbound::{Button, OutboundSender},
};
use tgbridge_telegram::TelegramAdapter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgbridge_core::logging::init("tgbridge")?;

    let cfg = Config::load()?;
    let adapter = TelegramAdapter::connect(cfg).await?;
    let sender = adapter.sender();

    let (events_tx, mut events_rx) = mpsc::channel::<Event>(64);
    adapter.start(Arc::new(events_tx))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = events_rx.recv() => match event {
                Some(event) => {
                    if let Err(e) = handle_event(&sender, event).await {
                        error!(error = %e, "Failed to handle event");
                    }
                }
                None => break,
            },
        }
    }

    adapter.stop();
    drop(events_rx);
    let stats = adapter.join().await?;
    info!(processed = stats.processed, "Bridge stopped");
    Ok(())
}

/// A tiny brain: enough to exercise every path of the bridge by hand.
async fn handle_event(sender: &OutboundSender, event: Event) -> tgbridge_core::Result<()> {
    match event {
        Event::Command(cmd) => match cmd.arg0.as_str() {
            "ping" => {
                sender.send("pong", &cmd.channel()).await?;
            }
            "echo" => {
                let reply = if cmd.args.is_empty() {
                    "usage: /echo <text>".to_string()
                } else {
                    cmd.args.join(" ")
                };
                sender.send(&reply, &cmd.channel()).await?;
            }
            "confirm" => {
                let yes_sender = sender.clone();
                let no_sender = sender.clone();
                let buttons = vec![
                    Button::new(
                        "Yes",
                        callback(move |channel| {
                            let sender = yes_sender.clone();
                            async move { sender.send("Confirmed.", &channel).await.map(|_| ()) }
                        }),
                    ),
                    Button::new(
                        "No",
                        callback(move |channel| {
                            let sender = no_sender.clone();
                            async move { sender.send("Cancelled.", &channel).await.map(|_| ()) }
                        }),
                    ),
                ];
                sender
                    .send_buttons(&cmd.channel(), "Are you sure?", buttons)
                    .await?;
            }
            other => warn!(command = other, "Unknown command"),
        },
        Event::Message(msg) => {
            info!(
                channel = %msg.channel,
                author_id = %msg.author_id,
                text = %msg.text,
                "Received message"
            );
        }
    }
    Ok(())
}
