//! Tracing setup for the CLI.
//!
//! Human-readable logs go to stderr. With `--events`, pipeline events are
//! also streamed through [`RunEventLayer`] and printed as JSON lines.

use anyhow::{Context, Result};
use panel_execution::{RunEvent, RunEventLayer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "warn,panel=info";

/// Background printer for `--events`.
pub struct EventPrinter {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl EventPrinter {
    fn spawn(mut receiver: mpsc::UnboundedReceiver<RunEvent>) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Some(event) => print_event(&event),
                        None => return,
                    },
                    _ = &mut stopped => break,
                }
            }
            while let Ok(event) = receiver.try_recv() {
                print_event(&event);
            }
        });
        Self { stop, handle }
    }

    /// Prints whatever is still queued and stops the printer.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.handle.await;
    }
}

fn print_event(event: &RunEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => eprintln!("failed to encode event: {err}"),
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(events: bool) -> Result<Option<EventPrinter>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if events {
        let (layer, receiver) = RunEventLayer::channel();
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        Ok(Some(EventPrinter::spawn(receiver)))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        Ok(None)
    }
}
