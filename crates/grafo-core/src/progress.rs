//! Non-blocking progress reporting
//!
//! The pipeline pushes short status strings at well-defined checkpoints
//! (per-project start, per-file processed, per-batch flushed). Sinks must
//! never block the worker that reports.

use tokio::sync::mpsc;

pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _message: &str) {}
}

/// Forwards updates to tracing at info level.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Pushes updates into an unbounded channel; sending never blocks and a
/// closed receiver is silently tolerated.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, message: &str) {
        let _ = self.tx.send(message.to_string());
    }
}
