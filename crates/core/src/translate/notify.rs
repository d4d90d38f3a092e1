use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub const FAILURE_MESSAGE: &str = "Translation failed";
const LOG_TARGET: &str = "translate::notify";

/// Fire-and-forget channel to the host's user-facing message queue.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        if self.tx.send(message.to_owned()).is_err() {
            tracing::warn!(target: LOG_TARGET, dropped = message, "host queue closed");
        }
    }
}
