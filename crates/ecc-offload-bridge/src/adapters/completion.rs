//! Completion sink backed by a tokio channel.

use crate::domain::entities::EccCompletion;
use crate::ports::outbound::CompletionSink;
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards completions to an unbounded channel; the receiver is typically
/// the task that writes responses back to the firmware.
#[derive(Clone)]
pub struct ChannelCompletionSink {
    sender: mpsc::UnboundedSender<EccCompletion>,
}

impl ChannelCompletionSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EccCompletion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl CompletionSink for ChannelCompletionSink {
    fn complete(&self, completion: EccCompletion) {
        let handshake = completion.handshake;
        if self.sender.send(completion).is_err() {
            warn!(handshake = %handshake, "Completion receiver dropped");
        }
    }
}
