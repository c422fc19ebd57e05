use log::{info, warn};
use tokio::sync::broadcast;

/// Name of the channel the backend publishes free-text messages on.
pub const LOG_CHANNEL: &str = "log-message";

const DEFAULT_CAPACITY: usize = 64;

/// Named broadcast channel of user-visible log messages. Every message is
/// also written through the `log` facade.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    sender: broadcast::Sender<String>,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.name, message);
        self.broadcast(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.name, message);
        self.broadcast(message);
    }

    fn broadcast(&self, message: &str) {
        // no subscribers is not an error
        let _ = self.sender.send(message.to_string());
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(LOG_CHANNEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_messages_in_order() {
        let channel = LogChannel::default();
        let mut receiver = channel.subscribe();
        channel.record("first");
        channel.warn("second");
        assert_eq!(receiver.try_recv().unwrap(), "first");
        assert_eq!(receiver.try_recv().unwrap(), "second");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let channel = LogChannel::new("test");
        channel.record("nobody listens");
        assert_eq!(channel.name(), "test");
    }
}
