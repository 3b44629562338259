//! String-keyed broadcast channel for announcing state changes to the host
//! application. Publishing with nobody listening is fine.

use tokio::sync::broadcast;
use tracing::debug;

pub const INTERNET_REACHABLE: &str = "InternetIsReachable";
pub const INTERNET_NOT_REACHABLE: &str = "InternetIsNotReachable";
pub const ONLINE_MODE_ONLINE: &str = "ApplicationOnlineModeTypeChange_Online";
pub const ONLINE_MODE_OFFLINE: &str = "ApplicationOnlineModeTypeChange_Offline";

const DEFAULT_CAPACITY: usize = 64;

/// Cloneable publish/subscribe handle
#[derive(Debug, Clone)]
pub struct Messenger {
    tx: broadcast::Sender<String>,
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Messenger {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers received `key`
    pub fn publish(&self, key: &str) -> usize {
        match self.tx.send(key.to_string()) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(key = %key, "message published with no listeners");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let messenger = Messenger::default();
        let mut a = messenger.subscribe();
        let mut b = messenger.subscribe();

        assert_eq!(messenger.publish(INTERNET_REACHABLE), 2);
        assert_eq!(a.recv().await.unwrap(), INTERNET_REACHABLE);
        assert_eq!(b.recv().await.unwrap(), INTERNET_REACHABLE);
    }

    #[test]
    fn test_publish_without_listeners() {
        let messenger = Messenger::new(4);
        assert_eq!(messenger.publish("anything"), 0);
    }
}
