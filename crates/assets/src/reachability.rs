//! # Reachability Monitor
//!
//! Periodically broadcasts whether the internet is reachable, and announces
//! transitions between online and offline modes. A forced mode from config
//! overrides whatever the probe says.

use crate::cancel::CancelToken;
use crate::config::ForcedOnlineMode;
use crate::messenger::{
    Messenger, INTERNET_NOT_REACHABLE, INTERNET_REACHABLE, ONLINE_MODE_OFFLINE, ONLINE_MODE_ONLINE,
};
use crate::transport::Transport;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Application connectivity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnlineMode {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Debug)]
pub struct ReachabilityMonitor {
    messenger: Messenger,
    forced: ForcedOnlineMode,
    interval: Duration,
    mode: Mutex<OnlineMode>,
}

impl ReachabilityMonitor {
    pub fn new(messenger: Messenger, forced: ForcedOnlineMode, interval: Duration) -> Self {
        Self { messenger, forced, interval, mode: Mutex::new(OnlineMode::Unknown) }
    }

    pub fn mode(&self) -> OnlineMode {
        *self.mode.lock()
    }

    pub fn is_reachable(&self) -> bool {
        self.mode() != OnlineMode::Offline
    }

    /// Apply one probe result. `None` means no verdict yet and counts as
    /// reachable.
    pub fn update(&self, probe: Option<bool>) -> OnlineMode {
        let reachable = match self.forced {
            ForcedOnlineMode::Online => true,
            ForcedOnlineMode::Offline => false,
            ForcedOnlineMode::None => probe.unwrap_or(true),
        };

        self.messenger
            .publish(if reachable { INTERNET_REACHABLE } else { INTERNET_NOT_REACHABLE });

        let next = if reachable { OnlineMode::Online } else { OnlineMode::Offline };
        let mut mode = self.mode.lock();
        if *mode != next {
            info!(from = ?*mode, to = ?next, "online mode changed");
            *mode = next;
            self.messenger
                .publish(if reachable { ONLINE_MODE_ONLINE } else { ONLINE_MODE_OFFLINE });
        }
        next
    }

    /// Run `probe` and [`update`](Self::update) every interval until cancelled
    pub fn spawn_loop<F, Fut>(self: Arc<Self>, probe: F, cancel: CancelToken) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<bool>> + Send + 'static,
    {
        tokio::spawn(async move {
            loop {
                let Ok(result) = cancel.run(probe()).await else {
                    break;
                };
                self.update(result);

                if cancel.run(tokio::time::sleep(self.interval)).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Probe reachability by checking `url` through a transport
pub async fn probe_url(transport: &dyn Transport, url: &str) -> Option<bool> {
    Some(transport.exists(url).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(msg) => out.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[test]
    fn test_mode_change_broadcast_only_on_transition() {
        let messenger = Messenger::default();
        let mut rx = messenger.subscribe();
        let monitor =
            ReachabilityMonitor::new(messenger, ForcedOnlineMode::None, Duration::from_millis(500));

        assert_eq!(monitor.update(Some(true)), OnlineMode::Online);
        assert_eq!(monitor.update(Some(true)), OnlineMode::Online);
        assert_eq!(monitor.update(Some(false)), OnlineMode::Offline);

        assert_eq!(
            drain(&mut rx),
            vec![
                INTERNET_REACHABLE,
                ONLINE_MODE_ONLINE,
                INTERNET_REACHABLE,
                INTERNET_NOT_REACHABLE,
                ONLINE_MODE_OFFLINE
            ]
        );
    }

    #[test]
    fn test_unknown_probe_counts_as_reachable() {
        let monitor = ReachabilityMonitor::new(
            Messenger::default(),
            ForcedOnlineMode::None,
            Duration::from_millis(500),
        );
        assert_eq!(monitor.update(None), OnlineMode::Online);
    }

    #[test]
    fn test_forced_mode_overrides_probe() {
        let monitor = ReachabilityMonitor::new(
            Messenger::default(),
            ForcedOnlineMode::Offline,
            Duration::from_millis(500),
        );
        assert_eq!(monitor.update(Some(true)), OnlineMode::Offline);
        assert!(!monitor.is_reachable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_cancelled() {
        let messenger = Messenger::default();
        let mut rx = messenger.subscribe();
        let monitor = Arc::new(ReachabilityMonitor::new(
            messenger,
            ForcedOnlineMode::None,
            Duration::from_millis(500),
        ));
        let cancel = CancelToken::new();

        let handle = monitor.clone().spawn_loop(|| async { Some(true) }, cancel.clone());
        tokio::time::sleep(Duration::from_millis(1_250)).await;
        cancel.cancel();
        handle.await.unwrap();

        let messages = drain(&mut rx);
        let reachable = messages.iter().filter(|m| *m == INTERNET_REACHABLE).count();
        assert_eq!(reachable, 3);
        assert_eq!(messages.iter().filter(|m| *m == ONLINE_MODE_ONLINE).count(), 1);
        assert_eq!(monitor.mode(), OnlineMode::Online);
    }
}
