//! Cooperative cancellation for in-flight requests.
//!
//! A [`CancelToken`] is cloned into every suspension point of a request.
//! Awaiting through [`CancelToken::run`] races the future against
//! cancellation, so a cancelled request stops at its next await.

use std::future::Future;
use tokio::sync::watch;

/// Shared cancellation flag backed by a `watch` channel
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

/// Returned by [`CancelToken::run`] when cancellation won the race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: std::sync::Arc::new(tx), rx }
    }

    /// Cancel every clone of this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone, so this only errors if
        // every token was dropped, and then nothing can cancel anymore.
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless the token is cancelled first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}
