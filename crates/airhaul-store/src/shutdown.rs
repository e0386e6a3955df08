//! Cooperative cancellation over a `watch` channel
//!
//! Long operations check [`Shutdown::is_cancelled`] between steps and race
//! [`Shutdown::cancelled`] against the step in flight.

use tokio::sync::watch;

/// Sending half; cancels every [`Shutdown`] cloned from its pair
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of a cancellation signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// A connected trigger and signal
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        shutdown_channel().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancelled
    ///
    /// Pends forever when the trigger is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_never_is_not_cancelled() {
        assert!(!Shutdown::never().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_reaches_clones() {
        let (trigger, shutdown) = shutdown_channel();
        let clone = shutdown.clone();
        let waiter = tokio::spawn(async move { clone.cancelled().await });

        trigger.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_trigger_never_fires() {
        let (trigger, shutdown) = shutdown_channel();
        drop(trigger);

        let fired = tokio::time::timeout(Duration::from_millis(50), shutdown.cancelled()).await;
        assert!(fired.is_err());
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_after_trigger_dropped() {
        let (trigger, shutdown) = shutdown_channel();
        trigger.cancel();
        drop(trigger);

        shutdown.cancelled().await;
        assert!(shutdown.is_cancelled());
    }
}
