//! Shutdown coordination for the agent.

use tokio::sync::watch;

/// Owner side of the shutdown flag.
///
/// Background tasks hold a [`ShutdownSignal`] and stop once it fires.
/// A signal obtained after the trigger observes it immediately.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Task side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the flag. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolves once shutdown has been triggered, or the owner is gone.
    pub async fn cancelled(&mut self) {
        // Err means the sender was dropped, which also ends the task
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_signal() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.signal();
        let mut b = a.clone();

        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        shutdown.trigger();

        a.cancelled().await;
        b.cancelled().await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_late_signal_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.signal();
        tokio::time::timeout(Duration::from_secs(1), late.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_owner_releases_tasks() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.signal();
        drop(shutdown);

        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }
}
