//! Graceful shutdown.
//!
//! The trigger is sticky: a [`ShutdownSignal`] taken after [`Shutdown::trigger`]
//! still resolves, so a signal arriving while the cache loads is not lost.
//! Dropping the [`Shutdown`] without triggering also releases every signal.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Resolves once the owning [`Shutdown`] fires or goes away.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

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
    pub async fn recv(mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_trigger_reaches_every_signal() {
        let shutdown = Shutdown::new();
        let a = shutdown.subscribe();
        let b = a.clone();

        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(timeout(WAIT, a.recv()).await.is_ok());
        assert!(timeout(WAIT, b.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(timeout(WAIT, shutdown.subscribe().recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_pending_until_triggered_or_dropped() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        assert!(timeout(Duration::from_millis(50), signal.clone().recv())
            .await
            .is_err());

        drop(shutdown);
        assert!(timeout(WAIT, signal.recv()).await.is_ok());
    }
}
