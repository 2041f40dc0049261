use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Manual-reset stop event shared by the control handler, the controller and
/// the worker loop. Once set it stays set; clones observe the same event.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Returns `true` only for the call that flipped it.
    pub fn set(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::AcqRel);
        self.token.cancel();
        first
    }

    /// Non-blocking poll
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the signal is set; returns immediately if it already is
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Number of live handles to this signal
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.fired)
    }

    /// Sleep for `duration` unless the signal fires first.
    /// Returns `true` when woken by the signal.
    pub async fn wait_timeout(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_starts_unset() {
        let signal = StopSignal::new();
        assert!(!signal.is_set());
    }

    #[test]
    fn test_set_is_idempotent_and_sticky() {
        let signal = StopSignal::new();
        let observer = signal.clone();

        assert!(signal.set());
        assert!(!signal.set());
        assert!(!observer.set());
        assert!(signal.is_set());
        assert!(observer.is_set());
    }

    #[test]
    fn test_clones_share_one_event() {
        let signal = StopSignal::new();
        let observer = signal.clone();
        assert_eq!(signal.handle_count(), 2);

        drop(observer);
        assert_eq!(signal.handle_count(), 1);
    }

    #[tokio::test]
    async fn test_wait_after_set_returns_immediately() {
        let signal = StopSignal::new();
        signal.set();

        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("wait should observe a signal set before waiting");
        assert!(signal.wait_timeout(Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_set_from_another_task() {
        let signal = StopSignal::new();
        let setter = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            setter.set();
        });

        tokio::time::timeout(Duration::from_secs(2), signal.wait())
            .await
            .expect("waiter was not woken");
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn test_wait_timeout_elapses_when_unset() {
        let signal = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)).await);
        assert!(!signal.is_set());
    }
}
