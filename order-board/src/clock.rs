//! Time source
//!
//! [`Clock`] answers "what time is it" for the engine (finalization stamps).
//! [`Ticker`] republishes that time on a fixed cadence so views can
//! recompute elapsed time; it never touches the order store.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Wall-clock source in Unix milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and demos
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move time forward, saturating at `i64::MAX` millis
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        // closure never returns None
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(now.saturating_add(by)));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Fixed-cadence "now" publisher
pub struct Ticker {
    rx: watch::Receiver<i64>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Start ticking until `shutdown` is cancelled.
    ///
    /// Published values never decrease, even if the clock steps backwards.
    pub fn spawn(clock: Arc<dyn Clock>, every: Duration, shutdown: CancellationToken) -> Self {
        let (tx, rx) = watch::channel(clock.now_millis());

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = clock.now_millis();
                        tx.send_if_modified(|last| {
                            if now > *last {
                                *last = now;
                                true
                            } else {
                                false
                            }
                        });
                    }
                }
            }
            tracing::debug!("Ticker stopped");
        });

        Self { rx, handle }
    }

    /// Receiver notified on every tick that moved time forward
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.rx.clone()
    }

    /// Latest published time
    pub fn now(&self) -> i64 {
        *self.rx.borrow()
    }

    /// Wait for the ticker task to exit (after its token was cancelled)
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Ticker task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(1_000);
        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now_millis(), 2_500);

        clock.advance(Duration::MAX);
        assert_eq!(clock.now_millis(), i64::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_millis(), i64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_publishes_clock_time() {
        let clock = ManualClock::new(1_000);
        let token = CancellationToken::new();
        let ticker = Ticker::spawn(Arc::new(clock.clone()), Duration::from_secs(1), token.clone());
        let mut rx = ticker.subscribe();
        assert_eq!(ticker.now(), 1_000);

        clock.advance(Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 2_000);

        token.cancel();
        ticker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_never_goes_backwards() {
        let clock = ManualClock::new(5_000);
        let token = CancellationToken::new();
        let ticker = Ticker::spawn(Arc::new(clock.clone()), Duration::from_secs(1), token.clone());

        clock.set(3_000);
        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(ticker.now(), 5_000);

        clock.set(9_000);
        tokio::time::advance(Duration::from_secs(1)).await;
        let mut rx = ticker.subscribe();
        rx.wait_for(|now| *now == 9_000).await.unwrap();

        token.cancel();
        ticker.join().await;
    }
}
