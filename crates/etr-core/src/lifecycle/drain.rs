//! Waiting for the event transport to deliver everything that was published.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::info;

use super::collaborators::DeliveryTracker;
use super::error::{LifecycleError, LifecycleResult};
use crate::obs;

/// Timing of the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainPolicy {
    /// Nominal time allowed for all deliveries.
    pub timeout: Duration,
    /// Added to the deadline each time it passes while deliveries still progress.
    pub extension: Duration,
    /// Interval between two reads of the pending count.
    pub tick: Duration,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            extension: Duration::from_secs(10),
            tick: Duration::from_secs(1),
        }
    }
}

/// How a successful drain went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub waited: Duration,
    /// Number of times the deadline was extended.
    pub extensions: u32,
}

/// Poll `tracker` once per tick until nothing is pending.
///
/// Once the deadline passes the loop only continues while the pending count
/// keeps shrinking, each shrink buying another `policy.extension`. A count
/// that did not shrink since the previous tick fails with
/// [`LifecycleError::DeliveryTimeout`]. Once nothing is pending, events the
/// transport failed to write fail the drain with
/// [`LifecycleError::DeliveryFailed`].
pub async fn drain_deliveries<T>(tracker: &T, policy: &DrainPolicy) -> LifecycleResult<DrainReport>
where
    T: DeliveryTracker + ?Sized,
{
    let started = Instant::now();
    let mut deadline = started + policy.timeout;
    let mut previous = 0usize;
    let mut extensions = 0u32;

    info!(
        timeout_secs = policy.timeout.as_secs(),
        "Waiting for event transport to deliver events"
    );

    loop {
        let current = tracker.pending_deliveries();
        if current == 0 {
            break;
        }
        obs::emit_drain_progress(current, previous.saturating_sub(current));

        let now = Instant::now();
        if now > deadline {
            if current < previous {
                info!(
                    extension_secs = policy.extension.as_secs(),
                    "Timeout reached, but events are still being sent; extending"
                );
                deadline = now + policy.extension;
                extensions += 1;
            } else {
                return Err(LifecycleError::DeliveryTimeout { remaining: current });
            }
        }

        previous = current;
        tokio::time::sleep(policy.tick).await;
    }

    let failed = tracker.failed_deliveries();
    if failed > 0 {
        return Err(LifecycleError::DeliveryFailed { failed });
    }

    Ok(DrainReport {
        waited: started.elapsed(),
        extensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pending count computed from the number of reads so far.
    struct Scripted<F: Fn(usize) -> usize + Send + Sync> {
        reads: AtomicUsize,
        pending: F,
        failed: usize,
    }

    impl<F: Fn(usize) -> usize + Send + Sync> Scripted<F> {
        fn new(pending: F) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                pending,
                failed: 0,
            }
        }

        fn with_failed(mut self, failed: usize) -> Self {
            self.failed = failed;
            self
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl<F: Fn(usize) -> usize + Send + Sync> DeliveryTracker for Scripted<F> {
        fn pending_deliveries(&self) -> usize {
            let read = self.reads.fetch_add(1, Ordering::SeqCst);
            (self.pending)(read)
        }

        fn failed_deliveries(&self) -> usize {
            self.failed
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_pending_returns_immediately() {
        let tracker = Scripted::new(|_| 0);
        let report = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap();
        assert_eq!(report.extensions, 0);
        assert_eq!(report.waited, Duration::ZERO);
        assert_eq!(tracker.reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_within_timeout() {
        let tracker = Scripted::new(|read| 3usize.saturating_sub(read));
        let report = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap();
        assert_eq!(report.extensions, 0);
        assert_eq!(report.waited, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_past_timeout_keeps_extending() {
        // One delivery per tick, 1000 pending: finishes 400s past the deadline.
        let tracker = Scripted::new(|read| 1000usize.saturating_sub(read));
        let report = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap();
        assert!(report.extensions > 0);
        assert_eq!(report.waited, Duration::from_secs(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_past_timeout_fails() {
        let tracker = Scripted::new(|_| 5);
        let err = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DeliveryTimeout { remaining: 5 }));
        // Reads at t=0..=601s; the read at 601s is the first past the deadline.
        assert_eq!(tracker.reads(), 602);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_after_extension_fails() {
        // Progress past the deadline until 350 remain (t=650s), then stall.
        let tracker = Scripted::new(|read| 1000usize.saturating_sub(read).max(350));
        let err = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DeliveryTimeout { remaining: 350 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_deliveries_fail_the_drain() {
        let tracker = Scripted::new(|read| 2usize.saturating_sub(read)).with_failed(1);
        let err = drain_deliveries(&tracker, &DrainPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DeliveryFailed { failed: 1 }));
        assert_eq!(tracker.reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let policy = DrainPolicy {
            timeout: Duration::from_secs(2),
            extension: Duration::from_secs(1),
            tick: Duration::from_millis(500),
        };
        let tracker = Scripted::new(|_| 1);
        let started = Instant::now();
        let err = drain_deliveries(&tracker, &policy).await.unwrap_err();
        assert!(matches!(err, LifecycleError::DeliveryTimeout { remaining: 1 }));
        assert!(started.elapsed() > Duration::from_secs(2));
    }
}
