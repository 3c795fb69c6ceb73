use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

struct Inner {
    count: AtomicUsize,
    threshold: usize,
    flag: watch::Sender<bool>,
}

/// Counts in-flight blocking operations and publishes a busy flag: true
/// while the count is at or above the threshold. Threshold 1 means a single
/// pending operation is enough to mark the link busy.
#[derive(Clone)]
pub struct BusyTracker {
    inner: Arc<Inner>,
}

impl BusyTracker {
    pub fn new(threshold: usize) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                count: AtomicUsize::new(0),
                threshold: threshold.max(1),
                flag,
            }),
        }
    }

    /// Mark one operation in flight. The guard releases it on drop, so the
    /// failure path of an operation decrements just like the success path.
    pub fn begin(&self) -> BusyGuard {
        let count = self.inner.count.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.flag.send_replace(count >= self.inner.threshold);
        BusyGuard {
            inner: self.inner.clone(),
        }
    }

    /// The busy flag, for hosts gating a loading state.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.flag.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.count.load(Ordering::SeqCst) >= self.inner.threshold
    }
}

/// Releases one in-flight operation on drop.
pub struct BusyGuard {
    inner: Arc<Inner>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let count = self.inner.count.fetch_sub(1, Ordering::SeqCst) - 1;
        self.inner.flag.send_replace(count >= self.inner.threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_tracker_is_not_busy() {
        let tracker = BusyTracker::new(1);
        assert!(!tracker.is_busy());
        assert!(!*tracker.subscribe().borrow());
    }

    #[test]
    fn single_operation_marks_busy_at_threshold_one() {
        let tracker = BusyTracker::new(1);
        let guard = tracker.begin();
        assert!(tracker.is_busy());
        assert!(*tracker.subscribe().borrow());
        drop(guard);
        assert!(!tracker.is_busy());
        assert!(!*tracker.subscribe().borrow());
    }

    #[test]
    fn overlapping_operations_stay_busy_until_all_released() {
        let tracker = BusyTracker::new(1);
        let a = tracker.begin();
        let b = tracker.begin();
        drop(a);
        assert!(tracker.is_busy(), "one operation still pending");
        drop(b);
        assert!(!tracker.is_busy());
    }

    #[test]
    fn higher_threshold_requires_more_operations() {
        let tracker = BusyTracker::new(2);
        let a = tracker.begin();
        assert!(!tracker.is_busy());
        let b = tracker.begin();
        assert!(tracker.is_busy());
        drop(a);
        assert!(!tracker.is_busy());
        drop(b);
    }

    #[test]
    fn guard_releases_on_early_return() {
        let tracker = BusyTracker::new(1);
        fn failing_path(t: &BusyTracker) -> Result<(), ()> {
            let _guard = t.begin();
            Err(())
        }
        let _ = failing_path(&tracker);
        assert!(
            !tracker.is_busy(),
            "failure path must release the busy count"
        );
    }

    #[tokio::test]
    async fn watch_observers_see_transitions() {
        let tracker = BusyTracker::new(1);
        let mut rx = tracker.subscribe();
        let guard = tracker.begin();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        drop(guard);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }
}
