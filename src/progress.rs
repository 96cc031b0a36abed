//! Low-contention progress tracking.
//!
//! Each worker owns a private counter and flushes its delta into one shared
//! atomic total periodically, on a batch-size or elapsed-time trigger,
//! whichever fires first. Registered callbacks are invoked outside any lock;
//! a panicking callback is caught and skipped for that tick.
//!
//! The "last file seen" field is last-writer-wins across workers with no
//! cross-worker ordering guarantee. That relaxed semantics is intentional:
//! the field is for human-facing progress only.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use log::warn;

use crate::constants::{
    PROGRESS_BATCH_LARGE, PROGRESS_BATCH_MEDIUM, PROGRESS_BATCH_SMALL,
    PROGRESS_INTERVAL_DEFAULT_MS, PROGRESS_INTERVAL_SMALL_MS, PROGRESS_INTERVAL_TINY_MS,
};
use crate::models::{JobState, ProgressSnapshot};

/// Observer invoked on progress ticks, outside any tracker lock.
pub type ProgressCallback = Box<dyn Fn(&ProgressSnapshot) + Send + Sync + 'static>;

struct TrackerShared {
    total: AtomicU64,
    current: AtomicU64,
    batch_size: AtomicU64,
    interval_ms: AtomicU64,
    current_file: Mutex<Option<String>>,
    status: Mutex<JobState>,
    callbacks: RwLock<Vec<ProgressCallback>>,
    last_notify: Mutex<Option<Instant>>,
}

/// Aggregates per-worker progress into one observable snapshot.
pub struct ProgressTracker {
    shared: Arc<TrackerShared>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        ProgressTracker {
            shared: Arc::new(TrackerShared {
                total: AtomicU64::new(0),
                current: AtomicU64::new(0),
                batch_size: AtomicU64::new(PROGRESS_BATCH_MEDIUM),
                interval_ms: AtomicU64::new(PROGRESS_INTERVAL_DEFAULT_MS),
                current_file: Mutex::new(None),
                status: Mutex::new(JobState::Pending),
                callbacks: RwLock::new(Vec::new()),
                last_notify: Mutex::new(None),
            }),
        }
    }

    /// Fix the total and reset progress. Flush batching adapts to the
    /// workload so tiny jobs report every file while large jobs batch
    /// aggressively.
    pub fn set_total(&self, total: u64) {
        let (batch, interval) = if total <= 10 {
            (1, PROGRESS_INTERVAL_TINY_MS)
        } else if total <= 100 {
            (PROGRESS_BATCH_SMALL, PROGRESS_INTERVAL_SMALL_MS)
        } else if total < 1000 {
            (PROGRESS_BATCH_MEDIUM, PROGRESS_INTERVAL_DEFAULT_MS)
        } else {
            (PROGRESS_BATCH_LARGE, PROGRESS_INTERVAL_DEFAULT_MS)
        };

        self.shared.batch_size.store(batch, Ordering::Relaxed);
        self.shared.interval_ms.store(interval, Ordering::Relaxed);
        self.shared.total.store(total, Ordering::SeqCst);
        self.shared.current.store(0, Ordering::SeqCst);
        *self.shared.current_file.lock().unwrap() = None;
        *self.shared.last_notify.lock().unwrap() = None;
    }

    /// Record the job status reported in snapshots.
    pub fn set_status(&self, status: JobState) {
        *self.shared.status.lock().unwrap() = status;
    }

    /// Register a progress observer.
    pub fn subscribe(&self, callback: ProgressCallback) {
        self.shared.callbacks.write().unwrap().push(callback);
    }

    pub fn current(&self) -> u64 {
        self.shared.current.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.shared.total.load(Ordering::SeqCst)
    }

    /// Current point-in-time snapshot. Freely re-readable with no side
    /// effects.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let current = self.current();
        let total = self.total();
        ProgressSnapshot {
            current,
            total,
            percentage: percentage(current, total),
            current_file: self.shared.current_file.lock().unwrap().clone(),
            status: *self.shared.status.lock().unwrap(),
        }
    }

    /// Push the current snapshot to every observer immediately, bypassing
    /// throttling. Used for terminal-state notifications.
    pub fn notify_now(&self) {
        let snapshot = self.snapshot();
        notify(&self.shared, &snapshot);
    }

    /// Private accumulator handed to one worker. No synchronization on the
    /// increment fast path.
    pub fn worker_handle(&self) -> WorkerProgress {
        WorkerProgress {
            shared: Arc::clone(&self.shared),
            local_count: 0,
            local_file: None,
            last_flush: Instant::now(),
        }
    }
}

/// Per-worker progress accumulator.
///
/// Increments are purely local; the delta is folded into the shared total on
/// a batch-size or elapsed-time trigger. Workers must flush before exiting
/// (also done on drop) so terminal counts are exact.
pub struct WorkerProgress {
    shared: Arc<TrackerShared>,
    local_count: u64,
    local_file: Option<String>,
    last_flush: Instant,
}

impl WorkerProgress {
    /// Record one handled file.
    pub fn increment(&mut self, file: &Path) {
        self.local_count += 1;
        self.local_file = Some(file.display().to_string());

        let batch = self.shared.batch_size.load(Ordering::Relaxed);
        let interval = Duration::from_millis(self.shared.interval_ms.load(Ordering::Relaxed));
        if self.local_count >= batch || self.last_flush.elapsed() >= interval {
            self.flush();
        }
    }

    /// Fold the private delta into the shared counters and notify observers
    /// if the throttle window allows it.
    pub fn flush(&mut self) {
        if self.local_count == 0 && self.local_file.is_none() {
            return;
        }

        let delta = std::mem::take(&mut self.local_count);
        let file = self.local_file.take();
        self.last_flush = Instant::now();

        let current = self.shared.current.fetch_add(delta, Ordering::SeqCst) + delta;
        let total = self.shared.total.load(Ordering::SeqCst);

        if let Some(file) = file {
            // Last writer wins across workers.
            *self.shared.current_file.lock().unwrap() = Some(file);
        }

        let should_notify = {
            let mut last = self.shared.last_notify.lock().unwrap();
            let interval = Duration::from_millis(self.shared.interval_ms.load(Ordering::Relaxed));
            let due = match *last {
                None => true,
                Some(at) => at.elapsed() >= interval,
            };
            // Tiny jobs always notify so every file is observable.
            let due = due || (total > 0 && total <= 10);
            if due {
                *last = Some(Instant::now());
            }
            due
        };

        if should_notify {
            let snapshot = ProgressSnapshot {
                current,
                total,
                percentage: percentage(current, total),
                current_file: self.shared.current_file.lock().unwrap().clone(),
                status: *self.shared.status.lock().unwrap(),
            };
            notify(&self.shared, &snapshot);
        }
    }
}

impl Drop for WorkerProgress {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Invoke every callback outside the tracker locks; a panicking callback is
/// skipped for this tick and never aborts collection.
fn notify(shared: &TrackerShared, snapshot: &ProgressSnapshot) {
    let callbacks = shared.callbacks.read().unwrap();
    for callback in callbacks.iter() {
        if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
            warn!("Progress callback panicked; skipping for this tick");
        }
    }
}

/// `100 * current / total` with one decimal, 0 when total is 0, capped at 100.
pub fn percentage(current: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (current as f64 / total as f64) * 100.0;
    (raw.min(100.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn percentage_rounding() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 3), 100.0);
        assert_eq!(percentage(5, 3), 100.0);
    }

    #[test]
    fn flush_accumulates_into_shared_total() {
        let tracker = ProgressTracker::new();
        tracker.set_total(1000);

        let mut a = tracker.worker_handle();
        let mut b = tracker.worker_handle();
        for i in 0..7 {
            a.increment(Path::new(&format!("/a/{i}")));
        }
        for i in 0..5 {
            b.increment(Path::new(&format!("/b/{i}")));
        }
        a.flush();
        b.flush();

        assert_eq!(tracker.current(), 12);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total, 1000);
        assert_eq!(snapshot.percentage, 1.2);
    }

    #[test]
    fn tiny_jobs_notify_every_file() {
        let tracker = ProgressTracker::new();
        tracker.set_total(3);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        tracker.subscribe(Box::new(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        }));

        let mut handle = tracker.worker_handle();
        handle.increment(Path::new("/a"));
        handle.increment(Path::new("/b"));
        handle.increment(Path::new("/c"));
        drop(handle);

        assert!(seen.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn panicking_callback_is_skipped() {
        let tracker = ProgressTracker::new();
        tracker.set_total(2);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        tracker.subscribe(Box::new(|_| panic!("observer bug")));
        tracker.subscribe(Box::new(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        }));

        let mut handle = tracker.worker_handle();
        handle.increment(Path::new("/a"));
        handle.flush();

        // The panicking observer must not prevent the healthy one.
        assert!(seen.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn drop_flushes_remaining_delta() {
        let tracker = ProgressTracker::new();
        tracker.set_total(5000);

        {
            let mut handle = tracker.worker_handle();
            for i in 0..9 {
                handle.increment(Path::new(&format!("/f/{i}")));
            }
            // Batch size for large jobs is far above 9; nothing flushed yet
            // unless the interval elapsed.
        }

        assert_eq!(tracker.current(), 9);
    }

    #[test]
    fn last_file_is_reported() {
        let tracker = ProgressTracker::new();
        tracker.set_total(2);

        let mut handle = tracker.worker_handle();
        handle.increment(Path::new("/data/first.bin"));
        handle.increment(Path::new("/data/second.bin"));
        handle.flush();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.current_file.as_deref(), Some("/data/second.bin"));
    }
}
