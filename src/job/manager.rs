//! Registry of collection jobs keyed by id.
//!
//! Each submitted job runs on its own thread; the manager hands out progress
//! streams, cancellation, and final results without blocking the jobs
//! themselves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};
use uuid::Uuid;

use crate::config::{validate_config, CollectionConfig};
use crate::errors::CollectorResult;
use crate::job::service::run_collection;
use crate::models::{CollectionResult, JobState, ProgressSnapshot};
use crate::progress::ProgressTracker;

/// Answer to a result lookup.
#[derive(Debug, Clone)]
pub enum ResultQuery {
    /// No job with that id.
    NotFound,
    /// Job exists but has not reached a terminal state.
    Pending(JobState),
    /// Terminal outcome.
    Ready(CollectionResult),
}

struct JobHandle {
    id: String,
    state: RwLock<JobState>,
    tracker: Arc<ProgressTracker>,
    result: RwLock<Option<CollectionResult>>,
    cancel: Arc<AtomicBool>,
    subscribers: Arc<Mutex<Vec<Sender<ProgressSnapshot>>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl JobHandle {
    fn state(&self) -> JobState {
        *self.state.read().unwrap()
    }

    fn set_state(&self, state: JobState) {
        *self.state.write().unwrap() = state;
        self.tracker.set_status(state);
    }
}

/// Thread-safe registry of jobs. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct JobManager {
    jobs: Arc<RwLock<HashMap<String, Arc<JobHandle>>>>,
}

impl JobManager {
    pub fn new() -> Self {
        JobManager::default()
    }

    /// Validate `config`, register a new job, and start it on its own
    /// thread. Returns the job id. A config that fails validation registers
    /// nothing.
    pub fn submit(&self, config: CollectionConfig) -> CollectorResult<String> {
        validate_config(&config)?;

        let id = Uuid::new_v4().to_string();
        let tracker = Arc::new(ProgressTracker::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let subscribers: Arc<Mutex<Vec<Sender<ProgressSnapshot>>>> =
            Arc::new(Mutex::new(Vec::new()));

        {
            let subscribers = Arc::clone(&subscribers);
            tracker.subscribe(Box::new(move |snapshot| {
                let mut senders = subscribers.lock().unwrap();
                senders.retain(|s| s.send(snapshot.clone()).is_ok());
            }));
        }

        let handle = Arc::new(JobHandle {
            id: id.clone(),
            state: RwLock::new(JobState::Pending),
            tracker: Arc::clone(&tracker),
            result: RwLock::new(None),
            cancel: Arc::clone(&cancel),
            subscribers: Arc::clone(&subscribers),
            thread: Mutex::new(None),
        });

        self.jobs
            .write()
            .unwrap()
            .insert(id.clone(), Arc::clone(&handle));

        let worker_handle = Arc::clone(&handle);
        let thread = std::thread::spawn(move || {
            worker_handle.set_state(JobState::Running);
            info!("Job {} running", worker_handle.id);

            let outcome = run_collection(&config, &cancel, &tracker);

            let terminal = match outcome {
                Ok(result) => {
                    let terminal = if cancel.load(Ordering::SeqCst) {
                        JobState::Cancelled
                    } else {
                        JobState::Completed
                    };
                    *worker_handle.result.write().unwrap() = Some(result);
                    terminal
                }
                Err(e) => {
                    error!("Job {} failed: {e}", worker_handle.id);
                    let mut result = CollectionResult::new(config.target_path.clone());
                    result.error = Some(e.to_string());
                    *worker_handle.result.write().unwrap() = Some(result);
                    JobState::Failed
                }
            };

            worker_handle.set_state(terminal);
            tracker.notify_now();
            info!("Job {} {terminal}", worker_handle.id);

            // Dropping the senders disconnects every progress stream.
            subscribers.lock().unwrap().clear();
        });

        *handle.thread.lock().unwrap() = Some(thread);
        Ok(id)
    }

    /// Current progress for a job, if it exists.
    pub fn progress(&self, id: &str) -> Option<ProgressSnapshot> {
        self.lookup(id).map(|h| h.tracker.snapshot())
    }

    /// Current state for a job, if it exists.
    pub fn state(&self, id: &str) -> Option<JobState> {
        self.lookup(id).map(|h| h.state())
    }

    /// The job's final result, its live state, or `NotFound`.
    pub fn result(&self, id: &str) -> ResultQuery {
        let Some(handle) = self.lookup(id) else {
            return ResultQuery::NotFound;
        };
        let result = handle.result.read().unwrap().clone();
        match result {
            Some(result) if handle.state().is_terminal() => ResultQuery::Ready(result),
            _ => ResultQuery::Pending(handle.state()),
        }
    }

    /// Request cancellation. Returns whether the job is known; a terminal
    /// job is left untouched.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(handle) = self.lookup(id) else {
            return false;
        };
        if handle.state().is_terminal() {
            warn!("Job {id} already {}, cancel ignored", handle.state());
            return true;
        }
        info!("Cancelling job {id}");
        handle.cancel.store(true, Ordering::SeqCst);
        true
    }

    /// Stream of progress snapshots for a job. For a terminal job the
    /// stream carries the final snapshot and then disconnects.
    pub fn subscribe(&self, id: &str) -> Option<Receiver<ProgressSnapshot>> {
        let handle = self.lookup(id)?;
        let (tx, rx) = unbounded();
        // The subscribers lock is held across the state check so the job
        // thread cannot reach its terminal clear between the check and the
        // push, which would leave a sender that never disconnects.
        let mut senders = handle.subscribers.lock().unwrap();
        if handle.state().is_terminal() {
            let _ = tx.send(handle.tracker.snapshot());
            return Some(rx);
        }
        senders.push(tx);
        Some(rx)
    }

    /// Block until the job's thread finishes and return its result.
    pub fn wait(&self, id: &str) -> Option<CollectionResult> {
        let handle = self.lookup(id)?;
        let thread = handle.thread.lock().unwrap().take();
        if let Some(thread) = thread {
            let _ = thread.join();
        }
        let result = handle.result.read().unwrap().clone();
        result
    }

    /// Drop a job from the registry. Running jobs keep running; only the
    /// bookkeeping is removed.
    pub fn remove(&self, id: &str) -> bool {
        self.jobs.write().unwrap().remove(id).is_some()
    }

    /// Ids and states of every registered job.
    pub fn jobs(&self) -> Vec<(String, JobState)> {
        self.jobs
            .read()
            .unwrap()
            .values()
            .map(|h| (h.id.clone(), h.state()))
            .collect()
    }

    fn lookup(&self, id: &str) -> Option<Arc<JobHandle>> {
        self.jobs.read().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternSpec;
    use std::fs;
    use tempfile::TempDir;

    fn quick_config(dir: &std::path::Path) -> CollectionConfig {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/a.log"), "a").unwrap();
        fs::write(dir.join("src/b.log"), "b").unwrap();
        CollectionConfig::builder()
            .source_paths([dir.join("src")])
            .target_path(dir.join("out"))
            .pattern(PatternSpec::glob("*.log"))
            .collect_system_info(false)
            .build()
            .unwrap()
    }

    #[test]
    fn submit_and_wait_completes() {
        let tmp = TempDir::new().unwrap();
        let manager = JobManager::new();
        let id = manager.submit(quick_config(tmp.path())).unwrap();

        let result = manager.wait(&id).unwrap();
        assert_eq!(result.processed_files, 2);
        assert_eq!(manager.state(&id), Some(JobState::Completed));
        assert!(matches!(manager.result(&id), ResultQuery::Ready(_)));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let manager = JobManager::new();
        assert!(matches!(manager.result("nope"), ResultQuery::NotFound));
        assert!(manager.progress("nope").is_none());
        assert!(!manager.cancel("nope"));
        assert!(manager.subscribe("nope").is_none());
    }

    #[test]
    fn invalid_config_registers_nothing() {
        let manager = JobManager::new();
        let config = CollectionConfig {
            source_paths: Vec::new(),
            target_path: "/tmp/out".into(),
            patterns: Vec::new(),
            operation_mode: Default::default(),
            create_archive: false,
            archive_format: Default::default(),
            archive_compression: None,
            collect_system_info: false,
            notification: None,
        };
        assert!(manager.submit(config).is_err());
        assert!(manager.jobs().is_empty());
    }

    #[test]
    fn failed_job_carries_error() {
        let tmp = TempDir::new().unwrap();
        let config = CollectionConfig::builder()
            .source_paths([tmp.path().join("missing")])
            .target_path(tmp.path().join("out"))
            .collect_system_info(false)
            .build()
            .unwrap();

        let manager = JobManager::new();
        let id = manager.submit(config).unwrap();
        let result = manager.wait(&id).unwrap();

        assert_eq!(manager.state(&id), Some(JobState::Failed));
        assert!(result.error.is_some());
    }

    #[test]
    fn cancel_on_terminal_job_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let manager = JobManager::new();
        let id = manager.submit(quick_config(tmp.path())).unwrap();
        manager.wait(&id);

        assert!(manager.cancel(&id));
        assert_eq!(manager.state(&id), Some(JobState::Completed));
    }

    #[test]
    fn subscribe_after_completion_yields_final_snapshot() {
        let tmp = TempDir::new().unwrap();
        let manager = JobManager::new();
        let id = manager.submit(quick_config(tmp.path())).unwrap();
        manager.wait(&id);

        let rx = manager.subscribe(&id).unwrap();
        let snapshot = rx.recv().unwrap();
        assert_eq!(snapshot.status, JobState::Completed);
        assert_eq!(snapshot.current, snapshot.total);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn racing_subscribers_always_disconnect() {
        use crossbeam::channel::RecvTimeoutError;
        use std::time::Duration;

        // Subscribers arriving around job completion must either receive a
        // terminal snapshot or see their stream disconnect; none may hang.
        for _ in 0..20 {
            let tmp = TempDir::new().unwrap();
            let manager = JobManager::new();
            let id = manager.submit(quick_config(tmp.path())).unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let manager = manager.clone();
                    let id = id.clone();
                    std::thread::spawn(move || {
                        let rx = manager.subscribe(&id).expect("job should exist");
                        loop {
                            match rx.recv_timeout(Duration::from_secs(10)) {
                                Ok(_) => continue,
                                Err(RecvTimeoutError::Disconnected) => return true,
                                Err(RecvTimeoutError::Timeout) => return false,
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                assert!(handle.join().unwrap(), "subscriber stream never ended");
            }
        }
    }

    #[test]
    fn remove_drops_bookkeeping() {
        let tmp = TempDir::new().unwrap();
        let manager = JobManager::new();
        let id = manager.submit(quick_config(tmp.path())).unwrap();
        manager.wait(&id);

        assert!(manager.remove(&id));
        assert!(matches!(manager.result(&id), ResultQuery::NotFound));
        assert!(!manager.remove(&id));
    }
}
