//! Debounced buffer rescans
//!
//! ```text
//! text changed → RescanHandle::schedule (drops early if nothing is highlighted)
//!              → worker: deadline = now + delay (resets on every edit)
//!              → deadline passes quietly → RescanTarget::rescan(buffer)
//! ```
//!
//! All rescans run on one worker thread, so at most one rescan per buffer is
//! ever in flight and rescans never race each other's overlay updates.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::host::BufferId;

/// Quiet period after the last edit before a buffer is rescanned
pub const RESCAN_DEBOUNCE_MS: u64 = 150;

/// Whatever the scheduler rescans on behalf of
pub trait RescanTarget: Send + Sync {
    /// `false` when there is nothing to highlight, so edits can be ignored
    fn has_work(&self) -> bool;

    fn rescan(&self, buffer: BufferId);
}

enum Request {
    Touch { buffer: BufferId, at: Instant },
    Cancel(BufferId),
    Shutdown,
}

/// Cheap, cloneable entry point for change callbacks
#[derive(Clone)]
pub struct RescanHandle {
    tx: Sender<Request>,
    target: Weak<dyn RescanTarget>,
}

impl RescanHandle {
    /// Request a debounced rescan; returns whether anything was scheduled
    pub fn schedule(&self, buffer: BufferId) -> bool {
        let Some(target) = self.target.upgrade() else {
            return false;
        };
        if !target.has_work() {
            return false;
        }
        self.tx
            .send(Request::Touch {
                buffer,
                at: Instant::now(),
            })
            .is_ok()
    }

    /// Drop a pending rescan for a buffer
    pub fn cancel(&self, buffer: BufferId) {
        let _ = self.tx.send(Request::Cancel(buffer));
    }
}

/// Owns the rescan worker thread; dropping it stops the worker
pub struct RescanScheduler {
    handle: RescanHandle,
    delay: Duration,
    worker: Option<JoinHandle<()>>,
}

impl RescanScheduler {
    /// Start a worker with the default [`RESCAN_DEBOUNCE_MS`] delay
    pub fn new(target: &Arc<dyn RescanTarget>) -> std::io::Result<Self> {
        Self::with_delay(target, Duration::from_millis(RESCAN_DEBOUNCE_MS))
    }

    pub fn with_delay(target: &Arc<dyn RescanTarget>, delay: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let weak = Arc::downgrade(target);
        let worker_target = weak.clone();

        let worker = std::thread::Builder::new()
            .name("word-highlight-rescan".to_string())
            .spawn(move || run(rx, worker_target, delay))?;

        Ok(Self {
            handle: RescanHandle { tx, target: weak },
            delay,
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> RescanHandle {
        self.handle.clone()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, buffer: BufferId) -> bool {
        self.handle.schedule(buffer)
    }

    pub fn cancel(&self, buffer: BufferId) {
        self.handle.cancel(buffer);
    }
}

impl Drop for RescanScheduler {
    fn drop(&mut self) {
        let _ = self.handle.tx.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Rescan worker panicked");
            }
        }
    }
}

fn run(rx: Receiver<Request>, target: Weak<dyn RescanTarget>, delay: Duration) {
    let mut pending: HashMap<BufferId, Instant> = HashMap::new();

    loop {
        fire_due(&mut pending, &target);

        let request = match pending.values().min().copied() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(request) => request,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(request) => request,
                Err(_) => break,
            },
        };

        match request {
            Request::Touch { buffer, at } => {
                pending.insert(buffer, at + delay);
            }
            Request::Cancel(buffer) => {
                pending.remove(&buffer);
            }
            Request::Shutdown => break,
        }
    }

    tracing::debug!("Rescan worker stopped ({} pending dropped)", pending.len());
}

fn fire_due(pending: &mut HashMap<BufferId, Instant>, target: &Weak<dyn RescanTarget>) {
    let now = Instant::now();
    let due: Vec<BufferId> = pending
        .iter()
        .filter(|(_, deadline)| **deadline <= now)
        .map(|(buffer, _)| *buffer)
        .collect();

    for buffer in due {
        pending.remove(&buffer);
        let Some(target) = target.upgrade() else {
            pending.clear();
            return;
        };
        tracing::debug!("Rescanning buffer {}", buffer.0);
        target.rescan(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    struct Recorder {
        enabled: AtomicBool,
        calls: Mutex<Vec<BufferId>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(true),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<BufferId> {
            self.calls.lock().clone()
        }
    }

    impl RescanTarget for Recorder {
        fn has_work(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn rescan(&self, buffer: BufferId) {
            self.calls.lock().push(buffer);
        }
    }

    fn scheduler(recorder: &Arc<Recorder>, delay_ms: u64) -> RescanScheduler {
        let target: Arc<dyn RescanTarget> = recorder.clone();
        RescanScheduler::with_delay(&target, Duration::from_millis(delay_ms)).unwrap()
    }

    #[test]
    fn test_burst_coalesces_into_one_rescan() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 40);

        for _ in 0..25 {
            assert!(scheduler.schedule(BufferId(1)));
        }
        thread::sleep(Duration::from_millis(300));

        assert_eq!(recorder.calls(), vec![BufferId(1)]);
    }

    #[test]
    fn test_new_edit_resets_the_window() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 200);

        // Edits every 50ms keep pushing the deadline out
        for _ in 0..8 {
            scheduler.schedule(BufferId(1));
            thread::sleep(Duration::from_millis(50));
        }
        assert!(recorder.calls().is_empty());

        thread::sleep(Duration::from_millis(500));
        assert_eq!(recorder.calls(), vec![BufferId(1)]);
    }

    #[test]
    fn test_buffers_are_debounced_independently() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 30);

        scheduler.schedule(BufferId(1));
        scheduler.schedule(BufferId(2));
        scheduler.schedule(BufferId(1));
        thread::sleep(Duration::from_millis(300));

        let mut calls = recorder.calls();
        calls.sort();
        assert_eq!(calls, vec![BufferId(1), BufferId(2)]);
    }

    #[test]
    fn test_schedule_dropped_without_work() {
        let recorder = Recorder::new();
        recorder.enabled.store(false, Ordering::SeqCst);
        let scheduler = scheduler(&recorder, 10);

        assert!(!scheduler.schedule(BufferId(1)));
        thread::sleep(Duration::from_millis(100));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_cancel_drops_pending_rescan() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 80);

        scheduler.schedule(BufferId(1));
        scheduler.cancel(BufferId(1));
        thread::sleep(Duration::from_millis(300));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_dropped_target_stops_scheduling() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 10);
        let handle = scheduler.handle();
        drop(recorder);

        assert!(!handle.schedule(BufferId(1)));
    }

    #[test]
    fn test_drop_joins_worker_with_pending_work() {
        let recorder = Recorder::new();
        let scheduler = scheduler(&recorder, 10_000);
        scheduler.schedule(BufferId(1));
        drop(scheduler);
        assert!(recorder.calls().is_empty());
    }
}
