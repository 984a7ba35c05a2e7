//! # Heavy Check Pool
//!
//! Fixed worker threads draining a bounded queue. Each task carries its
//! own completion callback, so callers never block on the result.
//!
//! ```text
//!  enqueue ──▶ [ sync_channel(queue_size) ] ──▶ worker 0..N ──▶ on_validated(result)
//! ```

use crate::checkers::Checkers;
use crate::config::HeavyCheckConfig;
use crate::error::{CheckError, Result};
use parking_lot::Mutex;
use shared_types::EventPayload;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Completion callback of a heavy check.
pub type OnValidated = Box<dyn FnOnce(Result<()>) + Send>;

struct Task {
    event: Arc<EventPayload>,
    on_validated: OnValidated,
}

/// Worker pool running [`Checkers::validate_heavy`].
pub struct HeavyCheckPool {
    sender: Mutex<Option<SyncSender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    queued: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
    capacity: usize,
    checkers: Arc<Checkers>,
}

impl HeavyCheckPool {
    /// Spawn the workers.
    pub fn start(config: &HeavyCheckConfig, checkers: Arc<Checkers>) -> Self {
        let capacity = config.queue_size.max(1);
        let (tx, rx) = sync_channel::<Task>(capacity);
        let rx = Arc::new(Mutex::new(rx));
        let queued = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicBool::new(false));

        let count = config.worker_count();
        let workers = (0..count)
            .filter_map(|i| {
                let rx = Arc::clone(&rx);
                let queued = Arc::clone(&queued);
                let stopped = Arc::clone(&stopped);
                let checkers = Arc::clone(&checkers);
                std::thread::Builder::new()
                    .name(format!("heavy-check-{i}"))
                    .spawn(move || worker(rx, queued, stopped, checkers))
                    .ok()
            })
            .collect::<Vec<_>>();
        info!(workers = workers.len(), queue = capacity, "[sn-03] 🧵 Heavy check pool started");

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            queued,
            stopped,
            capacity,
            checkers,
        }
    }

    /// Queue `event`; blocks while the queue is full.
    ///
    /// Returns [`CheckError::Terminated`] once the pool is stopped.
    pub fn enqueue(&self, event: Arc<EventPayload>, on_validated: OnValidated) -> Result<()> {
        let tx = self
            .sender
            .lock()
            .as_ref()
            .cloned()
            .ok_or(CheckError::Terminated)?;
        let depth = self.queued.fetch_add(1, Ordering::AcqRel) + 1;
        self.checkers.metrics().record_queue_depth(depth);
        tx.send(Task {
            event,
            on_validated,
        })
        .map_err(|_| {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            CheckError::Terminated
        })
    }

    /// Tasks queued or running.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// True once more than half the queue is in use.
    pub fn overloaded(&self) -> bool {
        self.queued() > self.capacity / 2
    }

    /// Stop accepting tasks, fail the queued ones and join the workers.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sender.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        for w in workers {
            let _ = w.join();
        }
        info!("[sn-03] 🛑 Heavy check pool stopped");
    }
}

impl Drop for HeavyCheckPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker(
    rx: Arc<Mutex<Receiver<Task>>>,
    queued: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
    checkers: Arc<Checkers>,
) {
    loop {
        let task = match rx.lock().recv() {
            Ok(task) => task,
            Err(_) => break,
        };
        let result = if stopped.load(Ordering::Acquire) {
            Err(CheckError::Terminated)
        } else {
            checkers.validate_heavy(&task.event)
        };
        let depth = queued.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
        checkers.metrics().record_queue_depth(depth);
        (task.on_validated)(result);
    }
    debug!("[sn-03] Heavy check worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::tests::Fixture;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn config(workers: usize, queue_size: usize) -> HeavyCheckConfig {
        HeavyCheckConfig {
            workers,
            queue_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_results_delivered() {
        let f = Fixture::new();
        let pool = HeavyCheckPool::start(&config(2, 8), Arc::clone(&f.checkers));
        let (tx, rx) = channel();
        for i in 0..5u64 {
            let tx = tx.clone();
            let event = Arc::new(f.next(None, 1_000 + i));
            pool.enqueue(event, Box::new(move |r| tx.send(r).unwrap()))
                .unwrap();
        }
        for _ in 0..5 {
            let r = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(r, Ok(()));
        }
        pool.stop();
        assert_eq!(pool.queued(), 0);
    }

    #[test]
    fn test_enqueue_after_stop() {
        let f = Fixture::new();
        let pool = HeavyCheckPool::start(&config(1, 4), Arc::clone(&f.checkers));
        pool.stop();
        let event = Arc::new(f.next(None, 1_000));
        assert_eq!(
            pool.enqueue(event, Box::new(|_| {})),
            Err(CheckError::Terminated)
        );
    }

    #[test]
    fn test_worker_count_default() {
        assert!(config(0, 1).worker_count() >= 1);
        assert_eq!(config(3, 1).worker_count(), 3);
    }

    #[test]
    fn test_overloaded_threshold() {
        let f = Fixture::new();
        let pool = HeavyCheckPool::start(&config(1, 4), Arc::clone(&f.checkers));
        assert!(!pool.overloaded());
        pool.queued.store(2, Ordering::Release);
        assert!(!pool.overloaded());
        pool.queued.store(3, Ordering::Release);
        assert!(pool.overloaded());
        pool.queued.store(0, Ordering::Release);
        pool.stop();
    }

    #[test]
    fn test_single_slot_queue_not_overloaded_when_empty() {
        let f = Fixture::new();
        let pool = HeavyCheckPool::start(&config(1, 1), Arc::clone(&f.checkers));
        assert!(!pool.overloaded());
        pool.queued.store(1, Ordering::Release);
        assert!(pool.overloaded());
        pool.queued.store(0, Ordering::Release);
        pool.stop();
    }
}
