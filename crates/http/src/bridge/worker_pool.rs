use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::bridge::BridgeError;

/// Counters describing the pool's activity since creation.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Jobs handed to a worker thread
    pub dispatched_count: AtomicU64,
    /// Jobs that ran to the end
    pub completed_count: AtomicU64,
    /// Submissions refused because the pool was saturated
    pub rejected_count: AtomicU64,
}

impl WorkerPoolMetrics {
    fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejection(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }
}

/// A bounded pool running blocking jobs on the tokio blocking thread pool.
///
/// At most `max_in_flight` jobs run or wait for a thread at any time. Reserving a slot
/// never waits: a saturated pool refuses with [`BridgeError::Saturated`].
#[derive(Debug, Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    metrics: Arc<WorkerPoolMetrics>,
}

impl WorkerPool {
    pub fn new(handle: Handle, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self { handle, permits: Arc::new(Semaphore::new(max_in_flight)), max_in_flight, metrics: Arc::new(WorkerPoolMetrics::default()) }
    }

    /// A pool on the runtime the caller is running in.
    pub fn current(max_in_flight: usize) -> Result<Self, BridgeError> {
        let handle = Handle::try_current()?;
        Ok(Self::new(handle, max_in_flight))
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Jobs currently reserved, running or waiting for a thread.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    pub fn metrics(&self) -> &WorkerPoolMetrics {
        &self.metrics
    }

    /// Reserves a slot without waiting.
    pub fn try_reserve(&self) -> Result<Reservation, BridgeError> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(Reservation { permit, handle: self.handle.clone(), metrics: Arc::clone(&self.metrics) }),
            Err(_) => {
                self.metrics.record_rejection();
                Err(BridgeError::Saturated { max_in_flight: self.max_in_flight })
            }
        }
    }
}

/// A reserved slot in the [`WorkerPool`]; dropping it unused gives the slot back.
#[derive(Debug)]
pub struct Reservation {
    permit: OwnedSemaphorePermit,
    handle: Handle,
    metrics: Arc<WorkerPoolMetrics>,
}

impl Reservation {
    /// Runs `job` on a worker thread, holding the slot until it returns.
    pub fn run<F>(self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Reservation { permit, handle, metrics } = self;
        metrics.record_dispatch();
        handle.spawn_blocking(move || {
            let _permit = permit;
            job();
            metrics.record_completion();
            trace!("worker job finished");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn rejects_when_saturated() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = WorkerPool::new(runtime.handle().clone(), 1);

        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        pool.try_reserve().unwrap().run(move || {
            release_rx.recv().unwrap();
            done_tx.send(()).unwrap();
        });

        assert_eq!(pool.in_flight(), 1);
        assert!(matches!(pool.try_reserve(), Err(BridgeError::Saturated { max_in_flight: 1 })));
        assert_eq!(pool.metrics().rejected(), 1);

        release_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // the permit is released right after the job returns
        let mut reservation = None;
        for _ in 0..100 {
            if let Ok(r) = pool.try_reserve() {
                reservation = Some(r);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(reservation.is_some());
        assert_eq!(pool.metrics().dispatched(), 1);
    }

    #[test]
    fn unused_reservation_frees_slot() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = WorkerPool::new(runtime.handle().clone(), 1);

        let reservation = pool.try_reserve().unwrap();
        assert!(pool.try_reserve().is_err());
        drop(reservation);
        assert!(pool.try_reserve().is_ok());
    }

    #[test]
    fn current_requires_runtime() {
        assert!(matches!(WorkerPool::current(4), Err(BridgeError::NoRuntime { .. })));

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        assert_eq!(WorkerPool::current(4).unwrap().max_in_flight(), 4);
    }
}
