//! Bounded queue drained by a background worker thread
//!
//! Shared by the `Async` appender and the async logger delegate. Items are
//! handed to the worker in batches; a full queue is handled according to the
//! configured [`OverflowPolicy`].

use super::appender::panic_message;
use super::error::{LoggerError, Result};
use super::metrics::QueueMetrics;
use super::overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy};
use super::status::StatusLogger;
use crossbeam_channel::{bounded, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Largest number of items handed to the worker's handler at once
pub const BATCH_SIZE: usize = 50;

pub struct AsyncQueue<T: Send + 'static> {
    name: String,
    capacity: usize,
    policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    metrics: Arc<QueueMetrics>,
    status: StatusLogger,
    sender: RwLock<Option<Sender<T>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<T: Send + 'static> AsyncQueue<T> {
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        policy: OverflowPolicy,
        status: StatusLogger,
    ) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            policy,
            on_overflow: None,
            metrics: Arc::new(QueueMetrics::new()),
            status,
            sender: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_overflow_callback(mut self, callback: Option<OverflowCallback>) -> Self {
        self.on_overflow = callback;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> &OverflowPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Spawn the worker; `handler` receives every batch in queue order
    pub fn start<F>(&self, mut handler: F) -> Result<()>
    where
        F: FnMut(&[T]) + Send + 'static,
    {
        let mut sender_slot = self.sender.write();
        if sender_slot.is_some() {
            return Ok(());
        }
        let (sender, receiver) = bounded::<T>(self.capacity);
        let metrics = Arc::clone(&self.metrics);
        let status = self.status.clone();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("{}-worker", self.name))
            .spawn(move || {
                let mut batch = Vec::with_capacity(BATCH_SIZE);
                while let Ok(item) = receiver.recv() {
                    batch.push(item);
                    while batch.len() < BATCH_SIZE {
                        match receiver.try_recv() {
                            Ok(item) => batch.push(item),
                            Err(_) => break,
                        }
                    }

                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        handler(&batch)
                    }));
                    match result {
                        Ok(()) => {
                            for _ in 0..batch.len() {
                                metrics.record_processed();
                            }
                        }
                        Err(payload) => {
                            status.error(format!(
                                "Worker of {} panicked: {}. Continuing with the next batch",
                                name,
                                panic_message(payload.as_ref())
                            ));
                            for _ in 0..batch.len() {
                                metrics.record_dropped();
                            }
                        }
                    }
                    batch.clear();
                }
            })
            .map_err(|e| {
                LoggerError::io_operation("spawning worker thread", self.name.clone(), e)
            })?;

        *sender_slot = Some(sender);
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Queue `item`, or give it to `write_sync` when it must be written on the
    /// calling thread: the queue is not running, a critical item found the
    /// queue full, or the policy falls back to synchronous writes.
    pub fn enqueue(&self, item: T, priority: LogPriority, write_sync: impl FnOnce(T)) {
        let Some(sender) = self.sender.read().clone() else {
            write_sync(item);
            return;
        };

        match sender.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(item)) => self.handle_overflow(&sender, item, priority, write_sync),
            Err(TrySendError::Disconnected(item)) => write_sync(item),
        }
    }

    fn handle_overflow(
        &self,
        sender: &Sender<T>,
        item: T,
        priority: LogPriority,
        write_sync: impl FnOnce(T),
    ) {
        self.metrics.record_queue_full();

        // Critical items are never dropped
        if priority == LogPriority::Critical {
            self.metrics.record_synchronous_write();
            write_sync(item);
            return;
        }

        match &self.policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
            }
            OverflowPolicy::DropOldest => {
                self.metrics.record_synchronous_write();
                write_sync(item);
            }
            OverflowPolicy::Block => {
                self.metrics.record_block();
                if let Err(err) = sender.send(item) {
                    write_sync(err.into_inner());
                }
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(item, *timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => self.alert_and_drop(),
                    Err(SendTimeoutError::Disconnected(item)) => write_sync(item),
                }
            }
            OverflowPolicy::AlertAndDrop => self.alert_and_drop(),
        }
    }

    fn alert_and_drop(&self) {
        let dropped = self.metrics.record_dropped();

        // Alert on the first drop and every thousandth after it
        if dropped == 0 || (dropped + 1) % 1000 == 0 {
            self.status.warn(format!(
                "Queue of {} is full, {} events dropped. Consider a larger queue or another overflow policy",
                self.name,
                dropped + 1
            ));
        }

        if let Some(ref callback) = self.on_overflow {
            callback(dropped + 1);
        }
    }

    /// Close the queue and wait up to `timeout` for the worker to drain it
    pub fn stop(&self, timeout: Duration) -> bool {
        drop(self.sender.write().take());

        let Some(handle) = self.worker.lock().take() else {
            return true;
        };
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    self.status
                        .error(format!("Worker of {} panicked during shutdown", self.name));
                    return false;
                }
                return true;
            }
            if start.elapsed() >= timeout {
                self.status.warn(format!(
                    "Worker of {} did not finish within {:?}; queued events may be lost",
                    self.name, timeout
                ));
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl<T: Send + 'static> Drop for AsyncQueue<T> {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop(Duration::from_secs(5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_not_running_writes_synchronously() {
        let queue: AsyncQueue<u32> = AsyncQueue::new("q", 4, OverflowPolicy::DropNewest, StatusLogger::silent());
        let mut written = Vec::new();
        queue.enqueue(7, LogPriority::Normal, |item| written.push(item));
        assert_eq!(written, vec![7]);
    }

    #[test]
    fn test_worker_drains_on_stop() {
        let queue = AsyncQueue::new("q", 128, OverflowPolicy::Block, StatusLogger::silent());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        queue
            .start(move |batch: &[u32]| {
                counter.fetch_add(batch.len(), Ordering::SeqCst);
            })
            .unwrap();

        for i in 0..100 {
            queue.enqueue(i, LogPriority::Normal, |_| panic!("should be queued"));
        }
        assert!(queue.stop(Duration::from_secs(5)));
        assert_eq!(seen.load(Ordering::SeqCst), 100);
        assert_eq!(queue.metrics().total_processed(), 100);
        assert!(!queue.is_running());
    }

    #[test]
    fn test_overflow_drop_and_critical_sync() {
        let drops = Arc::new(AtomicUsize::new(0));
        let drop_counter = drops.clone();
        let callback: OverflowCallback = Arc::new(move |_| {
            drop_counter.fetch_add(1, Ordering::SeqCst);
        });
        let queue = AsyncQueue::new("q", 1, OverflowPolicy::AlertAndDrop, StatusLogger::silent())
            .with_overflow_callback(Some(callback));
        let (release, gate) = crossbeam_channel::bounded::<()>(0);
        queue
            .start(move |_batch: &[u32]| {
                let _ = gate.recv();
            })
            .unwrap();

        // The first item occupies the worker, the second fills the queue.
        queue.enqueue(1, LogPriority::Normal, |_| {});
        std::thread::sleep(Duration::from_millis(50));
        queue.enqueue(2, LogPriority::Normal, |_| {});

        queue.enqueue(3, LogPriority::Normal, |_| panic!("dropped, not written"));
        let mut critical = Vec::new();
        queue.enqueue(4, LogPriority::for_level(LogLevel::ERROR), |item| critical.push(item));

        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(critical, vec![4]);
        assert_eq!(queue.metrics().synchronous_writes(), 1);
        assert_eq!(queue.metrics().queue_full_events(), 2);

        drop(release);
        assert!(queue.stop(Duration::from_secs(5)));
    }
}
