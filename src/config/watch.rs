//! Scheduled work and configuration file watching

use crate::core::{LoggerError, Result, StatusLogger};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

struct ScheduledTask {
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Runs fixed-delay tasks, one background thread each
pub struct ConfigurationScheduler {
    name: String,
    scheduled_items: AtomicUsize,
    tasks: Mutex<Vec<ScheduledTask>>,
    status: StatusLogger,
}

impl ConfigurationScheduler {
    pub fn new(name: impl Into<String>, status: StatusLogger) -> Self {
        Self {
            name: name.into(),
            scheduled_items: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
            status,
        }
    }

    pub fn increment_scheduled_items(&self, count: usize) {
        self.scheduled_items.fetch_add(count, Ordering::Relaxed);
    }

    /// Scheduled components declared by the configuration
    pub fn scheduled_items(&self) -> usize {
        self.scheduled_items.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Run `task` every `delay`, first after one delay, until stopped
    pub fn schedule_with_fixed_delay<F>(&self, task_name: &str, delay: Duration, mut task: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = bounded::<()>(1);
        let status = self.status.clone();
        let label = format!("{}-{}", self.name, task_name);
        let handle = thread::Builder::new()
            .name(label.clone())
            .spawn(move || loop {
                match stopped.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => {
                        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut task));
                        if result.is_err() {
                            status.error(format!("Scheduled task {} panicked", label));
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning scheduler thread", task_name, e))?;
        self.tasks.lock().push(ScheduledTask { stop, handle });
        Ok(())
    }

    /// Stop every task, waiting up to `timeout` in total for their threads
    pub fn stop(&self, timeout: Duration) -> bool {
        let tasks: Vec<ScheduledTask> = self.tasks.lock().drain(..).collect();
        let deadline = Instant::now() + timeout;
        let mut clean = true;
        for task in tasks {
            let _ = task.stop.try_send(());
            drop(task.stop);
            // A task that stops its own scheduler cannot wait for itself
            if task.handle.thread().id() == thread::current().id() {
                continue;
            }
            loop {
                if task.handle.is_finished() {
                    clean &= task.handle.join().is_ok();
                    break;
                }
                if Instant::now() >= deadline {
                    self.status.warn(format!(
                        "Scheduled tasks of {} did not finish within {:?}",
                        self.name, timeout
                    ));
                    clean = false;
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
        clean
    }
}

impl fmt::Debug for ConfigurationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationScheduler")
            .field("name", &self.name)
            .field("scheduled_items", &self.scheduled_items())
            .field("tasks", &self.tasks.lock().len())
            .finish()
    }
}

/// Called when a watched source changes
pub type ChangeListener = Arc<dyn Fn(&Path) + Send + Sync>;

pub trait Watcher: Send {
    fn source_name(&self) -> String;

    fn is_modified(&self) -> bool;

    /// Record the current state as seen and notify listeners
    fn modified(&mut self);
}

/// Watches a file's modification time
pub struct FileWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    listeners: Vec<ChangeListener>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>, listeners: Vec<ChangeListener>) -> Self {
        let path = path.into();
        let last_modified = Self::modification_time(&path);
        Self {
            path,
            last_modified,
            listeners,
        }
    }

    /// Treat `time` as already seen, e.g. the time the source was read
    pub fn with_last_modified(mut self, time: Option<SystemTime>) -> Self {
        if time.is_some() {
            self.last_modified = time;
        }
        self
    }

    fn modification_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

impl Watcher for FileWatcher {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn is_modified(&self) -> bool {
        match Self::modification_time(&self.path) {
            Some(current) => self.last_modified != Some(current),
            None => false,
        }
    }

    fn modified(&mut self) {
        self.last_modified = Self::modification_time(&self.path);
        for listener in &self.listeners {
            listener(&self.path);
        }
    }
}

/// Polls registered watchers on the configuration's scheduler
pub struct WatchManager {
    interval: Mutex<Duration>,
    watchers: Arc<Mutex<Vec<Box<dyn Watcher>>>>,
    status: StatusLogger,
}

impl WatchManager {
    pub fn new(status: StatusLogger) -> Self {
        Self {
            interval: Mutex::new(Duration::ZERO),
            watchers: Arc::new(Mutex::new(Vec::new())),
            status,
        }
    }

    pub fn set_interval(&self, interval: Duration) {
        *self.interval.lock() = interval;
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub fn watch(&self, watcher: Box<dyn Watcher>) {
        self.status
            .debug(format!("Watching configuration source {}", watcher.source_name()));
        self.watchers.lock().push(watcher);
    }

    pub fn has_watchers(&self) -> bool {
        !self.watchers.lock().is_empty()
    }

    /// Notify every watcher whose source changed; returns how many did
    pub fn check_files(&self) -> usize {
        check(&self.watchers)
    }

    /// Start polling when an interval is set
    pub fn start(&self, scheduler: &ConfigurationScheduler) -> Result<()> {
        let interval = self.interval();
        if interval.is_zero() || !self.has_watchers() {
            return Ok(());
        }
        let watchers = Arc::clone(&self.watchers);
        scheduler.schedule_with_fixed_delay("watch", interval, move || {
            check(&watchers);
        })
    }

    pub fn stop(&self) {
        self.watchers.lock().clear();
    }
}

fn check(watchers: &Mutex<Vec<Box<dyn Watcher>>>) -> usize {
    let mut changed = 0;
    for watcher in watchers.lock().iter_mut() {
        if watcher.is_modified() {
            watcher.modified();
            changed += 1;
        }
    }
    changed
}

impl fmt::Debug for WatchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchManager")
            .field("interval", &self.interval())
            .field("watchers", &self.watchers.lock().len())
            .finish()
    }
}
