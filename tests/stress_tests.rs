//! Stress tests for reconfiguration under load
//!
//! These tests verify:
//! - No event reaches an appender after it has been stopped
//! - No event is lost while configurations are swapped underneath loggers
//! - AppenderControlSet snapshots stay consistent under concurrent mutation

use rust_logger_config::appenders::ListAppender;
use rust_logger_config::config::{
    AppenderControl, AppenderControlSet, Configuration, ConfigurationSettings, ConfigurationSource,
};
use rust_logger_config::core::{
    Appender, AppenderBase, ErrorHandler, LifeCycle, LifeCycleState, LogEvent, LoggerContext,
    Result, StatusLogger,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ROOT_TO_GUARD: &str =
    r#"{ "loggers": { "root": { "level": "info", "AppenderRef": { "ref": "GUARD" } } } }"#;

/// Counts appends, and separately the ones that arrive when not started
struct GuardAppender {
    base: AppenderBase,
    delivered: Arc<AtomicUsize>,
    late: Arc<AtomicUsize>,
}

impl GuardAppender {
    fn new(delivered: Arc<AtomicUsize>, late: Arc<AtomicUsize>) -> Self {
        Self {
            base: AppenderBase::new("GUARD", StatusLogger::silent()),
            delivered,
            late,
        }
    }
}

impl LifeCycle for GuardAppender {
    fn state(&self) -> LifeCycleState {
        self.base.state()
    }

    fn start(&self) {
        self.base.start();
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.base.set_stopping();
        self.base.set_stopped(timeout)
    }
}

impl Appender for GuardAppender {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn append(&self, _event: &LogEvent) -> Result<()> {
        if self.base.state() != LifeCycleState::Started {
            self.late.fetch_add(1, Ordering::SeqCst);
        }
        // Widen the window in which a concurrent stop could overlap.
        thread::yield_now();
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handler(&self) -> &dyn ErrorHandler {
        self.base.handler()
    }
}

fn guarded_configuration(
    context: &LoggerContext,
    delivered: &Arc<AtomicUsize>,
    late: &Arc<AtomicUsize>,
) -> Arc<Configuration> {
    let configuration = Configuration::from_source(
        ConfigurationSource::from_json_str(ROOT_TO_GUARD),
        Arc::clone(context.settings()),
        Arc::clone(context.registry()),
    )
    .expect("Failed to parse configuration");
    configuration.add_appender(Arc::new(GuardAppender::new(delivered.clone(), late.clone())));
    configuration
}

fn run_swaps_under_load(strategy: &str) {
    const THREADS: usize = 8;
    const SWAPS: usize = 20;

    let delivered = Arc::new(AtomicUsize::new(0));
    let late = Arc::new(AtomicUsize::new(0));
    let settings = ConfigurationSettings::default()
        .with_status(StatusLogger::silent())
        .with_reliability_strategy(strategy);
    let context = LoggerContext::builder()
        .settings(settings)
        .appender(Arc::new(GuardAppender::new(delivered.clone(), late.clone())))
        .json(ROOT_TO_GUARD)
        .build()
        .expect("Failed to build context");

    let running = Arc::new(AtomicBool::new(true));
    let logged = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = context.get_logger(&format!("worker.{}", t));
            let running = running.clone();
            let logged = logged.clone();
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    logger.info("tick");
                    logged.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for _ in 0..SWAPS {
        thread::sleep(Duration::from_millis(5));
        let next = guarded_configuration(&context, &delivered, &late);
        context.set_configuration(next);
    }

    running.store(false, Ordering::SeqCst);
    for handle in handles {
        handle.join().expect("Worker thread panicked");
    }
    assert!(context.stop(Duration::from_secs(5)));

    assert_eq!(late.load(Ordering::SeqCst), 0, "appends reached a stopped appender");
    assert_eq!(
        delivered.load(Ordering::SeqCst),
        logged.load(Ordering::SeqCst),
        "events were lost during reconfiguration"
    );
}

#[test]
fn test_await_completion_drains_during_swaps() {
    run_swaps_under_load("AwaitCompletion");
}

#[test]
fn test_locking_strategy_drains_during_swaps() {
    run_swaps_under_load("Locking");
}

#[test]
fn test_control_set_snapshots_under_mutation() {
    let set = Arc::new(AppenderControlSet::new());
    let fixed: Arc<dyn Appender> = Arc::new(ListAppender::new("FIXED", StatusLogger::silent()));
    assert!(set.add(Arc::new(AppenderControl::new(fixed, None, None))));

    let running = Arc::new(AtomicBool::new(true));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let set = set.clone();
            let running = running.clone();
            thread::spawn(move || {
                let mut snapshots = 0usize;
                while running.load(Ordering::SeqCst) {
                    let snapshot = set.get();
                    let names: HashSet<&str> =
                        snapshot.iter().map(|c| c.appender_name()).collect();
                    assert_eq!(names.len(), snapshot.len(), "duplicate control in snapshot");
                    assert!(names.contains("FIXED"));
                    snapshots += 1;
                }
                snapshots
            })
        })
        .collect();

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let set = set.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let name = format!("W{}-{}", w, i % 5);
                    let appender: Arc<dyn Appender> =
                        Arc::new(ListAppender::new(name.as_str(), StatusLogger::silent()));
                    set.add(Arc::new(AppenderControl::new(appender, None, None)));
                    set.remove(&name);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("Writer thread panicked");
    }
    running.store(false, Ordering::SeqCst);
    let total: usize = readers
        .into_iter()
        .map(|r| r.join().expect("Reader thread panicked"))
        .sum();

    assert!(total > 0);
    assert_eq!(set.len(), 1);
    assert!(set.contains("FIXED"));
}
