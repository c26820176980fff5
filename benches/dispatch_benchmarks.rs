//! Criterion benchmarks for the logging dispatch path

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_logger_config::prelude::*;
use std::sync::Arc;

const JSON: &str = r#"{ "loggers": {
    "logger": [
        { "name": "app", "level": "info" },
        { "name": "app.db", "level": "debug", "AppenderRef": { "ref": "LIST" } }
    ],
    "root": { "level": "warn", "AppenderRef": { "ref": "LIST" } }
} }"#;

fn context_for(strategy: &str) -> (Arc<LoggerContext>, Arc<ListAppender>) {
    let list = Arc::new(ListAppender::new("LIST", StatusLogger::silent()));
    let settings = ConfigurationSettings::default()
        .with_status(StatusLogger::silent())
        .with_reliability_strategy(strategy);
    let context = LoggerContext::builder()
        .settings(settings)
        .appender(list.clone())
        .json(JSON)
        .build()
        .expect("benchmark configuration");
    (context, list)
}

// ============================================================================
// Level Check Benchmarks
// ============================================================================

fn bench_level_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_checks");
    group.throughput(Throughput::Elements(1));
    let (context, _list) = context_for("AwaitCompletion");

    let logger = context.get_logger("app.web.handler");
    group.bench_function("is_enabled", |b| {
        b.iter(|| black_box(logger.is_enabled(black_box(LogLevel::DEBUG))))
    });

    group.bench_function("disabled_call", |b| {
        b.iter(|| logger.debug(black_box("filtered")))
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    for strategy in ["Default", "AwaitCompletion", "Locking"] {
        let (context, list) = context_for(strategy);
        let logger = context.get_logger("app.db.pool");
        group.bench_function(strategy, |b| {
            b.iter(|| {
                logger.info(black_box("connection acquired"));
                if list.len() > 10_000 {
                    list.clear();
                }
            })
        });
    }

    group.finish();
}

fn bench_get_logger(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_logger");
    let (context, _list) = context_for("AwaitCompletion");
    let _ = context.get_logger("app.cached");

    group.bench_function("cached", |b| {
        b.iter(|| black_box(context.get_logger(black_box("app.cached"))))
    });

    group.bench_function("resolve_config", |b| {
        let configuration = context.configuration();
        b.iter(|| black_box(configuration.get_logger_config(black_box("app.db.pool.worker"))))
    });

    group.finish();
}

criterion_group!(benches, bench_level_checks, bench_dispatch, bench_get_logger);
criterion_main!(benches);
