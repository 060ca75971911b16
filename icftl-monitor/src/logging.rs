//! Structured logging for the monitor thread: a `slog` + `slog-term` +
//! `slog-async` drain setup, since the monitor runs on its own thread and
//! benefits from an async, non-blocking drain.

use crate::config::{ColorConfig, LoggingConfig};
use slog::{o, Drain, Level, Logger};

pub fn initialize_logger(conf: LoggingConfig) -> Logger {
    let decorator = slog_term::TermDecorator::new();
    let decorator = match conf.color {
        ColorConfig::On => decorator.force_color().build(),
        ColorConfig::Off => decorator.force_plain().build(),
        ColorConfig::Auto => decorator.build(),
    };

    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level = if conf.quiet && !conf.debug {
        Level::Error
    } else if conf.debug {
        Level::Trace
    } else {
        Level::Info
    };
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(1024)
        .overflow_strategy(slog_async::OverflowStrategy::Block)
        .build()
        .fuse();

    Logger::root(drain, o!())
}
